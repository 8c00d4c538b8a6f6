//! OpenFlow schema compiler.
//!
//! Usage:
//!   ofc [--lang ID] [--install-dir DIR] [--input-dir DIR] [--version LIST] [--verbose]
//!
//! Reads every input file of the input directory, builds the model of each requested
//! version, unifies them and runs the selected backend. On failure, prints the
//! offending file and the problem and exits with status 1 (2 for internal errors);
//! nothing is written.

use ofschema::config::{Command, CompileOptions, USAGE};
use ofschema::{backend, pipeline};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let opts = match CompileOptions::from_args(std::env::args().skip(1)) {
        Ok(Command::Run(opts)) => opts,
        Ok(Command::Help) => {
            print!("{}", USAGE);
            return Ok(());
        }
        Err(e) => {
            eprintln!("ofc: {}", e);
            eprint!("{}", USAGE);
            std::process::exit(1);
        }
    };
    init_logging(opts.verbose);

    match pipeline::run(&opts) {
        Ok(compilation) => {
            tracing::info!(
                entities = compilation.unified().len(),
                out = %opts.install_dir.display(),
                "done"
            );
            Ok(())
        }
        Err(e) => {
            match e.file() {
                Some(file) => eprintln!("{}: {}", file, e),
                None => eprintln!("ofc: {}", e),
            }
            if let ofschema::Error::UnknownBackend(_) = e {
                eprintln!("available backends: {}", backend::available().join(", "));
            }
            std::process::exit(if e.is_internal() { 2 } else { 1 });
        }
    }
}
