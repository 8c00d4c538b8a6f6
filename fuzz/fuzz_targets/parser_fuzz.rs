//! Input file fuzz target: arbitrary text through the parser and the per-file checks.
//! Neither stage may panic; malformed input must come back as an error.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(input) = ofschema::pipeline::parse_file("fuzz", s) {
        for version in input.versions.clone() {
            let _ = ofschema::ir::build_protocol(version, &[&input]);
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
