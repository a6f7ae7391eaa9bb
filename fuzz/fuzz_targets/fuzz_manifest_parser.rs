//! Fuzz target for manifest code parsing and catalog compilation.
//!
//! Goal: compiling arbitrary code blocks should **never panic**.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_manifest_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(code) = std::str::from_utf8(data) {
        let _ = enact_engine::parse_manifest(code);

        if let Ok(mut catalog) = enact_engine::Catalog::compile("fuzz", code) {
            let _ = catalog.finalize();
        }
    }
});
