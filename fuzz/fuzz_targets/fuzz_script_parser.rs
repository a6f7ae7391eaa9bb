//! Fuzz target for script parsing and step validation.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_script_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Scripts are TOML, so only UTF-8 is interesting.
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = enact_app::parse_script(text);
    }
});
