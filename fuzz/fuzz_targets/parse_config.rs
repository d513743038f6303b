#![no_main]

use libfuzzer_sys::fuzz_target;
use reqload_config::{Overrides, resolve};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(file) = toml::from_str::<reqload_types::ConfigFile>(s) {
            // Resolution must reject bad values with an error, never a panic.
            let _ = resolve(&file, &Overrides::default());
        }
    }
});
