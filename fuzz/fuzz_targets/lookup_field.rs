#![no_main]

use libfuzzer_sys::fuzz_target;
use reqload_domain::lookup_field;

fuzz_target!(|data: &[u8]| {
    let _ = lookup_field(data, "job");
    let _ = lookup_field(data, "name");
});
