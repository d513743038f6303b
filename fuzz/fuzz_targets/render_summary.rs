#![no_main]

use libfuzzer_sys::fuzz_target;
use reqload_render::{TextSummaryOptions, render_html, text_summary};

fuzz_target!(|data: &[u8]| {
    if let Ok(summary) = serde_json::from_slice::<reqload_types::SummaryData>(data) {
        let _ = text_summary(&summary, &TextSummaryOptions::default());
        let _ = render_html(&summary);
    }
});
