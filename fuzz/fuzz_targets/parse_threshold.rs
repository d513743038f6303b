#![no_main]

use libfuzzer_sys::fuzz_target;
use reqload_types::ThresholdExpr;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(expr) = s.parse::<ThresholdExpr>() {
            // The normalised form must parse back to the same expression.
            let again: ThresholdExpr = expr
                .to_string()
                .parse()
                .expect("normalised threshold parses");
            assert_eq!(again.to_string(), expr.to_string());
        }
    }
});
