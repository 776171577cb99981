#![no_main]

use libfuzzer_sys::fuzz_target;
use routegate::dataset::Dataset;
use routegate::regression::{compare, CompareConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Loading must never panic, and a loaded snapshot must compare with
        // itself or fail with an error
        if let Ok(dataset) = Dataset::from_json_str("fuzz.json", input) {
            let _ = compare(&dataset, &dataset, &CompareConfig::all_dimensions());
        }
    }
});
