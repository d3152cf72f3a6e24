//! Fuzz target for dataset JSON loading followed by every QC test.
//!
//! Malformed or inconsistent datasets must come back as errors or skipped
//! outcomes, never as panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use qc_config::QcConfig;
use qc_core::dataset::DatasetFile;
use qc_core::qc::{by_name, run_test, QcContext, QcTest, TEST_NAMES};

fuzz_target!(|data: &[u8]| {
    let Ok(file) = serde_json::from_slice::<DatasetFile>(data) else {
        return;
    };
    let Ok(ctx) = QcContext::new(QcConfig::default()) else {
        return;
    };
    let Ok(mut dataset) = file.into_dataset("fuzz.json", ctx.flag_set.codes.raw) else {
        return;
    };
    for name in TEST_NAMES {
        let Some(test) = by_name(name) else { continue };
        for target in test.eligible_targets(&ctx, &dataset) {
            let _ = run_test(test.as_ref(), &ctx, &mut dataset, target);
        }
    }
});
