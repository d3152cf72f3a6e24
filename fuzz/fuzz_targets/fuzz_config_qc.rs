//! Fuzz target for qc.json configuration parsing and validation.
//!
//! Tests that parsing and semantic validation handle arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use qc_config::{validate_config, QcConfig};
use qc_math::StatisticRegistry;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = QcConfig::from_str(text) {
        let _ = validate_config(&config, &StatisticRegistry::with_builtins());
        let _ = config.flag_set.build();
    }
});
