//! Parameter-name normalization.
//!
//! Datasets with several instruments measuring the same quantity number the
//! repeats (`TEMP_1`, `TEMP_2`, ...). Configuration is written against the
//! base name, so tests normalize once at entry and look up by the result.

use regex::Regex;
use std::sync::OnceLock;

static NUMBERED_SUFFIX: OnceLock<Regex> = OnceLock::new();

fn numbered_suffix() -> &'static Regex {
    NUMBERED_SUFFIX.get_or_init(|| Regex::new(r"^(.+?)_\d+$").expect("static regex"))
}

/// Strip a trailing `_<digits>` repeat suffix from a parameter name.
///
/// Names without such a suffix are returned unchanged.
pub fn base_parameter_name(name: &str) -> &str {
    match numbered_suffix().captures(name).and_then(|c| c.get(1)) {
        Some(base) => base.as_str(),
        None => name,
    }
}
