//! Writing test verdicts into existing flag arrays.

use ndarray::{Array2, ArrayView2, Zip};
use qc_common::{Error, FlagCode, FlagSet, Result};

/// Merge a test's flags into a series' stored flags.
///
/// Cells the test left raw are untouched. Elsewhere the new flag wins when it
/// is at least as severe as the stored one, so a stricter earlier verdict is
/// never downgraded. Returns the number of cells whose code changed.
pub fn apply_flags(
    name: &str,
    existing: &mut Array2<FlagCode>,
    new: ArrayView2<'_, FlagCode>,
    flag_set: &FlagSet,
) -> Result<usize> {
    if existing.shape() != new.shape() {
        return Err(Error::ShapeMismatch {
            variable: name.to_string(),
            what: "test flags".to_string(),
            expected: existing.shape().to_vec(),
            actual: new.shape().to_vec(),
        });
    }
    let raw = flag_set.codes.raw;
    let mut changed = 0usize;
    Zip::from(existing).and(new).for_each(|old, &code| {
        if code == raw {
            return;
        }
        if flag_set.severity_of(code) >= flag_set.severity_of(*old) {
            if *old != code {
                changed += 1;
            }
            *old = code;
        }
    });
    Ok(changed)
}

/// Copy of `data` with every sample whose flag is not usable set to NaN.
pub fn mask_unusable(
    data: ArrayView2<'_, f64>,
    flags: ArrayView2<'_, FlagCode>,
    flag_set: &FlagSet,
) -> Array2<f64> {
    let mut masked = data.to_owned();
    Zip::from(&mut masked).and(flags).for_each(|v, &code| {
        if !flag_set.is_usable_code(code) {
            *v = f64::NAN;
        }
    });
    masked
}
