//! Property tests for flag sets and name normalization.

use proptest::prelude::*;
use qc_common::{base_parameter_name, Flag, FlagSet};

fn any_flag() -> impl Strategy<Value = Flag> {
    prop::sample::select(Flag::ALL.to_vec())
}

fn any_builtin() -> impl Strategy<Value = FlagSet> {
    prop::sample::select(FlagSet::BUILTIN.to_vec())
        .prop_map(|name| FlagSet::builtin(name).expect("builtin"))
}

proptest! {
    /// Decoding a resolved code never yields a less severe flag.
    #[test]
    fn decode_never_softens(set in any_builtin(), flag in any_flag()) {
        let decoded = set
            .decode(set.resolve(flag))
            .expect("resolved code decodes");
        prop_assert!(decoded.severity() >= flag.severity());
    }

    /// Failing flags are never mistaken for usable samples.
    #[test]
    fn failing_codes_are_not_usable(set in any_builtin()) {
        prop_assert!(!set.is_usable_code(set.resolve(Flag::Bad)));
        prop_assert!(!set.is_usable_code(set.resolve(Flag::ProbablyBad)));
    }

    /// Normalization strips exactly one numeric repeat suffix.
    #[test]
    fn suffix_roundtrip(base in "[A-Z]{2,6}", n in 1u32..100) {
        let name = format!("{base}_{n}");
        prop_assert_eq!(base_parameter_name(&name), base.as_str());
        prop_assert_eq!(base_parameter_name(&base), base.as_str());
    }
}
