//! Property-based tests for probe validation

use fleetprobe_core::{ConfigError, Probe, ProbeSet};
use proptest::prelude::*;

fn arb_label() -> impl Strategy<Value = String> {
    "[A-Z][A-Z_]{0,15}"
}

fn arb_command() -> impl Strategy<Value = String> {
    "[a-z]{2,8}( -[a-z]{1,3})?( \\| [a-z]{2,8})?"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn valid_probes_keep_order(
        labels in prop::collection::hash_set(arb_label(), 1..10),
        command in arb_command(),
    ) {
        let labels: Vec<String> = labels.into_iter().collect();
        let probes: Vec<Probe> = labels.iter().map(|l| Probe::new(l.clone(), command.clone())).collect();

        let set = ProbeSet::new(probes).unwrap();
        let got: Vec<&str> = set.labels().collect();
        let expected: Vec<&str> = labels.iter().map(String::as_str).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn label_with_delimiter_rejected(left in arb_label(), right in arb_label(), command in arb_command()) {
        let probe = Probe::new(format!("{left} | {right}"), command);
        let invalid = matches!(ProbeSet::new(vec![probe]), Err(ConfigError::InvalidProbe { index: 0, .. }));
        prop_assert!(invalid);
    }

    #[test]
    fn repeated_label_rejected(label in arb_label(), a in arb_command(), b in arb_command()) {
        let result = ProbeSet::new(vec![Probe::new(label.clone(), a), Probe::new(label, b)]);
        let duplicate = matches!(result, Err(ConfigError::DuplicateLabel(_)));
        prop_assert!(duplicate);
    }
}
