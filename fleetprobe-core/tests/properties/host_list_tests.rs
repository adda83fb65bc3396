//! Property-based tests for host list parsing

use fleetprobe_core::{ConfigError, HostList};
use proptest::prelude::*;

fn arb_address() -> impl Strategy<Value = String> {
    prop_oneof![
        "10\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        "[a-z]{3,10}\\.[a-z]{2,5}",
    ]
}

fn arb_unique_addresses(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(arb_address(), 1..max).prop_map(|set| set.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn parse_keeps_file_order(hosts in arb_unique_addresses(40)) {
        let content = hosts.join("\n");
        let list = HostList::parse(&content, 255).unwrap();
        prop_assert_eq!(list.into_vec(), hosts);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored(hosts in arb_unique_addresses(20)) {
        let mut content = String::from("# managed hosts\n\n");
        for host in &hosts {
            content.push_str(host);
            content.push_str("\n   \n# ");
            content.push_str(host);
            content.push('\n');
        }
        let list = HostList::parse(&content, 255).unwrap();
        prop_assert_eq!(list.len(), hosts.len());
    }

    #[test]
    fn capacity_is_enforced(hosts in arb_unique_addresses(40), max in 1usize..40) {
        let result = HostList::parse(&hosts.join("\n"), max);
        if hosts.len() > max {
            let too_many = matches!(result, Err(ConfigError::TooManyHosts { .. }));
            prop_assert!(too_many);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn duplicate_is_always_rejected(hosts in arb_unique_addresses(20), pick in any::<prop::sample::Index>()) {
        let mut with_dup = hosts.clone();
        with_dup.push(pick.get(&hosts).clone());
        let result = HostList::parse(&with_dup.join("\n"), 255);
        let duplicate = matches!(result, Err(ConfigError::DuplicateHost(_)));
        prop_assert!(duplicate);
    }

    #[test]
    fn whitespace_only_content_is_empty(ws in "[ \t\n]{0,40}") {
        let empty = matches!(HostList::parse(&ws, 255), Err(ConfigError::EmptyHostList));
        prop_assert!(empty);
    }
}
