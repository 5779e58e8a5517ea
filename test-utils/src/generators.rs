//! Shared proptest generators for Vault names and payloads.

use proptest::prelude::*;

/// Generate mount paths such as `charm-pki` or `team/transit`.
pub fn mount_path_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9-]{0,20}",
        ("[a-z][a-z0-9-]{0,10}", "[a-z][a-z0-9-]{0,10}").prop_map(|(a, b)| format!("{a}/{b}")),
    ]
}

/// Generate policy, role and key names.
pub fn vault_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,30}"
}

/// Generate raft node ids.
pub fn node_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "vault-[0-9]{1,2}",
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    ]
}

/// Generate IPv4 CIDR blocks.
pub fn cidr_strategy() -> impl Strategy<Value = String> {
    (any::<[u8; 4]>(), 8u8..=32)
        .prop_map(|([a, b, c, d], prefix)| format!("{a}.{b}.{c}.{d}/{prefix}"))
}

/// Generate lists of CIDR blocks, possibly empty.
pub fn cidr_list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(cidr_strategy(), 0..4)
}

/// Generate HTTP status codes Vault uses for API errors.
pub fn api_error_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(400u16),
        Just(401),
        Just(403),
        Just(404),
        Just(412),
        Just(429),
        Just(500),
        Just(501),
        Just(502),
        Just(503),
    ]
}

/// Generate error messages that never start with a mount-in-use prefix.
pub fn unrelated_error_message_strategy() -> impl Strategy<Value = String> {
    "(invalid|missing|permission denied|unsupported)[a-z ]{0,30}"
}

/// Generate DNS domain names.
pub fn domain_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,10}", 2..4).prop_map(|labels| labels.join("."))
}

/// Generate placeholder-free policy text, braces doubled for templating.
pub fn literal_policy_strategy() -> impl Strategy<Value = (String, String)> {
    "[a-z \"/*\\n=\\[\\]{}]{0,80}".prop_map(|raw| {
        let escaped = raw.replace('{', "{{").replace('}', "}}");
        (escaped, raw)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_mount_paths_have_no_edge_slashes(path in mount_path_strategy()) {
            prop_assert!(!path.starts_with('/'));
            prop_assert!(!path.ends_with('/'));
        }

        #[test]
        fn test_cidrs_have_prefix(cidr in cidr_strategy()) {
            let (addr, prefix) = cidr.split_once('/').unwrap();
            prop_assert_eq!(addr.split('.').count(), 4);
            let prefix: u8 = prefix.parse().unwrap();
            prop_assert!((8..=32).contains(&prefix));
        }

        #[test]
        fn test_unrelated_messages_avoid_in_use_prefixes(
            message in unrelated_error_message_strategy()
        ) {
            prop_assert!(!message.starts_with("path already in use"));
            prop_assert!(!message.starts_with("path is already in use"));
        }
    }
}
