/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use crm_account_gateway::crm_client::parse_entity_id;
use crm_account_gateway::validation::is_present;
use proptest::prelude::*;
use serde_json::Value;

// Property: Location parsing never panics and only yields GUIDs
proptest! {
    #[test]
    fn location_parsing_never_panics(location in "\\PC*") {
        let _ = parse_entity_id(&location);
    }

    #[test]
    fn guid_is_recovered_from_any_entity_set(
        entity_set in "[a-z_]{1,20}",
        host in "[a-z]{1,12}",
        bytes in proptest::array::uniform16(any::<u8>())
    ) {
        let guid = uuid::Uuid::from_bytes(bytes);
        let location = format!(
            "https://{}.crm.dynamics.com/api/data/v9.0/{}({})",
            host, entity_set, guid
        );
        prop_assert_eq!(parse_entity_id(&location).unwrap(), guid);
    }

    #[test]
    fn trailing_garbage_after_guid_is_ignored(
        bytes in proptest::array::uniform16(any::<u8>()),
        suffix in "[a-z]{0,5}"
    ) {
        let guid = uuid::Uuid::from_bytes(bytes);
        let location = format!("/contacts({}){}", guid, suffix);
        prop_assert_eq!(parse_entity_id(&location).unwrap(), guid);
    }
}

// Property: non-empty strings are always present, whatever they contain
proptest! {
    #[test]
    fn non_empty_strings_are_present(s in "\\PC+") {
        let value = Value::String(s);
        prop_assert!(is_present(Some(&value)));
    }

    #[test]
    fn non_zero_integers_are_present(n in any::<i64>().prop_filter("non-zero", |n| *n != 0)) {
        let value = Value::from(n);
        prop_assert!(is_present(Some(&value)));
    }
}
