//! Vocabulary normalization for incoming readings
//!
//! Field devices report operator and communication-type codes in their raw
//! firmware vocabulary. Dashboards display the carrier names, so ingestion
//! normalizes them once at the boundary. Unmapped codes pass through
//! unchanged rather than being rejected.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static OPERATORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("OperateurI", "INWI"),
        ("OperateurM", "IAM"),
        ("OperateurO", "ORANGE"),
    ])
});

static COMM_TYPES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("Protocole900", "GSM")]));

/// Normalize a raw operator code to its display name
pub fn normalize_operator(raw: &str) -> String {
    OPERATORS.get(raw).map_or_else(|| raw.to_string(), |s| s.to_string())
}

/// Normalize a raw communication-type code to its display name
pub fn normalize_comm_type(raw: &str) -> String {
    COMM_TYPES.get(raw).map_or_else(|| raw.to_string(), |s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_operators_map_to_carrier_names() {
        assert_eq!(normalize_operator("OperateurI"), "INWI");
        assert_eq!(normalize_operator("OperateurM"), "IAM");
        assert_eq!(normalize_operator("OperateurO"), "ORANGE");
    }

    #[test]
    fn test_unknown_operator_passes_through() {
        assert_eq!(normalize_operator("OperateurX"), "OperateurX");
        assert_eq!(normalize_operator(""), "");
    }

    #[test]
    fn test_comm_type_mapping() {
        assert_eq!(normalize_comm_type("Protocole900"), "GSM");
        assert_eq!(normalize_comm_type("Protocole1800"), "Protocole1800");
    }
}
