//! Input validation tests
//!
//! Coordinates, water amounts, usernames and uploaded file names.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    sanitize_file_name, validate_latitude, validate_longitude, validate_non_negative,
    validate_username,
};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_coordinate_edges() {
        assert!(validate_latitude(&dec("90")).is_ok());
        assert!(validate_latitude(&dec("-90")).is_ok());
        assert!(validate_latitude(&dec("-90.000001")).is_err());
        assert!(validate_longitude(&dec("180")).is_ok());
        assert!(validate_longitude(&dec("180.1")).is_err());
    }

    #[test]
    fn test_negative_zero_water_is_allowed() {
        assert!(validate_non_negative(&dec("-0.0")).is_ok());
        assert!(validate_non_negative(&dec("-0.01")).is_err());
    }

    #[test]
    fn test_usernames() {
        assert!(validate_username("demo").is_ok());
        assert!(validate_username("maria.k+field@coop").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("two words").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_file_names_lose_directories() {
        assert_eq!(
            sanitize_file_name("../../etc/passwd"),
            Some("passwd".to_string())
        );
        assert_eq!(
            sanitize_file_name("C:\\reports\\soil 2023.pdf"),
            Some("soil_2023.pdf".to_string())
        );
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("dir/"), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Latitudes in [-90, 90] are accepted, others rejected
        #[test]
        fn prop_latitude_range(hundredths in -10_000i64..=10_000i64) {
            let lat = Decimal::new(hundredths, 2);
            let in_range = (-9_000..=9_000).contains(&hundredths);
            prop_assert_eq!(validate_latitude(&lat).is_ok(), in_range);
        }

        /// Sanitized names are plain basenames
        #[test]
        fn prop_sanitized_names_are_basenames(name in "\\PC{0,40}") {
            if let Some(clean) = sanitize_file_name(&name) {
                prop_assert!(!clean.contains(['/', '\\']));
                prop_assert!(!clean.starts_with('.'));
                prop_assert!(clean
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')));
            }
        }
    }
}
