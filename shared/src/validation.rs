//! Validation utilities for the Aira irrigation advisory service
//!
//! The `validate_*` functions returning [`ValidationError`] are meant for
//! `#[validate(custom = "...")]` attributes on input structs.

use std::borrow::Cow;

use rust_decimal::Decimal;
use uuid::Uuid;
use validator::ValidationError;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

// ============================================================================
// Location
// ============================================================================

pub fn validate_latitude(latitude: &Decimal) -> Result<(), ValidationError> {
    if *latitude < Decimal::from(-90) || *latitude > Decimal::from(90) {
        return Err(error("latitude", "Latitude must be between -90 and 90"));
    }
    Ok(())
}

pub fn validate_longitude(longitude: &Decimal) -> Result<(), ValidationError> {
    if *longitude < Decimal::from(-180) || *longitude > Decimal::from(180) {
        return Err(error("longitude", "Longitude must be between -180 and 180"));
    }
    Ok(())
}

// ============================================================================
// Quantities
// ============================================================================

/// Areas and water amounts cannot be negative
pub fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(error("non_negative", "Value cannot be negative"));
    }
    Ok(())
}

// ============================================================================
// Accounts
// ============================================================================

/// Usernames: 1-150 characters of letters, digits and `@.+-_`
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = !username.is_empty()
        && username.chars().count() <= 150
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !valid {
        return Err(error(
            "username",
            "Username may contain only letters, digits and @/./+/-/_",
        ));
    }
    Ok(())
}

/// A farmer cannot supervise themselves
pub fn validate_supervisor(farmer_id: Uuid, supervisor_id: Option<Uuid>) -> Result<(), &'static str> {
    if supervisor_id == Some(farmer_id) {
        return Err("A user cannot be their own supervisor");
    }
    Ok(())
}

// ============================================================================
// Uploads
// ============================================================================

/// Reduce an uploaded file name to a safe basename.
///
/// Path components are dropped and anything outside `[A-Za-z0-9._-]` becomes
/// `_`. Returns `None` when nothing usable is left.
pub fn sanitize_file_name(file_name: &str) -> Option<String> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_coordinates_bounds() {
        assert!(validate_latitude(&dec("39.15")).is_ok());
        assert!(validate_latitude(&dec("90.0001")).is_err());
        assert!(validate_longitude(&dec("20.98")).is_ok());
        assert!(validate_longitude(&dec("-180.5")).is_err());
    }

    #[test]
    fn test_non_negative() {
        assert!(validate_non_negative(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative(&dec("12.5")).is_ok());
        assert!(validate_non_negative(&dec("-0.1")).is_err());
    }

    #[test]
    fn test_usernames() {
        assert!(validate_username("farmer.giorgos").is_ok());
        assert!(validate_username("a+b@c-d_e").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("with space").is_err());
        assert!(validate_username("../etc").is_err());
    }

    #[test]
    fn test_supervisor_cannot_be_farmer() {
        let farmer = Uuid::new_v4();
        assert!(validate_supervisor(farmer, None).is_ok());
        assert!(validate_supervisor(farmer, Some(Uuid::new_v4())).is_ok());
        assert!(validate_supervisor(farmer, Some(farmer)).is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("soil.pdf").as_deref(), Some("soil.pdf"));
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_file_name("C:\\docs\\soil report.pdf").as_deref(),
            Some("soil_report.pdf")
        );
        assert_eq!(sanitize_file_name("..").as_deref(), None);
        assert_eq!(sanitize_file_name("").as_deref(), None);
    }
}
