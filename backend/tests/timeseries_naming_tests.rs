//! Raster and time-series cache naming tests

use chrono::NaiveDate;
use proptest::prelude::*;
use shared::{timeseries_cache_file_name, TimeseriesVariable};
use uuid::Uuid;

fn variable(name: &str) -> TimeseriesVariable {
    name.parse().unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_cache_file_name_format() {
        let id = Uuid::parse_str("6f1c7a52-3b8e-4c1d-9a0e-2f5b8d7c4e11").unwrap();
        assert_eq!(
            timeseries_cache_file_name(id, &variable("rain")),
            "agrifield6f1c7a52-3b8e-4c1d-9a0e-2f5b8d7c4e11-rain.hts"
        );
    }

    #[test]
    fn test_raster_prefix() {
        assert_eq!(variable("evaporation").raster_prefix(), "daily_evaporation");
    }

    #[test]
    fn test_raster_date_parsing() {
        let rain = variable("rain");
        assert_eq!(
            rain.raster_date("daily_rain-2023-06-30.tif"),
            NaiveDate::from_ymd_opt(2023, 6, 30)
        );
        assert_eq!(rain.raster_date("daily_rain-2023-02-30.tif"), None);
        assert_eq!(rain.raster_date("daily_rain-2023-06-30.tiff"), None);
        assert_eq!(rain.raster_date("daily_evaporation-2023-06-30.tif"), None);
        assert_eq!(rain.raster_date("daily_rainfall-2023-06-30.tif"), None);
    }

    #[test]
    fn test_unsafe_variables_rejected() {
        for name in ["", "../etc", "Rain", "rain fall", "rain/x", "rain.tif"] {
            assert!(name.parse::<TimeseriesVariable>().is_err(), "{:?} accepted", name);
        }
        assert!("temperature_max".parse::<TimeseriesVariable>().is_ok());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (0i64..20_000).prop_map(|days| {
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Duration::days(days)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A raster named after a date parses back to that date
        #[test]
        fn prop_raster_name_yields_date(name in "[a-z0-9_]{1,12}", date in date_strategy()) {
            let var = variable(&name);
            let file_name = format!("{}-{}.tif", var.raster_prefix(), date.format("%Y-%m-%d"));
            prop_assert_eq!(var.raster_date(&file_name), Some(date));
        }

        /// Accepted names never contain path separators or dots
        #[test]
        fn prop_accepted_names_are_file_safe(name in "\\PC{0,12}") {
            if let Ok(var) = name.parse::<TimeseriesVariable>() {
                prop_assert!(!var.as_str().contains(['/', '\\', '.']));
                prop_assert!(!var.as_str().is_empty());
            }
        }
    }
}
