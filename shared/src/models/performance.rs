//! Irrigation performance chart and its derived summary
//!
//! The Model Engine produces, per field, four parallel daily series: the
//! model-estimated irrigation (`chart_ifinal`), the irrigation actually applied
//! and the effective precipitation. The summary compares the two irrigation
//! totals as a whole-number percentage.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Raw performance series as returned by the Model Engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceChart {
    pub chart_dates: Vec<NaiveDate>,
    /// Estimated irrigation water amount (mm)
    pub chart_ifinal: Vec<Decimal>,
    /// Applied irrigation water amount (mm)
    pub applied_water: Vec<Decimal>,
    /// Effective precipitation (mm)
    pub chart_peff: Vec<Decimal>,
}

/// One row of a performance chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSample {
    pub date: NaiveDate,
    pub estimated: Decimal,
    pub applied: Decimal,
    pub effective_precipitation: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error(
        "performance series lengths differ: dates={dates}, estimated={estimated}, \
         applied={applied}, precipitation={precipitation}"
    )]
    LengthMismatch {
        dates: usize,
        estimated: usize,
        applied: usize,
        precipitation: usize,
    },
}

impl PerformanceChart {
    /// Zip the four series into rows. All series must have the same length.
    pub fn samples(&self) -> Result<Vec<PerformanceSample>, SeriesError> {
        let dates = self.chart_dates.len();
        if self.chart_ifinal.len() != dates
            || self.applied_water.len() != dates
            || self.chart_peff.len() != dates
        {
            return Err(SeriesError::LengthMismatch {
                dates,
                estimated: self.chart_ifinal.len(),
                applied: self.applied_water.len(),
                precipitation: self.chart_peff.len(),
            });
        }

        Ok(self
            .chart_dates
            .iter()
            .zip(&self.chart_ifinal)
            .zip(&self.applied_water)
            .zip(&self.chart_peff)
            .map(|(((date, estimated), applied), peff)| PerformanceSample {
                date: *date,
                estimated: *estimated,
                applied: *applied,
                effective_precipitation: *peff,
            })
            .collect())
    }
}

/// Difference of applied vs. estimated irrigation, in whole percent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentageDiff {
    Percent(i64),
    /// Estimated total is zero, so no ratio exists
    NotAvailable,
}

impl PercentageDiff {
    pub const NOT_AVAILABLE: &'static str = "Not Available";

    /// `round((applied - estimated) / estimated * 100)`, half to even.
    pub fn between(sum_estimated: Decimal, sum_applied: Decimal) -> Self {
        if sum_estimated.is_zero() {
            return Self::NotAvailable;
        }

        sum_applied
            .checked_sub(sum_estimated)
            .and_then(|delta| delta.checked_div(sum_estimated))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .and_then(|percent| percent.round().to_i64())
            .map(Self::Percent)
            .unwrap_or(Self::NotAvailable)
    }

    pub fn as_percent(&self) -> Option<i64> {
        match self {
            Self::Percent(value) => Some(*value),
            Self::NotAvailable => None,
        }
    }
}

impl fmt::Display for PercentageDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(value) => write!(f, "{}", value),
            Self::NotAvailable => f.write_str(Self::NOT_AVAILABLE),
        }
    }
}

impl Serialize for PercentageDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Percent(value) => serializer.serialize_i64(*value),
            Self::NotAvailable => serializer.serialize_str(Self::NOT_AVAILABLE),
        }
    }
}

/// Totals derived from a performance chart
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PerformanceSummary {
    pub sum_ifinal: Decimal,
    pub sum_applied_water: Decimal,
    pub percentage_diff: PercentageDiff,
}

impl PerformanceSummary {
    /// Sums each irrigation column on its own. A missing chart degenerates to
    /// zero totals and an unavailable percentage. A total that overflows is
    /// reported saturated and the percentage is unavailable.
    pub fn from_chart(chart: Option<&PerformanceChart>) -> Self {
        let Some(chart) = chart else {
            return Self {
                sum_ifinal: Decimal::ZERO,
                sum_applied_water: Decimal::ZERO,
                percentage_diff: PercentageDiff::NotAvailable,
            };
        };

        match (
            checked_total(&chart.chart_ifinal),
            checked_total(&chart.applied_water),
        ) {
            (Some(sum_ifinal), Some(sum_applied_water)) => Self {
                sum_ifinal,
                sum_applied_water,
                percentage_diff: PercentageDiff::between(sum_ifinal, sum_applied_water),
            },
            _ => Self {
                sum_ifinal: saturating_total(&chart.chart_ifinal),
                sum_applied_water: saturating_total(&chart.applied_water),
                percentage_diff: PercentageDiff::NotAvailable,
            },
        }
    }
}

fn checked_total(values: &[Decimal]) -> Option<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(*value))
}

fn saturating_total(values: &[Decimal]) -> Decimal {
    values
        .iter()
        .fold(Decimal::ZERO, |total, value| total.saturating_add(*value))
}

/// Summary plus the series it was computed from
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceReport {
    #[serde(flatten)]
    pub summary: PerformanceSummary,
    pub chart: Option<PerformanceChart>,
}

impl PerformanceReport {
    pub fn new(chart: Option<PerformanceChart>) -> Self {
        Self {
            summary: PerformanceSummary::from_chart(chart.as_ref()),
            chart,
        }
    }
}
