#![forbid(unsafe_code)]

use serde::Serialize;
use thiserror::Error;

pub mod batch;
pub mod factors;

pub use batch::{parse_batch_row, read_batch, BatchError, BatchRow};
pub use factors::{EmissionFactors, FactorsError};

/// 1 spam mail ≈ 0.3 g CO2.
pub const CO2_PER_SPAM_KG: f64 = 0.0003;

/// 1 GB of cloud storage held for one year ≈ 2 kg CO2.
pub const CO2_PER_GB_YEAR_KG: f64 = 2.0;

/// CO2 absorbed by one tree over one year (approximate).
pub const CO2_PER_TREE_YEAR_KG: f64 = 20.0;

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Annual savings split by category. Serializes with camelCase keys.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsResult {
    pub spam_saving_kg: f64,
    pub cloud_saving_kg: f64,
    pub total_saving_kg: f64,
}

impl SavingsResult {
    /// total == spam + cloud.
    pub fn from_parts(spam_saving_kg: f64, cloud_saving_kg: f64) -> Self {
        SavingsResult {
            spam_saving_kg,
            cloud_saving_kg,
            total_saving_kg: spam_saving_kg + cloud_saving_kg,
        }
    }
}

/// Full per-input record: inputs, savings and the guarded tree figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsReport {
    pub label: Option<String>,
    pub daily_spam_count: f64,
    pub deleted_gigabytes: f64,
    pub savings: SavingsResult,
    pub tree_equivalent: f64,
}

/// Rejections from the checked calculation path.
#[derive(Debug, Error, PartialEq)]
pub enum SavingsError {
    #[error("{field} must not be negative (got {value})")]
    NegativeInput { field: &'static str, value: f64 },
    #[error("{field} must be a finite number (got {value})")]
    NonFiniteInput { field: &'static str, value: f64 },
}

/// Annual CO2 (kg) avoided for a daily spam volume.
pub fn compute_spam_saving(daily_spam_count: f64) -> f64 {
    EmissionFactors::default().spam_saving(daily_spam_count)
}

/// Annual CO2 (kg) avoided by deleting cloud storage.
pub fn compute_cloud_saving(deleted_gigabytes: f64) -> f64 {
    EmissionFactors::default().cloud_saving(deleted_gigabytes)
}

pub fn compute_total_saving(daily_spam_count: f64, deleted_gigabytes: f64) -> SavingsResult {
    EmissionFactors::default().total_saving(daily_spam_count, deleted_gigabytes)
}

/// Trees needed for one year to absorb `total_saving_kg`.
/// NaN and non-positive totals map to 0, never a negative tree count.
pub fn compute_tree_equivalent(total_saving_kg: f64) -> f64 {
    EmissionFactors::default().tree_equivalent(total_saving_kg)
}

/// Same as [`compute_total_saving`] but rejects negative and non-finite inputs.
pub fn try_compute_total_saving(
    daily_spam_count: f64,
    deleted_gigabytes: f64,
) -> Result<SavingsResult, SavingsError> {
    EmissionFactors::default().try_total_saving(daily_spam_count, deleted_gigabytes)
}

pub(crate) fn check_input(field: &'static str, value: f64) -> Result<f64, SavingsError> {
    if !value.is_finite() {
        return Err(SavingsError::NonFiniteInput { field, value });
    }
    if value < 0.0 {
        return Err(SavingsError::NegativeInput { field, value });
    }
    Ok(value)
}

/// Sum of several reports' savings. Parts are summed first so the
/// total invariant still holds on the aggregate.
pub fn summarize(reports: &[SavingsReport]) -> SavingsResult {
    let spam: f64 = reports.iter().map(|r| r.savings.spam_saving_kg).sum();
    let cloud: f64 = reports.iter().map(|r| r.savings.cloud_saving_kg).sum();
    SavingsResult::from_parts(spam, cloud)
}
