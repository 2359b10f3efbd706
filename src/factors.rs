use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    check_input, SavingsError, SavingsReport, SavingsResult, CO2_PER_GB_YEAR_KG, CO2_PER_SPAM_KG,
    CO2_PER_TREE_YEAR_KG, DAYS_PER_YEAR,
};

#[derive(Debug, Error)]
pub enum FactorsError {
    #[error("failed to read factors file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse factors file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid emission factor {field}: {value}")]
    Invalid { field: &'static str, value: f64 },
}

/// The three per-unit CO2 constants as one value. Missing TOML keys
/// fall back to the crate constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionFactors {
    pub co2_per_spam_kg: f64,
    pub co2_per_gb_year_kg: f64,
    pub co2_per_tree_year_kg: f64,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        EmissionFactors {
            co2_per_spam_kg: CO2_PER_SPAM_KG,
            co2_per_gb_year_kg: CO2_PER_GB_YEAR_KG,
            co2_per_tree_year_kg: CO2_PER_TREE_YEAR_KG,
        }
    }
}

impl EmissionFactors {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Read, parse and validate a factors file.
    pub fn load(path: &Path) -> Result<Self, FactorsError> {
        let content = std::fs::read_to_string(path).map_err(|source| FactorsError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let factors = Self::from_toml_str(&content).map_err(|source| FactorsError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
        factors.validate()?;
        info!(path = %path.display(), ?factors, "loaded emission factors");
        Ok(factors)
    }

    /// Spam and cloud factors may be zero; the tree factor is a divisor
    /// and must be strictly positive.
    pub fn validate(&self) -> Result<(), FactorsError> {
        for (field, value) in [
            ("co2_per_spam_kg", self.co2_per_spam_kg),
            ("co2_per_gb_year_kg", self.co2_per_gb_year_kg),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FactorsError::Invalid { field, value });
            }
        }
        let tree = self.co2_per_tree_year_kg;
        if !tree.is_finite() || tree <= 0.0 {
            return Err(FactorsError::Invalid {
                field: "co2_per_tree_year_kg",
                value: tree,
            });
        }
        Ok(())
    }

    pub fn spam_saving(&self, daily_spam_count: f64) -> f64 {
        let per_year = daily_spam_count * DAYS_PER_YEAR;
        per_year * self.co2_per_spam_kg
    }

    pub fn cloud_saving(&self, deleted_gigabytes: f64) -> f64 {
        deleted_gigabytes * self.co2_per_gb_year_kg
    }

    pub fn total_saving(&self, daily_spam_count: f64, deleted_gigabytes: f64) -> SavingsResult {
        SavingsResult::from_parts(
            self.spam_saving(daily_spam_count),
            self.cloud_saving(deleted_gigabytes),
        )
    }

    pub fn tree_equivalent(&self, total_saving_kg: f64) -> f64 {
        if total_saving_kg.is_nan() || total_saving_kg <= 0.0 {
            return 0.0;
        }
        total_saving_kg / self.co2_per_tree_year_kg
    }

    pub fn try_total_saving(
        &self,
        daily_spam_count: f64,
        deleted_gigabytes: f64,
    ) -> Result<SavingsResult, SavingsError> {
        let (d, g) = check_inputs(daily_spam_count, deleted_gigabytes)
            .inspect_err(|e| warn!(error = %e, "rejected savings input"))?;
        Ok(self.total_saving(d, g))
    }

    pub fn report(
        &self,
        label: Option<String>,
        daily_spam_count: f64,
        deleted_gigabytes: f64,
    ) -> SavingsReport {
        let savings = self.total_saving(daily_spam_count, deleted_gigabytes);
        self.finish_report(label, daily_spam_count, deleted_gigabytes, savings)
    }

    pub fn try_report(
        &self,
        label: Option<String>,
        daily_spam_count: f64,
        deleted_gigabytes: f64,
    ) -> Result<SavingsReport, SavingsError> {
        let savings = self.try_total_saving(daily_spam_count, deleted_gigabytes)?;
        Ok(self.finish_report(label, daily_spam_count, deleted_gigabytes, savings))
    }

    fn finish_report(
        &self,
        label: Option<String>,
        daily_spam_count: f64,
        deleted_gigabytes: f64,
        savings: SavingsResult,
    ) -> SavingsReport {
        let tree_equivalent = self.tree_equivalent(savings.total_saving_kg);
        debug!(
            label = label.as_deref().unwrap_or("-"),
            daily_spam_count,
            deleted_gigabytes,
            total_saving_kg = savings.total_saving_kg,
            tree_equivalent,
            "computed savings"
        );
        SavingsReport {
            label,
            daily_spam_count,
            deleted_gigabytes,
            savings,
            tree_equivalent,
        }
    }
}

fn check_inputs(
    daily_spam_count: f64,
    deleted_gigabytes: f64,
) -> Result<(f64, f64), SavingsError> {
    let d = check_input("daily_spam_count", daily_spam_count)?;
    let g = check_input("deleted_gigabytes", deleted_gigabytes)?;
    Ok((d, g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_matches_constants() {
        let f = EmissionFactors::default();
        assert_eq!(f.co2_per_spam_kg, 0.0003);
        assert_eq!(f.co2_per_gb_year_kg, 2.0);
        assert_eq!(f.co2_per_tree_year_kg, 20.0);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let f = EmissionFactors::from_toml_str("co2_per_gb_year_kg = 3.5\n").unwrap();
        assert_eq!(f.co2_per_gb_year_kg, 3.5);
        assert_eq!(f.co2_per_spam_kg, CO2_PER_SPAM_KG);
        assert_eq!(f.co2_per_tree_year_kg, CO2_PER_TREE_YEAR_KG);
        assert_eq!(f.cloud_saving(2.0), 7.0);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(
            EmissionFactors::from_toml_str("").unwrap(),
            EmissionFactors::default()
        );
    }

    #[test]
    fn validate_rejects_bad_factors() {
        let f = EmissionFactors {
            co2_per_tree_year_kg: 0.0,
            ..EmissionFactors::default()
        };
        assert!(matches!(
            f.validate(),
            Err(FactorsError::Invalid {
                field: "co2_per_tree_year_kg",
                ..
            })
        ));

        let f = EmissionFactors {
            co2_per_spam_kg: -0.1,
            ..EmissionFactors::default()
        };
        assert!(matches!(
            f.validate(),
            Err(FactorsError::Invalid {
                field: "co2_per_spam_kg",
                ..
            })
        ));

        let f = EmissionFactors {
            co2_per_gb_year_kg: f64::NAN,
            ..EmissionFactors::default()
        };
        assert!(f.validate().is_err());
    }

    #[test]
    fn load_reads_and_validates_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "co2_per_spam_kg = 0.001\nco2_per_tree_year_kg = 25.0").unwrap();
        let f = EmissionFactors::load(file.path()).unwrap();
        assert_eq!(f.co2_per_spam_kg, 0.001);
        assert_eq!(f.tree_equivalent(50.0), 2.0);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "co2_per_tree_year_kg = -1.0").unwrap();
        assert!(matches!(
            EmissionFactors::load(bad.path()),
            Err(FactorsError::Invalid { .. })
        ));
    }

    #[test]
    fn load_reports_io_and_parse_errors() {
        let missing = Path::new("/nonexistent/carbon/factors.toml");
        assert!(matches!(
            EmissionFactors::load(missing),
            Err(FactorsError::ReadFile { .. })
        ));

        let mut garbled = tempfile::NamedTempFile::new().unwrap();
        writeln!(garbled, "co2_per_spam_kg = \"lots\"").unwrap();
        assert!(matches!(
            EmissionFactors::load(garbled.path()),
            Err(FactorsError::ParseFile { .. })
        ));
    }

    #[test]
    fn custom_factors_flow_through_report() {
        let f = EmissionFactors {
            co2_per_spam_kg: 0.001,
            co2_per_gb_year_kg: 1.0,
            co2_per_tree_year_kg: 10.0,
        };
        let r = f.report(Some("office".into()), 100.0, 5.0);
        assert!((r.savings.spam_saving_kg - 36.5).abs() < 1e-9);
        assert_eq!(r.savings.cloud_saving_kg, 5.0);
        assert!((r.tree_equivalent - 4.15).abs() < 1e-9);
        assert_eq!(r.label.as_deref(), Some("office"));
    }

    #[test]
    fn report_zero_input_has_no_trees() {
        let r = EmissionFactors::default().report(None, 0.0, 0.0);
        assert_eq!(r.savings, SavingsResult::default());
        assert_eq!(r.tree_equivalent, 0.0);
    }

    #[test]
    fn try_report_rejects_negative() {
        let f = EmissionFactors::default();
        assert!(f.try_report(None, 1.0, -3.0).is_err());
        let ok = f.try_report(None, 10.0, 5.0).unwrap();
        assert_eq!(ok, f.report(None, 10.0, 5.0));
    }
}
