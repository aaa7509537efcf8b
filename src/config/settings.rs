use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::config::{CrossCheck, QcConfig, RangeBounds};
use crate::error::{ProcessingError, Result};
use crate::models::QuantityCode;
use crate::utils::constants::{CONFIG_ENV_PREFIX, CONFIG_ENV_SEPARATOR};

/// User-facing QC settings as read from file and environment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_bounds"))]
pub struct QcSettings {
    pub low_threshold: f64,

    pub high_threshold: f64,

    #[validate(range(min = 0.0))]
    pub margin: f64,

    #[validate(length(min = 1))]
    pub reference_quantity: String,

    /// Quantity code -> relationship name (`max`, `min`, `mean`, `none`)
    pub cross_checks: BTreeMap<String, String>,
}

fn validate_bounds(settings: &QcSettings) -> std::result::Result<(), ValidationError> {
    let finite = settings.low_threshold.is_finite()
        && settings.high_threshold.is_finite()
        && settings.margin.is_finite();
    if !finite {
        return Err(ValidationError::new("non_finite_threshold"));
    }
    if settings.low_threshold >= settings.high_threshold {
        return Err(ValidationError::new("low_threshold_not_below_high_threshold"));
    }
    Ok(())
}

impl Default for QcSettings {
    fn default() -> Self {
        let defaults = QcConfig::default();
        Self {
            low_threshold: defaults.bounds.low,
            high_threshold: defaults.bounds.high,
            margin: defaults.margin,
            reference_quantity: defaults.reference_quantity.to_string(),
            cross_checks: defaults
                .cross_checks
                .iter()
                .map(|(code, check)| (code.to_string(), check.to_string()))
                .collect(),
        }
    }
}

impl QcSettings {
    /// Validate and freeze into the configuration the evaluator runs with.
    ///
    /// Every problem here is fatal: nothing is evaluated under a
    /// configuration that fails these checks.
    pub fn into_config(self) -> Result<QcConfig> {
        self.validate()?;

        let reference_quantity = QuantityCode::new(&self.reference_quantity);
        let mut cross_checks = BTreeMap::new();

        for (quantity, relation) in &self.cross_checks {
            let check = relation
                .parse::<CrossCheck>()
                .map_err(|relation| ProcessingError::UnknownRelationship {
                    quantity: quantity.clone(),
                    relation,
                })?;

            let quantity = QuantityCode::new(quantity);
            if quantity == reference_quantity && check != CrossCheck::None {
                return Err(ProcessingError::Config(format!(
                    "reference quantity {} cannot be cross-checked against itself",
                    quantity
                )));
            }

            cross_checks.insert(quantity, check);
        }

        Ok(QcConfig {
            bounds: RangeBounds {
                low: self.low_threshold,
                high: self.high_threshold,
            },
            margin: self.margin,
            reference_quantity,
            cross_checks,
        })
    }
}

/// Load settings from defaults, an optional file and `STATION_QC__*`
/// environment variables, in increasing order of precedence.
pub fn load_settings(path: Option<&Path>) -> Result<QcSettings> {
    let mut builder = config::Config::builder().add_source(default_source()?);

    if let Some(path) = path {
        debug!("Loading QC settings from {}", path.display());
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(CONFIG_ENV_PREFIX)
            .separator(CONFIG_ENV_SEPARATOR)
            .try_parsing(true),
    );

    let settings: QcSettings = builder.build()?.try_deserialize()?;
    Ok(settings)
}

/// Defaults as the lowest layer, so a file or environment key overrides a
/// single `cross_checks` entry instead of replacing the whole map.
///
/// Keys are lower-cased to line up with the keys `config` reads from files
/// and the environment.
fn default_source() -> Result<config::Config> {
    let mut defaults = QcSettings::default();
    defaults.cross_checks = defaults
        .cross_checks
        .into_iter()
        .map(|(code, relation)| (code.to_lowercase(), relation))
        .collect();
    Ok(config::Config::try_from(&defaults)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_settings_are_valid() {
        let config = QcSettings::default().into_config().unwrap();
        assert_eq!(config, QcConfig::default());
    }

    #[test]
    fn test_unknown_relationship_is_fatal() {
        let mut settings = QcSettings::default();
        settings
            .cross_checks
            .insert("TMAX".to_string(), "median".to_string());

        match settings.into_config() {
            Err(ProcessingError::UnknownRelationship { quantity, relation }) => {
                assert_eq!(quantity, "TMAX");
                assert_eq!(relation, "median");
            }
            other => panic!("expected unknown relationship error, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let settings = QcSettings {
            low_threshold: 100.0,
            high_threshold: 0.0,
            ..QcSettings::default()
        };
        assert!(matches!(
            settings.into_config(),
            Err(ProcessingError::Validation(_))
        ));
    }

    #[test]
    fn test_negative_margin_rejected() {
        let settings = QcSettings {
            margin: -1.0,
            ..QcSettings::default()
        };
        assert!(settings.into_config().is_err());
    }

    #[test]
    fn test_reference_cannot_cross_check_itself() {
        let mut settings = QcSettings::default();
        settings
            .cross_checks
            .insert("tobs".to_string(), "mean".to_string());
        assert!(matches!(
            settings.into_config(),
            Err(ProcessingError::Config(_))
        ));
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "margin = 3.0\nhigh_threshold = 120.0\n\n[cross_checks]\nTMAX = \"max\"\nTAVG = \"none\""
        )
        .unwrap();

        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.margin, 3.0);
        assert_eq!(settings.high_threshold, 120.0);
        assert_eq!(settings.low_threshold, -50.0);

        let config = settings.into_config().unwrap();
        assert_eq!(
            config.cross_check_for(&QuantityCode::new("TMAX")),
            CrossCheck::Maximum
        );
        assert_eq!(
            config.cross_check_for(&QuantityCode::new("TAVG")),
            CrossCheck::None
        );
        // Entries the file leaves out keep their defaults
        assert_eq!(
            config.cross_check_for(&QuantityCode::new("TMIN")),
            CrossCheck::Minimum
        );
    }

    #[test]
    fn test_partial_cross_check_override_keeps_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[cross_checks]\nTMAX = \"none\"").unwrap();

        let config = load_settings(Some(file.path()))
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.cross_checks.len(), 3);
        assert_eq!(
            config.cross_check_for(&QuantityCode::new("TMAX")),
            CrossCheck::None
        );
        assert_eq!(
            config.cross_check_for(&QuantityCode::new("TMIN")),
            CrossCheck::Minimum
        );
        assert_eq!(
            config.cross_check_for(&QuantityCode::new("TAVG")),
            CrossCheck::Mean
        );
    }
}
