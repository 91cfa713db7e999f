//! Конфигурация варианта пайплайна: группы переменных и параметры шагов

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Classification,
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingStrategy {
    /// Индикаторные колонки без первого уровня
    OneHot,
    /// Ранг по среднему значению целевой переменной
    Ordinal,
}

/// Что делать с категорией, которой не было при обучении
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnseenCategoryPolicy {
    Reject,
    GlobalMeanRank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerKind {
    Standard,
    MinMax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorConfig {
    Ridge {
        alpha: f64,
    },
    /// L1-регуляризация, координатный спуск
    Lasso {
        alpha: f64,
        #[serde(default = "default_max_iter")]
        max_iter: usize,
    },
    Logistic {
        c: f64,
        #[serde(default = "default_max_iter")]
        max_iter: usize,
        #[serde(default = "default_learning_rate")]
        learning_rate: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearVariable {
    pub column: String,
    pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub task: Task,
    pub target: String,
    /// Колонки, которые отбрасываются до первого шага
    #[serde(default)]
    pub drop_columns: Vec<String>,
    #[serde(default)]
    pub categorical_to_impute: Vec<String>,
    #[serde(default)]
    pub missing_indicator: Vec<String>,
    #[serde(default)]
    pub numerical_to_impute: Vec<String>,
    #[serde(default)]
    pub year_variable: Option<YearVariable>,
    #[serde(default)]
    pub numerical_log: Vec<String>,
    #[serde(default)]
    pub first_letter: Vec<String>,
    #[serde(default)]
    pub categorical_encode: Vec<String>,
    #[serde(default = "default_encoding")]
    pub encoding: EncodingStrategy,
    #[serde(default = "default_unseen_policy")]
    pub unseen_policy: UnseenCategoryPolicy,
    #[serde(default = "default_rare_tolerance")]
    pub rare_tolerance: f64,
    #[serde(default = "default_missing_label")]
    pub missing_label: String,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default = "default_scaler")]
    pub scaler: ScalerKind,
    pub estimator: EstimatorConfig,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default)]
    pub random_state: u64,
}

fn default_encoding() -> EncodingStrategy { EncodingStrategy::OneHot }
fn default_unseen_policy() -> UnseenCategoryPolicy { UnseenCategoryPolicy::GlobalMeanRank }
fn default_rare_tolerance() -> f64 { 0.05 }
fn default_missing_label() -> String { "Missing".to_string() }
fn default_scaler() -> ScalerKind { ScalerKind::Standard }
fn default_test_size() -> f64 { 0.2 }
fn default_max_iter() -> usize { 1000 }
fn default_learning_rate() -> f64 { 0.5 }

impl PipelineConfig {
    /// Классификация выживших пассажиров Титаника
    pub fn titanic() -> Self {
        let categorical = vec![
            "sex".to_string(),
            "cabin".to_string(),
            "embarked".to_string(),
            "title".to_string(),
        ];
        let numerical = vec!["age".to_string(), "fare".to_string()];

        Self {
            task: Task::Classification,
            target: "survived".to_string(),
            drop_columns: ["name", "ticket", "boat", "body", "home.dest"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            categorical_to_impute: categorical.clone(),
            missing_indicator: numerical.clone(),
            numerical_to_impute: numerical,
            year_variable: None,
            numerical_log: Vec::new(),
            first_letter: vec!["cabin".to_string()],
            categorical_encode: categorical,
            encoding: EncodingStrategy::OneHot,
            unseen_policy: UnseenCategoryPolicy::GlobalMeanRank,
            rare_tolerance: 0.05,
            missing_label: default_missing_label(),
            features: None,
            scaler: ScalerKind::Standard,
            estimator: EstimatorConfig::Logistic {
                c: 0.0005,
                max_iter: default_max_iter(),
                learning_rate: default_learning_rate(),
            },
            test_size: 0.2,
            random_state: 0,
        }
    }

    /// Регрессия цены дома
    pub fn house_prices() -> Self {
        let strings = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let categorical_to_impute = strings(&[
            "MasVnrType", "BsmtQual", "BsmtExposure", "FireplaceQu", "GarageType", "GarageFinish",
        ]);
        let categorical_encode = strings(&[
            "MSZoning", "Neighborhood", "RoofStyle", "MasVnrType", "BsmtQual", "BsmtExposure",
            "HeatingQC", "CentralAir", "KitchenQual", "FireplaceQu", "GarageType", "GarageFinish",
            "PavedDrive",
        ]);
        let numerical_to_impute = strings(&["LotFrontage"]);
        let features = strings(&[
            "MSSubClass", "MSZoning", "Neighborhood", "OverallQual", "OverallCond", "YearRemodAdd",
            "RoofStyle", "MasVnrType", "BsmtQual", "BsmtExposure", "HeatingQC", "CentralAir",
            "1stFlrSF", "GrLivArea", "BsmtFullBath", "KitchenQual", "Fireplaces", "FireplaceQu",
            "GarageType", "GarageFinish", "GarageCars", "PavedDrive", "LotFrontage",
        ]);

        Self {
            task: Task::Regression,
            target: "SalePrice".to_string(),
            drop_columns: strings(&["Id"]),
            categorical_to_impute,
            missing_indicator: Vec::new(),
            numerical_to_impute,
            year_variable: Some(YearVariable {
                column: "YearRemodAdd".to_string(),
                reference: "YrSold".to_string(),
            }),
            numerical_log: strings(&["LotFrontage", "1stFlrSF", "GrLivArea"]),
            first_letter: Vec::new(),
            categorical_encode,
            encoding: EncodingStrategy::Ordinal,
            unseen_policy: UnseenCategoryPolicy::GlobalMeanRank,
            rare_tolerance: 0.01,
            missing_label: default_missing_label(),
            features: Some(features),
            scaler: ScalerKind::MinMax,
            estimator: EstimatorConfig::Lasso {
                alpha: 0.005,
                max_iter: default_max_iter(),
            },
            test_size: 0.1,
            random_state: 0,
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(PipelineError::InvalidConfig("target column is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.rare_tolerance) {
            return Err(PipelineError::InvalidConfig(format!(
                "rare_tolerance must be in [0, 1], got {}",
                self.rare_tolerance
            )));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.missing_label.is_empty() {
            return Err(PipelineError::InvalidConfig("missing_label is empty".to_string()));
        }

        let groups = [
            &self.categorical_to_impute,
            &self.missing_indicator,
            &self.numerical_to_impute,
            &self.numerical_log,
            &self.first_letter,
            &self.categorical_encode,
        ];
        if groups.iter().any(|group| group.contains(&self.target)) {
            return Err(PipelineError::InvalidConfig(format!(
                "target '{}' is listed as a feature",
                self.target
            )));
        }

        match (&self.task, &self.estimator) {
            (Task::Regression, EstimatorConfig::Ridge { alpha }) if *alpha < 0.0 => {
                Err(PipelineError::InvalidConfig("ridge alpha must be non-negative".to_string()))
            }
            (Task::Regression, EstimatorConfig::Lasso { alpha, .. }) if *alpha < 0.0 => {
                Err(PipelineError::InvalidConfig("lasso alpha must be non-negative".to_string()))
            }
            (Task::Classification, EstimatorConfig::Logistic { c, .. }) if *c <= 0.0 => {
                Err(PipelineError::InvalidConfig("logistic C must be positive".to_string()))
            }
            (Task::Regression, EstimatorConfig::Ridge { .. })
            | (Task::Regression, EstimatorConfig::Lasso { .. })
            | (Task::Classification, EstimatorConfig::Logistic { .. }) => Ok(()),
            (task, _) => Err(PipelineError::InvalidConfig(format!(
                "estimator does not match task {:?}",
                task
            ))),
        }
    }

    /// SHA-256 от канонического JSON конфигурации
    pub fn fingerprint(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&json)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(PipelineConfig::titanic().validate().is_ok());
        assert!(PipelineConfig::house_prices().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_tolerance() {
        let mut config = PipelineConfig::titanic();
        config.rare_tolerance = 1.5;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_estimator_for_wrong_task() {
        let mut config = PipelineConfig::titanic();
        config.estimator = EstimatorConfig::Ridge { alpha: 1.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{
            "task": "regression",
            "target": "price",
            "categorical_encode": ["zone"],
            "estimator": { "type": "ridge", "alpha": 0.1 }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.encoding, EncodingStrategy::OneHot);
        assert_eq!(config.rare_tolerance, 0.05);
        assert_eq!(config.missing_label, "Missing");
        assert_eq!(config.test_size, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_house_prices_uses_lasso() {
        let config = PipelineConfig::house_prices();
        assert!(matches!(config.estimator, EstimatorConfig::Lasso { alpha, .. } if alpha == 0.005));

        let estimator: EstimatorConfig =
            serde_json::from_str(r#"{ "type": "lasso", "alpha": 0.1 }"#).unwrap();
        assert_eq!(
            estimator,
            EstimatorConfig::Lasso {
                alpha: 0.1,
                max_iter: 1000
            }
        );

        let mut classifier = PipelineConfig::titanic();
        classifier.estimator = estimator;
        assert!(matches!(classifier.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_fingerprint_tracks_variable_groups() {
        let base = PipelineConfig::titanic();
        let mut changed = base.clone();
        changed.numerical_to_impute.push("sibsp".to_string());

        assert_eq!(base.fingerprint().unwrap(), PipelineConfig::titanic().fingerprint().unwrap());
        assert_ne!(base.fingerprint().unwrap(), changed.fingerprint().unwrap());
    }
}
