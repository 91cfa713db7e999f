/// Модуль предобработки данных

pub mod encoding;
pub mod feature_engineering;
pub mod missing;
pub mod normalization;
pub mod rare_label;

pub use encoding::{OneHotEncoder, OrdinalEncoder};
pub use feature_engineering::{ElapsedYears, FeatureSelector, FirstLetter, LogTransform};
pub use missing::{CategoricalImputer, MissingIndicator, NumericalImputer};
pub use normalization::Scaler;
pub use rare_label::{RareLabelEncoder, RARE_LABEL};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::params::LearnedParams;
use crate::types::Table;

/// Шаг пайплайна: обучение параметров и их применение.
///
/// `apply` не меняет входную таблицу и не обучается заново: все параметры
/// приходят из `learn`, вызванного на обучающей выборке.
pub trait Transformer {
    type Params;

    fn name(&self) -> &'static str;

    fn learn(&self, table: &Table, target: &[f64]) -> Result<Self::Params>;

    fn apply(&self, table: &Table, params: &Self::Params) -> Result<Table>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    CategoricalImputer(CategoricalImputer),
    MissingIndicator(MissingIndicator),
    NumericalImputer(NumericalImputer),
    ElapsedYears(ElapsedYears),
    LogTransform(LogTransform),
    FirstLetter(FirstLetter),
    RareLabel(RareLabelEncoder),
    OneHot(OneHotEncoder),
    Ordinal(OrdinalEncoder),
    SelectFeatures(FeatureSelector),
    Scaler(Scaler),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::CategoricalImputer(s) => s.name(),
            Step::MissingIndicator(s) => s.name(),
            Step::NumericalImputer(s) => s.name(),
            Step::ElapsedYears(s) => s.name(),
            Step::LogTransform(s) => s.name(),
            Step::FirstLetter(s) => s.name(),
            Step::RareLabel(s) => s.name(),
            Step::OneHot(s) => s.name(),
            Step::Ordinal(s) => s.name(),
            Step::SelectFeatures(s) => s.name(),
            Step::Scaler(s) => s.name(),
        }
    }

    pub fn learn(&self, table: &Table, target: &[f64]) -> Result<LearnedParams> {
        let params = match self {
            Step::CategoricalImputer(s) => s.learn(table, target).map(|_| LearnedParams::Stateless)?,
            Step::MissingIndicator(s) => s.learn(table, target).map(|_| LearnedParams::Stateless)?,
            Step::ElapsedYears(s) => s.learn(table, target).map(|_| LearnedParams::Stateless)?,
            Step::LogTransform(s) => s.learn(table, target).map(|_| LearnedParams::Stateless)?,
            Step::FirstLetter(s) => s.learn(table, target).map(|_| LearnedParams::Stateless)?,
            Step::SelectFeatures(s) => s.learn(table, target).map(|_| LearnedParams::Stateless)?,
            Step::NumericalImputer(s) => LearnedParams::Imputation(s.learn(table, target)?),
            Step::RareLabel(s) => LearnedParams::FrequentLabels(s.learn(table, target)?),
            Step::OneHot(s) => LearnedParams::OneHot(s.learn(table, target)?),
            Step::Ordinal(s) => LearnedParams::Ordinal(s.learn(table, target)?),
            Step::Scaler(s) => LearnedParams::Scaling(s.learn(table, target)?),
        };
        Ok(params)
    }

    pub fn apply(&self, table: &Table, params: &LearnedParams) -> Result<Table> {
        match (self, params) {
            (Step::CategoricalImputer(s), _) => s.apply(table, &()),
            (Step::MissingIndicator(s), _) => s.apply(table, &()),
            (Step::ElapsedYears(s), _) => s.apply(table, &()),
            (Step::LogTransform(s), _) => s.apply(table, &()),
            (Step::FirstLetter(s), _) => s.apply(table, &()),
            (Step::SelectFeatures(s), _) => s.apply(table, &()),
            (Step::NumericalImputer(s), LearnedParams::Imputation(p)) => s.apply(table, p),
            (Step::RareLabel(s), LearnedParams::FrequentLabels(p)) => s.apply(table, p),
            (Step::OneHot(s), LearnedParams::OneHot(p)) => s.apply(table, p),
            (Step::Ordinal(s), LearnedParams::Ordinal(p)) => s.apply(table, p),
            (Step::Scaler(s), LearnedParams::Scaling(p)) => s.apply(table, p),
            (step, _) => Err(PipelineError::unfitted(step.name(), "*")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;

    #[test]
    fn test_stateful_step_without_params_is_unfitted() {
        let step = Step::NumericalImputer(NumericalImputer {
            variables: vec!["age".to_string()],
        });
        let table = Table::new(vec![Column::numeric("age", vec![None])]).unwrap();
        assert!(matches!(
            step.apply(&table, &LearnedParams::Stateless),
            Err(PipelineError::UnfittedStep { .. })
        ));
    }

    #[test]
    fn test_learn_wraps_step_params() {
        let step = Step::RareLabel(RareLabelEncoder::new(vec!["sex".to_string()]));
        let table = Table::new(vec![Column::from_labels("sex", &[Some("male"), Some("female")])]).unwrap();
        let params = step.learn(&table, &[]).unwrap();
        assert!(matches!(params, LearnedParams::FrequentLabels(_)));

        let stateless = Step::FirstLetter(FirstLetter {
            variables: vec!["sex".to_string()],
        });
        assert_eq!(stateless.learn(&table, &[]).unwrap(), LearnedParams::Stateless);
    }
}
