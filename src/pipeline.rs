//! Пайплайн признаков: шаги предобработки и модель поверх них

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::{EncodingStrategy, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::models::{evaluate, fit_estimator, Evaluation, LinearModel};
use crate::params::ParameterStore;
use crate::preprocessing::{
    CategoricalImputer, ElapsedYears, FeatureSelector, FirstLetter, LogTransform, MissingIndicator,
    NumericalImputer, OneHotEncoder, OrdinalEncoder, RareLabelEncoder, Scaler, Step,
};
use crate::types::Table;

/// Всё, что выучено на обучающей выборке
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    /// Отпечаток конфигурации, под которой выполнено обучение
    pub fingerprint: String,
    pub steps: Vec<Step>,
    pub params: ParameterStore,
    pub feature_names: Vec<String>,
    pub model: LinearModel,
}

impl FittedPipeline {
    fn transform_table(&self, table: &Table) -> Result<Table> {
        let mut current = table.clone();
        for step in &self.steps {
            let params = self
                .params
                .get(step.name())
                .ok_or_else(|| PipelineError::unfitted(step.name(), "*"))?;
            current = step.apply(&current, params)?;
            tracing::debug!(step = step.name(), columns = current.n_cols(), "Step applied");
        }
        // Колонки обучения в порядке обучения, лишние отбрасываются
        current.select_columns("pipeline", &self.feature_names)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PipelineState {
    Unfitted,
    Fitted(Box<FittedPipeline>),
}

/// Шаги в фиксированном порядке; шаги с пустой группой переменных пропускаются
pub fn build_steps(config: &PipelineConfig) -> Vec<Step> {
    let mut steps = Vec::new();

    if !config.categorical_to_impute.is_empty() {
        steps.push(Step::CategoricalImputer(
            CategoricalImputer::new(config.categorical_to_impute.clone())
                .with_replacement(config.missing_label.clone()),
        ));
    }
    if !config.missing_indicator.is_empty() {
        steps.push(Step::MissingIndicator(MissingIndicator {
            variables: config.missing_indicator.clone(),
        }));
    }
    if !config.numerical_to_impute.is_empty() {
        steps.push(Step::NumericalImputer(NumericalImputer {
            variables: config.numerical_to_impute.clone(),
        }));
    }
    if let Some(year) = &config.year_variable {
        steps.push(Step::ElapsedYears(ElapsedYears {
            column: year.column.clone(),
            reference: year.reference.clone(),
        }));
    }
    if !config.numerical_log.is_empty() {
        steps.push(Step::LogTransform(LogTransform {
            variables: config.numerical_log.clone(),
        }));
    }
    if !config.first_letter.is_empty() {
        steps.push(Step::FirstLetter(FirstLetter {
            variables: config.first_letter.clone(),
        }));
    }
    if !config.categorical_encode.is_empty() {
        steps.push(Step::RareLabel(
            RareLabelEncoder::new(config.categorical_encode.clone())
                .with_tolerance(config.rare_tolerance),
        ));
        steps.push(match config.encoding {
            EncodingStrategy::OneHot => Step::OneHot(OneHotEncoder {
                variables: config.categorical_encode.clone(),
            }),
            EncodingStrategy::Ordinal => Step::Ordinal(OrdinalEncoder {
                variables: config.categorical_encode.clone(),
                unseen: config.unseen_policy,
            }),
        });
    }
    if let Some(features) = &config.features {
        steps.push(Step::SelectFeatures(FeatureSelector {
            features: features.clone(),
        }));
    }
    steps.push(Step::Scaler(Scaler::new(config.scaler)));

    steps
}

#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
    state: PipelineState,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: PipelineState::Unfitted,
        })
    }

    /// Восстанавливает обученный пайплайн; отпечаток должен совпадать с конфигурацией
    pub fn from_fitted(config: PipelineConfig, fitted: FittedPipeline) -> Result<Self> {
        config.validate()?;
        let expected = config.fingerprint()?;
        if fitted.fingerprint != expected {
            return Err(PipelineError::FingerprintMismatch {
                expected,
                found: fitted.fingerprint,
            });
        }
        Ok(Self {
            config,
            state: PipelineState::Fitted(Box::new(fitted)),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, PipelineState::Fitted(_))
    }

    pub fn fitted(&self) -> Result<&FittedPipeline> {
        match &self.state {
            PipelineState::Fitted(fitted) => Ok(fitted),
            PipelineState::Unfitted => Err(PipelineError::NotFitted),
        }
    }

    /// Целевая переменная и отброшенные колонки не попадают в шаги
    fn model_inputs(&self, table: &Table) -> Table {
        let mut features = table.clone();
        features.remove_column(&self.config.target);
        for name in &self.config.drop_columns {
            features.remove_column(name);
        }
        features
    }

    /// Обучает все шаги и модель. При ошибке состояние не меняется.
    pub fn fit(&mut self, table: &Table, target: &Array1<f64>) -> Result<()> {
        let fitted = self.learn(table, target)?;
        tracing::info!(
            rows = table.n_rows(),
            features = fitted.feature_names.len(),
            steps = fitted.steps.len(),
            "Pipeline fitted"
        );
        self.state = PipelineState::Fitted(Box::new(fitted));
        Ok(())
    }

    fn learn(&self, table: &Table, target: &Array1<f64>) -> Result<FittedPipeline> {
        if table.n_rows() != target.len() {
            return Err(PipelineError::Data(format!(
                "target has {} values, table has {} rows",
                target.len(),
                table.n_rows()
            )));
        }

        let y = target.to_vec();
        let steps = build_steps(&self.config);
        let mut params = ParameterStore::new();
        let mut current = self.model_inputs(table);

        for step in &steps {
            let learned = step.learn(&current, &y)?;
            current = step.apply(&current, &learned)?;
            tracing::debug!(step = step.name(), columns = current.n_cols(), "Step learned");
            params.insert(step.name(), learned);
        }

        let X = current.to_matrix()?;
        let model = fit_estimator(&self.config.estimator, &X, target)?;

        Ok(FittedPipeline {
            fingerprint: self.config.fingerprint()?,
            steps,
            params,
            feature_names: current.column_names().into_iter().map(String::from).collect(),
            model,
        })
    }

    /// Таблица после всех шагов, с именами колонок
    pub fn transform_table(&self, table: &Table) -> Result<Table> {
        let fitted = self.fitted()?;
        fitted.transform_table(&self.model_inputs(table))
    }

    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        self.transform_table(table)?.to_matrix()
    }

    pub fn predict(&self, table: &Table) -> Result<Array1<f64>> {
        let X = self.transform(table)?;
        self.fitted()?.model.predict(&X)
    }

    /// Вероятность положительного класса (только классификация)
    pub fn predict_proba(&self, table: &Table) -> Result<Array1<f64>> {
        let X = self.transform(table)?;
        self.fitted()?.model.predict_proba(&X)
    }

    pub fn feature_names(&self) -> Result<&[String]> {
        Ok(&self.fitted()?.feature_names)
    }

    /// Метрики на отложенной выборке
    pub fn evaluate(&self, table: &Table, target: &Array1<f64>) -> Result<Evaluation> {
        let X = self.transform(table)?;
        evaluate(&self.fitted()?.model, &X, target)
    }
}
