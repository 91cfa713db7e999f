//! Простые преобразования признаков без обучаемых параметров

use serde::{Deserialize, Serialize};

use super::Transformer;
use crate::error::{PipelineError, Result};
use crate::types::{Column, Table};

/// Оставляет первую букву строкового значения (например, палуба из номера каюты)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstLetter {
    pub variables: Vec<String>,
}

impl Transformer for FirstLetter {
    type Params = ();

    fn name(&self) -> &'static str {
        "first_letter"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<()> {
        for var in &self.variables {
            table.require_categorical(self.name(), var)?;
        }
        Ok(())
    }

    fn apply(&self, table: &Table, _params: &()) -> Result<Table> {
        let mut out = table.clone();
        for var in &self.variables {
            let values = table.require_categorical(self.name(), var)?;
            let letters = values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.chars().next()).map(String::from))
                .collect();
            out.replace_column(Column::categorical(var.clone(), letters))?;
        }
        Ok(out)
    }
}

/// Число лет между годом события и опорным годом: `reference - column`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElapsedYears {
    pub column: String,
    pub reference: String,
}

impl Transformer for ElapsedYears {
    type Params = ();

    fn name(&self) -> &'static str {
        "elapsed_years"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<()> {
        table.require_numeric(self.name(), &self.column)?;
        table.require_numeric(self.name(), &self.reference)?;
        Ok(())
    }

    fn apply(&self, table: &Table, _params: &()) -> Result<Table> {
        let years = table.require_numeric(self.name(), &self.column)?;
        let reference = table.require_numeric(self.name(), &self.reference)?;

        let elapsed = years
            .iter()
            .zip(reference)
            .map(|(year, reference)| match (year, reference) {
                (Some(year), Some(reference)) => Some(reference - year),
                _ => None,
            })
            .collect();

        let mut out = table.clone();
        out.replace_column(Column::numeric(self.column.clone(), elapsed))?;
        Ok(out)
    }
}

/// Натуральный логарифм для скошенных положительных переменных
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTransform {
    pub variables: Vec<String>,
}

impl Transformer for LogTransform {
    type Params = ();

    fn name(&self) -> &'static str {
        "log_transform"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<()> {
        for var in &self.variables {
            table.require_numeric(self.name(), var)?;
        }
        Ok(())
    }

    fn apply(&self, table: &Table, _params: &()) -> Result<Table> {
        let mut out = table.clone();
        for var in &self.variables {
            let values = table.require_numeric(self.name(), var)?;
            let logged = values
                .iter()
                .map(|v| match v {
                    Some(x) if *x <= 0.0 => Err(PipelineError::InvalidValue {
                        column: var.clone(),
                        value: *x,
                        reason: "logarithm requires positive values",
                    }),
                    Some(x) => Ok(Some(x.ln())),
                    None => Ok(None),
                })
                .collect::<Result<Vec<_>>>()?;
            out.replace_column(Column::numeric(var.clone(), logged))?;
        }
        Ok(out)
    }
}

/// Отбор итогового набора признаков в заданном порядке
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSelector {
    pub features: Vec<String>,
}

impl Transformer for FeatureSelector {
    type Params = ();

    fn name(&self) -> &'static str {
        "feature_selector"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<()> {
        for feature in &self.features {
            table.require(self.name(), feature)?;
        }
        Ok(())
    }

    fn apply(&self, table: &Table, _params: &()) -> Result<Table> {
        table.select_columns(self.name(), &self.features)
    }
}
