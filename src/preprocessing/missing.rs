//! Обработка пропусков: индикаторы, импутация категорий и чисел

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::Transformer;
use crate::error::{PipelineError, Result};
use crate::types::{Column, Table};

/// Добавляет бинарную колонку `<column>_missing` для каждой переменной
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingIndicator {
    pub variables: Vec<String>,
}

impl Transformer for MissingIndicator {
    type Params = ();

    fn name(&self) -> &'static str {
        "missing_indicator"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<()> {
        for var in &self.variables {
            table.require(self.name(), var)?;
        }
        Ok(())
    }

    fn apply(&self, table: &Table, _params: &()) -> Result<Table> {
        let mut out = table.clone();
        for var in &self.variables {
            let column = table.require(self.name(), var)?;
            let flags = (0..column.len())
                .map(|i| Some(if column.data.is_missing(i) { 1.0 } else { 0.0 }))
                .collect();
            out.push_column(Column::numeric(format!("{}_missing", var), flags))?;
        }
        Ok(out)
    }
}

/// Заменяет пропуски в категориях фиксированной меткой
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalImputer {
    pub variables: Vec<String>,
    pub replacement: String,
}

impl CategoricalImputer {
    pub fn new(variables: Vec<String>) -> Self {
        Self {
            variables,
            replacement: "Missing".to_string(),
        }
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = replacement.into();
        self
    }
}

impl Transformer for CategoricalImputer {
    type Params = ();

    fn name(&self) -> &'static str {
        "categorical_imputer"
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
            let filled = values
                .iter()
                .map(|v| Some(v.clone().unwrap_or_else(|| self.replacement.clone())))
                .collect();
            out.replace_column(Column::categorical(var.clone(), filled))?;
        }
        Ok(out)
    }
}

/// Импутация числовых переменных модой обучающей выборки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericalImputer {
    pub variables: Vec<String>,
}

impl Transformer for NumericalImputer {
    type Params = BTreeMap<String, f64>;

    fn name(&self) -> &'static str {
        "numerical_imputer"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<Self::Params> {
        let mut replacements = BTreeMap::new();
        for var in &self.variables {
            let values = table.require_numeric(self.name(), var)?;
            let replacement = mode(values).ok_or_else(|| {
                PipelineError::Data(format!("column '{}' has no observed values", var))
            })?;
            tracing::debug!(column = %var, replacement, "Learned imputation value");
            replacements.insert(var.clone(), replacement);
        }
        Ok(replacements)
    }

    fn apply(&self, table: &Table, params: &Self::Params) -> Result<Table> {
        let mut out = table.clone();
        for var in &self.variables {
            let values = table.require_numeric(self.name(), var)?;
            let replacement = *params
                .get(var)
                .ok_or_else(|| PipelineError::unfitted(self.name(), var))?;
            let filled = values.iter().map(|v| Some(v.unwrap_or(replacement))).collect();
            out.replace_column(Column::numeric(var.clone(), filled))?;
        }
        Ok(out)
    }
}

/// Самое частое значение; при равенстве побеждает встреченное первым
fn mode(values: &[Option<f64>]) -> Option<f64> {
    // bits -> (количество, первая позиция)
    let mut counts: HashMap<u64, (usize, usize)> = HashMap::new();
    for (idx, value) in values.iter().enumerate() {
        if let Some(v) = value {
            let entry = counts.entry((v + 0.0).to_bits()).or_insert((0, idx));
            entry.0 += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(bits, _)| f64::from_bits(bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passengers() -> Table {
        Table::new(vec![
            Column::numeric("age", vec![Some(22.0), None, Some(38.0), Some(26.0)]),
            Column::from_labels("cabin", &[None, Some("C85"), None, Some("E46")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_mode_prefers_first_encountered_on_ties() {
        assert_eq!(mode(&[Some(22.0), None, Some(38.0), Some(26.0)]), Some(22.0));
        assert_eq!(mode(&[Some(3.0), Some(1.0), Some(1.0), Some(3.0)]), Some(3.0));
        assert_eq!(mode(&[Some(3.0), Some(1.0), Some(1.0)]), Some(1.0));
        assert_eq!(mode(&[None, None]), None);
    }

    #[test]
    fn test_numerical_imputer_uses_training_mode() {
        let imputer = NumericalImputer {
            variables: vec!["age".to_string()],
        };
        let params = imputer.learn(&passengers(), &[]).unwrap();
        assert_eq!(params["age"], 22.0);

        let batch = Table::new(vec![Column::numeric("age", vec![None, Some(40.0)])]).unwrap();
        let out = imputer.apply(&batch, &params).unwrap();
        assert_eq!(
            out.column("age").unwrap().as_numeric().unwrap(),
            &[Some(22.0), Some(40.0)]
        );
    }

    #[test]
    fn test_numerical_imputer_without_learned_entry() {
        let imputer = NumericalImputer {
            variables: vec!["age".to_string()],
        };
        let err = imputer.apply(&passengers(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, PipelineError::UnfittedStep { column, .. } if column == "age"));
    }

    #[test]
    fn test_numerical_imputer_rejects_empty_column() {
        let imputer = NumericalImputer {
            variables: vec!["age".to_string()],
        };
        let table = Table::new(vec![Column::numeric("age", vec![None, None])]).unwrap();
        assert!(matches!(imputer.learn(&table, &[]), Err(PipelineError::Data(_))));
    }

    #[test]
    fn test_missing_indicator_first_call() {
        let indicator = MissingIndicator {
            variables: vec!["age".to_string(), "cabin".to_string()],
        };
        let table = passengers();
        let out = indicator.apply(&table, &()).unwrap();

        assert_eq!(out.column_names(), vec!["age", "cabin", "age_missing", "cabin_missing"]);
        assert_eq!(
            out.column("age_missing").unwrap().as_numeric().unwrap(),
            &[Some(0.0), Some(1.0), Some(0.0), Some(0.0)]
        );
        assert_eq!(
            out.column("cabin_missing").unwrap().as_numeric().unwrap(),
            &[Some(1.0), Some(0.0), Some(1.0), Some(0.0)]
        );
        // исходные колонки не тронуты
        assert_eq!(out.column("age"), table.column("age"));

        // повторный вызов не идемпотентен
        assert!(matches!(
            indicator.apply(&out, &()),
            Err(PipelineError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_missing_indicator_unknown_column() {
        let indicator = MissingIndicator {
            variables: vec!["fare".to_string()],
        };
        assert!(matches!(
            indicator.apply(&passengers(), &()),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_categorical_imputer() {
        let imputer = CategoricalImputer::new(vec!["cabin".to_string()]);
        let out = imputer.apply(&passengers(), &()).unwrap();
        assert_eq!(
            out.column("cabin").unwrap().as_categorical().unwrap(),
            &[
                Some("Missing".to_string()),
                Some("C85".to_string()),
                Some("Missing".to_string()),
                Some("E46".to_string()),
            ]
        );
        assert_eq!(out.column("age"), passengers().column("age"));

        let custom = CategoricalImputer::new(vec!["cabin".to_string()]).with_replacement("NA");
        let out = custom.apply(&passengers(), &()).unwrap();
        assert_eq!(
            out.column("cabin").unwrap().as_categorical().unwrap()[0].as_deref(),
            Some("NA")
        );
    }

    #[test]
    fn test_categorical_imputer_rejects_numeric_column() {
        let imputer = CategoricalImputer::new(vec!["age".to_string()]);
        assert!(matches!(
            imputer.apply(&passengers(), &()),
            Err(PipelineError::TypeMismatch { .. })
        ));
    }
}
