//! Объединение редких категорий в общую метку "Rare"

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::Transformer;
use crate::error::{PipelineError, Result};
use crate::types::{Column, Table};

pub const RARE_LABEL: &str = "Rare";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RareLabelEncoder {
    pub variables: Vec<String>,
    /// Минимальная доля строк, при которой метка считается частой
    pub tolerance: f64,
}

impl RareLabelEncoder {
    pub fn new(variables: Vec<String>) -> Self {
        Self {
            variables,
            tolerance: 0.05,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Transformer for RareLabelEncoder {
    type Params = BTreeMap<String, BTreeSet<String>>;

    fn name(&self) -> &'static str {
        "rare_label_encoder"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<Self::Params> {
        let n_rows = table.n_rows();
        if n_rows == 0 {
            return Err(PipelineError::Data("cannot learn label frequencies from an empty table".to_string()));
        }

        let mut frequent_labels = BTreeMap::new();
        for var in &self.variables {
            let values = table.require_categorical(self.name(), var)?;

            let mut counts: HashMap<&str, usize> = HashMap::new();
            for label in values.iter().flatten() {
                *counts.entry(label.as_str()).or_default() += 1;
            }

            // пропуски учитываются только в знаменателе
            let frequent: BTreeSet<String> = counts
                .into_iter()
                .filter(|(_, count)| *count as f64 / n_rows as f64 >= self.tolerance)
                .map(|(label, _)| label.to_string())
                .collect();

            if frequent.is_empty() {
                tracing::warn!(column = %var, tolerance = self.tolerance, "No frequent labels, every value maps to Rare");
            }
            frequent_labels.insert(var.clone(), frequent);
        }

        Ok(frequent_labels)
    }

    fn apply(&self, table: &Table, params: &Self::Params) -> Result<Table> {
        let mut out = table.clone();
        for var in &self.variables {
            let values = table.require_categorical(self.name(), var)?;
            let frequent = params
                .get(var)
                .ok_or_else(|| PipelineError::unfitted(self.name(), var))?;

            let grouped = values
                .iter()
                .map(|v| match v {
                    Some(label) if frequent.contains(label) => Some(label.clone()),
                    _ => Some(RARE_LABEL.to_string()),
                })
                .collect();
            out.replace_column(Column::categorical(var.clone(), grouped))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embarked(values: &[&str]) -> Table {
        let labels: Vec<Option<&str>> = values.iter().map(|v| Some(*v)).collect();
        Table::new(vec![Column::from_labels("embarked", &labels)]).unwrap()
    }

    fn labels(table: &Table) -> Vec<String> {
        table
            .column("embarked")
            .unwrap()
            .as_categorical()
            .unwrap()
            .iter()
            .map(|v| v.clone().unwrap())
            .collect()
    }

    #[test]
    fn test_collapses_infrequent_labels() {
        let encoder = RareLabelEncoder::new(vec!["embarked".to_string()]).with_tolerance(0.3);
        let params = encoder.learn(&embarked(&["S", "S", "S", "C", "Q"]), &[]).unwrap();
        assert_eq!(
            params["embarked"],
            BTreeSet::from(["S".to_string()])
        );

        let out = encoder.apply(&embarked(&["S", "C", "Q"]), &params).unwrap();
        assert_eq!(labels(&out), vec!["S", "Rare", "Rare"]);
    }

    #[test]
    fn test_zero_tolerance_keeps_every_label() {
        let encoder = RareLabelEncoder::new(vec!["embarked".to_string()]).with_tolerance(0.0);
        let train = embarked(&["S", "S", "S", "C", "Q"]);
        let params = encoder.learn(&train, &[]).unwrap();
        let out = encoder.apply(&train, &params).unwrap();
        assert!(!labels(&out).iter().any(|l| l == RARE_LABEL));
    }

    #[test]
    fn test_full_tolerance_keeps_only_unanimous_label() {
        let encoder = RareLabelEncoder::new(vec!["embarked".to_string()]).with_tolerance(1.0);

        let mixed = embarked(&["S", "S", "C"]);
        let params = encoder.learn(&mixed, &[]).unwrap();
        assert!(params["embarked"].is_empty());
        assert_eq!(labels(&encoder.apply(&mixed, &params).unwrap()), vec!["Rare"; 3]);

        let unanimous = embarked(&["S", "S", "S"]);
        let params = encoder.learn(&unanimous, &[]).unwrap();
        assert_eq!(labels(&encoder.apply(&unanimous, &params).unwrap()), vec!["S"; 3]);
    }

    #[test]
    fn test_missing_sentinel_is_an_ordinary_label() {
        let encoder = RareLabelEncoder::new(vec!["embarked".to_string()]).with_tolerance(0.4);
        let train = embarked(&["Missing", "Missing", "S", "S", "C"]);
        let params = encoder.learn(&train, &[]).unwrap();
        assert!(params["embarked"].contains("Missing"));
        assert!(!params["embarked"].contains("C"));
    }

    #[test]
    fn test_absent_values_become_rare() {
        let encoder = RareLabelEncoder::new(vec!["embarked".to_string()]);
        let train = embarked(&["S", "C"]);
        let params = encoder.learn(&train, &[]).unwrap();

        let batch = Table::new(vec![Column::from_labels("embarked", &[None, Some("S")])]).unwrap();
        let out = encoder.apply(&batch, &params).unwrap();
        assert_eq!(labels(&out), vec!["Rare", "S"]);
    }
}
