//! Параметры, выученные шагами на обучающей выборке

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Индикаторные колонки одной категориальной переменной
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotLevels {
    pub column: String,
    /// Уровни в порядке выходных колонок (первый уровень отброшен)
    pub levels: Vec<String>,
}

impl OneHotLevels {
    pub fn output_names(&self) -> impl Iterator<Item = String> + '_ {
        self.levels
            .iter()
            .map(move |level| format!("{}_{}", self.column, level))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalMapping {
    pub ranks: BTreeMap<String, usize>,
    /// Ранг для невиданных категорий
    pub fallback: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub center: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LearnedParams {
    /// Шаг без состояния
    Stateless,
    Imputation(BTreeMap<String, f64>),
    FrequentLabels(BTreeMap<String, BTreeSet<String>>),
    OneHot(Vec<OneHotLevels>),
    Ordinal(BTreeMap<String, OrdinalMapping>),
    Scaling(Vec<(String, ScaleParams)>),
}

/// Идентификатор шага -> его выученные параметры
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterStore {
    entries: BTreeMap<String, LearnedParams>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, step: impl Into<String>, params: LearnedParams) {
        self.entries.insert(step.into(), params);
    }

    pub fn get(&self, step: &str) -> Option<&LearnedParams> {
        self.entries.get(step)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_output_names() {
        let levels = OneHotLevels {
            column: "embarked".to_string(),
            levels: vec!["Q".to_string(), "S".to_string()],
        };
        let names: Vec<String> = levels.output_names().collect();
        assert_eq!(names, vec!["embarked_Q", "embarked_S"]);
    }

    #[test]
    fn test_store_overwrites_step_entry() {
        let mut store = ParameterStore::new();
        store.insert("numerical_imputer", LearnedParams::Imputation(BTreeMap::new()));
        store.insert("numerical_imputer", LearnedParams::Stateless);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("numerical_imputer"), Some(&LearnedParams::Stateless));
        assert!(store.get("scaler").is_none());
    }
}
