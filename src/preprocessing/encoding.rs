//! Кодирование категорий в числа: one-hot и ранг по среднему целевой переменной

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::Transformer;
use crate::config::UnseenCategoryPolicy;
use crate::error::{PipelineError, Result};
use crate::params::{OneHotLevels, OrdinalMapping};
use crate::types::{Column, Table};

/// One-hot кодирование с отбрасыванием первого (лексикографически) уровня.
///
/// Набор выходных колонок фиксируется при обучении: отсутствующие в батче
/// уровни дают нулевые колонки, новые уровни колонок не создают.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub variables: Vec<String>,
}

impl Transformer for OneHotEncoder {
    type Params = Vec<OneHotLevels>;

    fn name(&self) -> &'static str {
        "one_hot_encoder"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<Self::Params> {
        self.variables
            .iter()
            .map(|var| {
                let values = table.require_categorical(self.name(), var)?;
                let observed: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
                let levels: Vec<String> = observed.into_iter().skip(1).map(str::to_string).collect();
                if levels.is_empty() {
                    tracing::warn!(column = %var, "Single level, no indicator columns produced");
                }
                Ok(OneHotLevels {
                    column: var.clone(),
                    levels,
                })
            })
            .collect()
    }

    fn apply(&self, table: &Table, params: &Self::Params) -> Result<Table> {
        let mut out = table.clone();
        let mut indicators = Vec::new();

        for var in &self.variables {
            let values = table.require_categorical(self.name(), var)?;
            let levels = params
                .iter()
                .find(|p| &p.column == var)
                .ok_or_else(|| PipelineError::unfitted(self.name(), var))?;

            for (level, name) in levels.levels.iter().zip(levels.output_names()) {
                let flags = values
                    .iter()
                    .map(|v| Some(if v.as_deref() == Some(level.as_str()) { 1.0 } else { 0.0 }))
                    .collect();
                indicators.push(Column::numeric(name, flags));
            }
            out.remove_column(var);
        }

        for column in indicators {
            out.push_column(column)?;
        }
        Ok(out)
    }
}

/// Замена категории рангом её среднего значения целевой переменной
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    pub variables: Vec<String>,
    pub unseen: UnseenCategoryPolicy,
}

impl Transformer for OrdinalEncoder {
    type Params = BTreeMap<String, OrdinalMapping>;

    fn name(&self) -> &'static str {
        "ordinal_encoder"
    }

    fn learn(&self, table: &Table, target: &[f64]) -> Result<Self::Params> {
        if target.len() != table.n_rows() {
            return Err(PipelineError::Data(format!(
                "target has {} values, table has {} rows",
                target.len(),
                table.n_rows()
            )));
        }
        if target.is_empty() {
            return Err(PipelineError::Data("cannot learn category ranks from an empty table".to_string()));
        }
        let global_mean = target.iter().sum::<f64>() / target.len() as f64;

        let mut mappings = BTreeMap::new();
        for var in &self.variables {
            let values = table.require_categorical(self.name(), var)?;

            // метка -> (сумма, количество)
            let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
            for (value, y) in values.iter().zip(target) {
                if let Some(label) = value {
                    let group = groups.entry(label.as_str()).or_insert((0.0, 0));
                    group.0 += y;
                    group.1 += 1;
                }
            }
            if groups.is_empty() {
                return Err(PipelineError::Data(format!("column '{}' has no observed labels", var)));
            }

            let mut means: Vec<(&str, f64)> = groups
                .into_iter()
                .map(|(label, (sum, count))| (label, sum / count as f64))
                .collect();
            // BTreeMap уже отсортирован по метке, стабильная сортировка сохраняет этот порядок при равных средних
            means.sort_by(|a, b| a.1.total_cmp(&b.1));

            let fallback = means
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    (a.1 - global_mean).abs().total_cmp(&(b.1 - global_mean).abs())
                })
                .map(|(rank, _)| rank)
                .unwrap_or(0);

            let ranks = means
                .iter()
                .enumerate()
                .map(|(rank, (label, _))| (label.to_string(), rank))
                .collect();

            mappings.insert(var.clone(), OrdinalMapping { ranks, fallback });
        }

        Ok(mappings)
    }

    fn apply(&self, table: &Table, params: &Self::Params) -> Result<Table> {
        let mut out = table.clone();
        for var in &self.variables {
            let values = table.require_categorical(self.name(), var)?;
            let mapping = params
                .get(var)
                .ok_or_else(|| PipelineError::unfitted(self.name(), var))?;

            let mut unseen = 0usize;
            let encoded = values
                .iter()
                .map(|v| {
                    match v.as_ref().and_then(|label| mapping.ranks.get(label)) {
                        Some(rank) => Ok(Some(*rank as f64)),
                        None => match self.unseen {
                            UnseenCategoryPolicy::Reject => Err(PipelineError::UnseenCategory {
                                column: var.clone(),
                                label: v.clone().unwrap_or_else(|| "<missing>".to_string()),
                            }),
                            UnseenCategoryPolicy::GlobalMeanRank => {
                                unseen += 1;
                                Ok(Some(mapping.fallback as f64))
                            }
                        },
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            if unseen > 0 {
                tracing::debug!(column = %var, unseen, "Unseen categories mapped to global mean rank");
            }
            out.replace_column(Column::numeric(var.clone(), encoded))?;
        }
        Ok(out)
    }
}
