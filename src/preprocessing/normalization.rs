//! Нормализация данных

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::Transformer;
use crate::config::ScalerKind;
use crate::error::{PipelineError, Result};
use crate::params::ScaleParams;
use crate::types::{Column, Table};

/// Масштабирует все колонки таблицы: `(x - center) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub kind: ScalerKind,
}

impl Scaler {
    pub fn new(kind: ScalerKind) -> Self {
        Self { kind }
    }

    fn compute_params(&self, name: &str, values: &[Option<f64>]) -> ScaleParams {
        let observed: Array1<f64> = values.iter().flatten().copied().collect();
        if observed.is_empty() {
            return ScaleParams { center: 0.0, scale: 1.0 };
        }

        let (center, scale) = match self.kind {
            ScalerKind::Standard => {
                let mean = observed.mean().unwrap_or(0.0);
                (mean, observed.std(0.0))
            }
            ScalerKind::MinMax => {
                let min = observed.fold(f64::INFINITY, |a, &b| a.min(b));
                let max = observed.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                (min, max - min)
            }
        };

        // Избегаем деления на ноль
        let scale = if scale < 1e-10 {
            tracing::warn!(column = name, "Constant column, scaling skipped");
            1.0
        } else {
            scale
        };
        ScaleParams { center, scale }
    }
}

impl Transformer for Scaler {
    type Params = Vec<(String, ScaleParams)>;

    fn name(&self) -> &'static str {
        "scaler"
    }

    fn learn(&self, table: &Table, _target: &[f64]) -> Result<Self::Params> {
        if table.n_rows() == 0 {
            return Err(PipelineError::Data("Empty dataset".to_string()));
        }

        table
            .columns()
            .iter()
            .map(|column| {
                let values = table.require_numeric(self.name(), &column.name)?;
                Ok((column.name.clone(), self.compute_params(&column.name, values)))
            })
            .collect()
    }

    fn apply(&self, table: &Table, params: &Self::Params) -> Result<Table> {
        let mut out = table.clone();
        for (name, p) in params {
            let values = table.require_numeric(self.name(), name)?;
            let scaled = values
                .iter()
                .map(|v| v.map(|x| (x - p.center) / p.scale))
                .collect();
            out.replace_column(Column::numeric(name.clone(), scaled))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
            Column::numeric("constant", vec![Some(5.0); 5]),
        ])
        .unwrap()
    }

    fn column(table: &Table, name: &str) -> Vec<f64> {
        table
            .column(name)
            .unwrap()
            .as_numeric()
            .unwrap()
            .iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_standard_scaler() {
        let scaler = Scaler::new(ScalerKind::Standard);
        let params = scaler.learn(&table(), &[]).unwrap();
        let out = scaler.apply(&table(), &params).unwrap();

        let a = column(&out, "a");
        let mean: f64 = a.iter().sum::<f64>() / a.len() as f64;
        assert!(mean.abs() < 1e-10);
        assert!((a[4] - 2.0_f64.sqrt()).abs() < 1e-10);
        // константная колонка только сдвигается
        assert_eq!(column(&out, "constant"), vec![0.0; 5]);
    }

    #[test]
    fn test_minmax_scaler() {
        let scaler = Scaler::new(ScalerKind::MinMax);
        let params = scaler.learn(&table(), &[]).unwrap();
        let out = scaler.apply(&table(), &params).unwrap();

        assert_eq!(column(&out, "a"), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_scaler_reuses_training_statistics() {
        let scaler = Scaler::new(ScalerKind::MinMax);
        let params = scaler.learn(&table(), &[]).unwrap();

        let batch = Table::new(vec![
            Column::numeric("a", vec![Some(9.0)]),
            Column::numeric("constant", vec![Some(5.0)]),
        ])
        .unwrap();
        let out = scaler.apply(&batch, &params).unwrap();
        assert_eq!(column(&out, "a"), vec![2.0]);
    }

    #[test]
    fn test_scaler_rejects_categorical_columns() {
        let table = Table::new(vec![Column::from_labels("sex", &[Some("male")])]).unwrap();
        let scaler = Scaler::new(ScalerKind::Standard);
        assert!(matches!(
            scaler.learn(&table, &[]),
            Err(PipelineError::TypeMismatch { .. })
        ));
    }
}
