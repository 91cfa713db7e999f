//! Оценка качества модели на отложенной выборке

#![allow(non_snake_case)]

use linfa::prelude::*;
use linfa::Dataset;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::LinearModel;
use crate::config::Task;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Evaluation {
    Regression { mse: f64, r2: f64 },
    Classification { accuracy: f32 },
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evaluation::Regression { mse, r2 } => write!(f, "MSE: {:.4}, R2: {:.4}", mse, r2),
            Evaluation::Classification { accuracy } => write!(f, "accuracy: {:.4}", accuracy),
        }
    }
}

fn metric_error(e: linfa::Error) -> PipelineError {
    PipelineError::Estimator(e.to_string())
}

pub fn evaluate(model: &LinearModel, X: &Array2<f64>, y: &Array1<f64>) -> Result<Evaluation> {
    let predictions = model.predict(X)?;

    match model.task {
        Task::Regression => {
            let truth = Dataset::new(X.clone(), y.clone());
            let mse = predictions.mean_squared_error(&truth).map_err(metric_error)?;
            let r2 = predictions.r2(&truth).map_err(metric_error)?;
            Ok(Evaluation::Regression { mse, r2 })
        }
        Task::Classification => {
            let labels: Array1<usize> = predictions.mapv(|p| p as usize);
            let truth = Dataset::new(X.clone(), y.mapv(|v| v as usize));
            let cm = labels.confusion_matrix(&truth).map_err(metric_error)?;
            Ok(Evaluation::Classification {
                accuracy: cm.accuracy(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let model = LinearModel {
            task: Task::Regression,
            weights: vec![2.0],
            intercept: 0.0,
        };
        let X = array![[1.0], [2.0], [3.0]];
        let y = array![2.0, 4.0, 6.0];

        match evaluate(&model, &X, &y).unwrap() {
            Evaluation::Regression { mse, r2 } => {
                assert!(mse.abs() < 1e-12);
                assert!((r2 - 1.0).abs() < 1e-12);
            }
            other => panic!("unexpected evaluation {:?}", other),
        }
    }

    #[test]
    fn test_classification_accuracy() {
        let model = LinearModel {
            task: Task::Classification,
            weights: vec![1.0],
            intercept: 0.0,
        };
        let X = array![[-1.0], [-2.0], [1.0], [2.0]];
        let y = array![0.0, 1.0, 1.0, 1.0];

        match evaluate(&model, &X, &y).unwrap() {
            Evaluation::Classification { accuracy } => assert!((accuracy - 0.75).abs() < 1e-6),
            other => panic!("unexpected evaluation {:?}", other),
        }
    }
}
