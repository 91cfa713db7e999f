//! Линейные модели поверх матрицы признаков

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::{EstimatorConfig, Task};
use crate::error::{PipelineError, Result};

/// Выученные коэффициенты линейной модели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub task: Task,
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    pub fn decision_function(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if X.ncols() != self.weights.len() {
            return Err(PipelineError::Estimator(format!(
                "expected {} features, got {}",
                self.weights.len(),
                X.ncols()
            )));
        }
        let weights = Array1::from(self.weights.clone());
        Ok(X.dot(&weights) + self.intercept)
    }

    /// Вероятность положительного класса
    pub fn predict_proba(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if self.task != Task::Classification {
            return Err(PipelineError::Estimator("probabilities require a classifier".to_string()));
        }
        Ok(self.decision_function(X)?.mapv(sigmoid))
    }

    /// Регрессия: значение; классификация: метка 0/1
    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        match self.task {
            Task::Regression => self.decision_function(X),
            Task::Classification => Ok(self
                .predict_proba(X)?
                .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 })),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn check_shapes(X: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if X.nrows() == 0 || X.ncols() == 0 {
        return Err(PipelineError::Estimator("Empty dataset".to_string()));
    }
    if X.nrows() != y.len() {
        return Err(PipelineError::Estimator(format!(
            "{} rows but {} targets",
            X.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Ridge Regression: (Xc^T Xc + αI) w = Xc^T yc на центрированных данных
#[derive(Debug, Clone, Copy)]
pub struct RidgeRegression {
    pub alpha: f64,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn fit(&self, X: &Array2<f64>, y: &Array1<f64>) -> Result<LinearModel> {
        check_shapes(X, y)?;
        let n_features = X.ncols();

        let x_mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::Estimator("Failed to compute mean".to_string()))?;
        let y_mean = y.mean().unwrap_or(0.0);
        let Xc = X - &x_mean.view().insert_axis(Axis(0));
        let yc = y - y_mean;

        let mut xtx = Xc.t().dot(&Xc);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = Xc.t().dot(&yc);

        let weights = solve_linear_system(&xtx, &xty)?;
        let intercept = y_mean - x_mean.dot(&weights);

        Ok(LinearModel {
            task: Task::Regression,
            weights: weights.to_vec(),
            intercept,
        })
    }
}

/// Lasso: `1/(2n) * |y - Xw|^2 + alpha * |w|_1`, координатный спуск на центрированных данных
#[derive(Debug, Clone, Copy)]
pub struct LassoRegression {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-6,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    fn soft_threshold(value: f64, threshold: f64) -> f64 {
        if value > threshold {
            value - threshold
        } else if value < -threshold {
            value + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&self, X: &Array2<f64>, y: &Array1<f64>) -> Result<LinearModel> {
        check_shapes(X, y)?;
        let n_features = X.ncols();

        let x_mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::Estimator("Failed to compute mean".to_string()))?;
        let y_mean = y.mean().unwrap_or(0.0);
        let Xc = X - &x_mean.view().insert_axis(Axis(0));
        let yc = y - y_mean;

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| Xc.column(j).mapv(|v| v * v).sum())
            .collect();
        let threshold = self.alpha * X.nrows() as f64;

        let mut weights = Array1::<f64>::zeros(n_features);
        let mut residual = yc.clone();

        for iter in 0..self.max_iter {
            let mut max_change = 0.0_f64;

            for j in 0..n_features {
                // Константная колонка не несёт информации
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let old = weights[j];
                let rho = Xc.column(j).dot(&residual) + col_norms[j] * old;
                let new = Self::soft_threshold(rho, threshold) / col_norms[j];
                if new != old {
                    residual.scaled_add(old - new, &Xc.column(j));
                    weights[j] = new;
                    max_change = max_change.max((new - old).abs());
                }
            }

            if max_change < self.tol {
                tracing::debug!(iterations = iter, "Lasso converged");
                break;
            }
        }

        let zeroed = weights.iter().filter(|w| **w == 0.0).count();
        tracing::debug!(zeroed, features = n_features, "Lasso weights fitted");

        let intercept = y_mean - x_mean.dot(&weights);
        Ok(LinearModel {
            task: Task::Regression,
            weights: weights.to_vec(),
            intercept,
        })
    }
}

/// Метод Гаусса с выбором главного элемента
fn solve_linear_system(A: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = A.nrows();
    let mut augmented = Array2::<f64>::zeros((n, n + 1));
    augmented.slice_mut(ndarray::s![.., ..n]).assign(A);
    augmented.column_mut(n).assign(b);

    // Прямой ход
    for i in 0..n {
        let max_row = (i..n)
            .max_by(|&r1, &r2| augmented[[r1, i]].abs().total_cmp(&augmented[[r2, i]].abs()))
            .unwrap_or(i);

        if max_row != i {
            for j in 0..=n {
                augmented.swap([i, j], [max_row, j]);
            }
        }

        let pivot = augmented[[i, i]];
        if pivot.abs() < 1e-10 {
            return Err(PipelineError::Estimator("Singular matrix".to_string()));
        }

        for k in (i + 1)..n {
            let factor = augmented[[k, i]] / pivot;
            for j in i..=n {
                augmented[[k, j]] -= factor * augmented[[i, j]];
            }
        }
    }

    // Обратный ход
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = augmented[[i, n]];
        for j in (i + 1)..n {
            sum -= augmented[[i, j]] * x[j];
        }
        x[i] = sum / augmented[[i, i]];
    }

    Ok(x)
}

/// Логистическая регрессия с L2-регуляризацией, градиентный спуск.
///
/// `c` - обратная сила регуляризации, как в liblinear: минимизируется
/// `0.5 * |w|^2 + c * sum(logloss)`.
#[derive(Debug, Clone, Copy)]
pub struct LogisticRegression {
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub tol: f64,
}

impl LogisticRegression {
    pub fn new(c: f64) -> Self {
        Self {
            c,
            max_iter: 1000,
            learning_rate: 0.5,
            tol: 1e-8,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn fit(&self, X: &Array2<f64>, y: &Array1<f64>) -> Result<LinearModel> {
        check_shapes(X, y)?;
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(PipelineError::Data("classification target must be 0 or 1".to_string()));
        }

        let n_samples = X.nrows() as f64;
        // Целевая функция поделена на c * n: средний logloss + lambda/2 * |w|^2
        let lambda = 1.0 / (self.c * n_samples);
        // Шаг не больше 1/L, L - оценка константы Липшица градиента
        let lipschitz = 0.25 * X.mapv(|v| v * v).sum() / n_samples + lambda;
        let step = self.learning_rate.min(1.0 / lipschitz);

        let mut weights = Array1::<f64>::zeros(X.ncols());
        let mut bias = 0.0;

        for iter in 0..self.max_iter {
            let predictions = (X.dot(&weights) + bias).mapv(sigmoid);
            let errors = &predictions - y;

            let dw = X.t().dot(&errors) / n_samples + lambda * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                tracing::debug!(iterations = iter, "Logistic regression converged");
                break;
            }

            weights = weights - step * dw;
            bias -= step * db;
        }

        Ok(LinearModel {
            task: Task::Classification,
            weights: weights.to_vec(),
            intercept: bias,
        })
    }
}

/// Обучение модели, заданной в конфигурации
pub fn fit_estimator(config: &EstimatorConfig, X: &Array2<f64>, y: &Array1<f64>) -> Result<LinearModel> {
    match config {
        EstimatorConfig::Ridge { alpha } => RidgeRegression::new(*alpha).fit(X, y),
        EstimatorConfig::Lasso { alpha, max_iter } => LassoRegression::new(*alpha)
            .with_max_iter(*max_iter)
            .fit(X, y),
        EstimatorConfig::Logistic {
            c,
            max_iter,
            learning_rate,
        } => LogisticRegression::new(*c)
            .with_max_iter(*max_iter)
            .with_learning_rate(*learning_rate)
            .fit(X, y),
    }
}
