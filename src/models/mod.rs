/// ML модели

pub mod evaluation;
pub mod linear;

pub use evaluation::{evaluate, Evaluation};
pub use linear::{fit_estimator, LassoRegression, LinearModel, LogisticRegression, RidgeRegression};
