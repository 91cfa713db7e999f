//! Табличные данные для пайплайна признаков

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Значения колонки; `None` - пропуск
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(values) => values[row].is_none(),
            ColumnData::Categorical(values) => values[row].is_none(),
        }
    }

    fn take_rows(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(indices.iter().map(|&i| values[i]).collect())
            }
            ColumnData::Categorical(values) => {
                ColumnData::Categorical(indices.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Categorical(values),
        }
    }

    /// Категориальная колонка из строковых литералов (удобно в тестах)
    pub fn from_labels(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        Self::categorical(
            name,
            values.iter().map(|v| v.map(str::to_string)).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Categorical(values) => Some(values),
            ColumnData::Numeric(_) => None,
        }
    }
}

/// Прямоугольная таблица: именованные колонки одинаковой длины
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::default();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub(crate) fn require(&self, step: &str, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| PipelineError::schema(step, name))
    }

    pub(crate) fn require_numeric(&self, step: &str, name: &str) -> Result<&[Option<f64>]> {
        self.require(step, name)?
            .as_numeric()
            .ok_or_else(|| PipelineError::TypeMismatch {
                column: name.to_string(),
                expected: "numeric",
            })
    }

    pub(crate) fn require_categorical(&self, step: &str, name: &str) -> Result<&[Option<String>]> {
        self.require(step, name)?
            .as_categorical()
            .ok_or_else(|| PipelineError::TypeMismatch {
                column: name.to_string(),
                expected: "categorical",
            })
    }

    fn check_len(&self, column: &Column) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(PipelineError::Data(format!(
                "column '{}' has {} rows, table has {}",
                column.name,
                column.len(),
                self.n_rows()
            )));
        }
        Ok(())
    }

    /// Добавляет колонку в конец таблицы
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(PipelineError::DuplicateColumn(column.name));
        }
        self.check_len(&column)?;
        self.columns.push(column);
        Ok(())
    }

    /// Заменяет колонку с тем же именем, сохраняя её позицию
    pub fn replace_column(&mut self, column: Column) -> Result<()> {
        self.check_len(&column)?;
        let idx = self.position(&column.name).ok_or_else(|| {
            PipelineError::Data(format!("column '{}' not found", column.name))
        })?;
        self.columns[idx] = column;
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        Some(self.columns.remove(idx))
    }

    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take_rows(indices),
                })
                .collect(),
        }
    }

    /// Оставляет только указанные колонки в указанном порядке
    pub fn select_columns(&self, step: &str, names: &[String]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|name| self.require(step, name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Table::new(columns)
    }

    /// Отделяет целевую переменную от признаков
    pub fn split_target(&self, target: &str) -> Result<(Table, Array1<f64>)> {
        let mut features = self.clone();
        let column = features
            .remove_column(target)
            .ok_or_else(|| PipelineError::schema("target", target))?;
        let values = column.as_numeric().ok_or_else(|| PipelineError::TypeMismatch {
            column: target.to_string(),
            expected: "numeric",
        })?;
        let y = values
            .iter()
            .map(|v| v.ok_or_else(|| PipelineError::MissingValue {
                column: target.to_string(),
            }))
            .collect::<Result<Array1<f64>>>()?;
        Ok((features, y))
    }

    /// Матрица признаков для модели: все колонки числовые, без пропусков
    pub fn to_matrix(&self) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((self.n_rows(), self.n_cols()));
        for (j, column) in self.columns.iter().enumerate() {
            let values = column.as_numeric().ok_or_else(|| PipelineError::TypeMismatch {
                column: column.name.clone(),
                expected: "numeric",
            })?;
            for (i, value) in values.iter().enumerate() {
                matrix[[i, j]] = value.ok_or_else(|| PipelineError::MissingValue {
                    column: column.name.clone(),
                })?;
            }
        }
        Ok(matrix)
    }
}
