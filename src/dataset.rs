//! Загрузка CSV и разбиение на обучающую и тестовую выборки

use csv::ReaderBuilder;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::types::{Column, Table};

#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Значения, которые считаются пропуском
    pub na_values: Vec<String>,
    /// Колонки, которые всегда читаются как категориальные
    pub categorical: Vec<String>,
}

/// Пропуски как в pandas; "None" не входит: в House Prices это значение категории
pub const DEFAULT_NA_VALUES: &[&str] = &[
    "", "?", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "n/a", "nan", "null",
];

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            na_values: DEFAULT_NA_VALUES.iter().map(|s| s.to_string()).collect(),
            categorical: Vec::new(),
        }
    }
}

impl CsvOptions {
    pub fn with_categorical(mut self, columns: &[String]) -> Self {
        self.categorical.extend(columns.iter().cloned());
        self
    }
}

pub fn load_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Table> {
    let file = std::fs::File::open(path.as_ref())?;
    read_csv(file, options)
}

/// Читает CSV с заголовком; тип колонки выводится по значениям
pub fn read_csv<R: std::io::Read>(reader: R, options: &CsvOptions) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let na_values: HashSet<&str> = options.na_values.iter().map(String::as_str).collect();

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in rdr.records() {
        let record = record?;
        for (i, values) in raw.iter_mut().enumerate() {
            let value = record.get(i).unwrap_or("");
            values.push(if na_values.contains(value) {
                None
            } else {
                Some(value.to_string())
            });
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, values)| {
            if options.categorical.contains(&name) {
                return Column::categorical(name, values);
            }
            match parse_numeric(&values) {
                Some(numbers) => Column::numeric(name, numbers),
                None => Column::categorical(name, values),
            }
        })
        .collect();

    let table = Table::new(columns)?;
    tracing::debug!(rows = table.n_rows(), columns = table.n_cols(), "Loaded CSV");
    Ok(table)
}

fn parse_numeric(values: &[Option<String>]) -> Option<Vec<Option<f64>>> {
    values
        .iter()
        .map(|v| match v {
            // "inf" и "nan" парсятся, но значением не являются
            Some(s) => s.parse::<f64>().ok().map(|x| x.is_finite().then_some(x)),
            None => Some(None),
        })
        .collect()
}

/// Результат разбиения
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Table,
    pub x_test: Table,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Перемешивает строки с фиксированным seed и отделяет `ceil(test_size * n)` строк под тест
pub fn train_test_split(features: &Table, target: &Array1<f64>, test_size: f64, seed: u64) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let n = features.n_rows();
    if n != target.len() {
        return Err(PipelineError::Data(format!(
            "target has {} values, table has {} rows",
            target.len(),
            n
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::Data(format!(
            "cannot split {} rows with test_size {}",
            n, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(Split {
        x_train: features.select_rows(train_idx),
        x_test: features.select_rows(test_idx),
        y_train: train_idx.iter().map(|&i| target[i]).collect(),
        y_test: test_idx.iter().map(|&i| target[i]).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITANIC: &str = "\
pclass,survived,name,sex,age,fare,cabin
1,1,Allen,female,29,211.3375,B5
1,0,Allison,male,?,151.55,C22
3,0,Barton,male,26,8.05,?
";

    #[test]
    fn test_read_csv_infers_types() {
        let table = read_csv(TITANIC.as_bytes(), &CsvOptions::default()).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(
            table.column("age").unwrap().as_numeric().unwrap(),
            &[Some(29.0), None, Some(26.0)]
        );
        assert!(table.column("sex").unwrap().as_categorical().is_some());
        assert_eq!(
            table.column("cabin").unwrap().as_categorical().unwrap()[2],
            None
        );
    }

    #[test]
    fn test_read_csv_forced_categorical() {
        let options = CsvOptions::default().with_categorical(&["pclass".to_string()]);
        let table = read_csv(TITANIC.as_bytes(), &options).unwrap();
        assert_eq!(
            table.column("pclass").unwrap().as_categorical().unwrap()[0].as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_na_tokens_and_non_finite_values_are_missing() {
        let csv = "age,fare,cabin\n22,inf,B5\nnan,7.25,NULL\nN/A,-inf,None\n";
        let table = read_csv(csv.as_bytes(), &CsvOptions::default()).unwrap();

        assert_eq!(
            table.column("age").unwrap().as_numeric().unwrap(),
            &[Some(22.0), None, None]
        );
        assert_eq!(
            table.column("fare").unwrap().as_numeric().unwrap(),
            &[None, Some(7.25), None]
        );
        assert_eq!(
            table.column("cabin").unwrap().as_categorical().unwrap(),
            &[Some("B5".to_string()), None, Some("None".to_string())]
        );
    }

    fn numbered(n: usize) -> (Table, Array1<f64>) {
        let table = Table::new(vec![Column::numeric(
            "id",
            (0..n).map(|i| Some(i as f64)).collect(),
        )])
        .unwrap();
        let target = (0..n).map(|i| i as f64).collect();
        (table, target)
    }

    #[test]
    fn test_split_is_reproducible_and_disjoint() {
        let (table, target) = numbered(10);
        let first = train_test_split(&table, &target, 0.2, 0).unwrap();
        let second = train_test_split(&table, &target, 0.2, 0).unwrap();

        assert_eq!(first.x_test, second.x_test);
        assert_eq!(first.x_test.n_rows(), 2);
        assert_eq!(first.x_train.n_rows(), 8);

        // признаки и целевая переменная остаются выровненными
        let ids = first.x_train.column("id").unwrap().as_numeric().unwrap();
        for (id, y) in ids.iter().zip(first.y_train.iter()) {
            assert_eq!(id.unwrap(), *y);
        }

        let mut all: Vec<f64> = first.y_train.iter().chain(first.y_test.iter()).copied().collect();
        all.sort_by(f64::total_cmp);
        assert_eq!(all, (0..10).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_rejects_bad_proportion() {
        let (table, target) = numbered(10);
        assert!(train_test_split(&table, &target, 1.0, 0).is_err());
        assert!(train_test_split(&table, &target, 0.0, 0).is_err());
    }
}
