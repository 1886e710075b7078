//! Study parameter tables
//!
//! A study table has one column per study parameter and one row per
//! experiment run. [`align`] broadcasts a map of scalars and sequences into
//! a table; [`sweep`] multiplies a table by the values of one more column.
//! Both are pure.

pub mod stage;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{Error, Result};
use crate::core::scalar::Scalar;

pub use stage::{stage_table, ArtifactSink, DirectorySink, StagedArtifact};

/// One entry of a study input: a single value or one value per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudyValue {
    Sequence(Vec<Scalar>),
    Scalar(Scalar),
}

impl From<Scalar> for StudyValue {
    fn from(v: Scalar) -> Self {
        StudyValue::Scalar(v)
    }
}

impl From<Vec<Scalar>> for StudyValue {
    fn from(v: Vec<Scalar>) -> Self {
        StudyValue::Sequence(v)
    }
}

/// Column-oriented table, every column the same length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyTable {
    rows: usize,
    columns: BTreeMap<String, Vec<Scalar>>,
}

impl StudyTable {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &BTreeMap<String, Vec<Scalar>> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[Scalar]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Values of one run, in column-name order
    pub fn row(&self, idx: usize) -> Option<Vec<&Scalar>> {
        if idx >= self.rows {
            return None;
        }
        Some(self.columns.values().map(|col| &col[idx]).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Broadcast scalars against sequences
///
/// The row count is the length of the longest sequence, or 1 if there are
/// none. Every sequence must have exactly that length.
pub fn align(params: &BTreeMap<String, StudyValue>) -> Result<StudyTable> {
    let rows = params
        .values()
        .filter_map(|v| match v {
            StudyValue::Sequence(seq) => Some(seq.len()),
            StudyValue::Scalar(_) => None,
        })
        .max()
        .unwrap_or(1);

    let mut columns = BTreeMap::new();
    for (name, value) in params {
        let column = match value {
            StudyValue::Sequence(seq) if seq.len() == rows => seq.clone(),
            StudyValue::Sequence(seq) => {
                return Err(Error::AlignError {
                    column: name.clone(),
                    len: seq.len(),
                    expected: rows,
                })
            }
            StudyValue::Scalar(v) => vec![v.clone(); rows],
        };
        columns.insert(name.clone(), column);
    }

    Ok(StudyTable { rows, columns })
}

/// Repeat the table once per value, setting `name` to that value in each
/// block
///
/// Values vary slowest: the result holds `rows * values.len()` rows, the
/// first `rows` of them with `values[0]`. An existing column `name` is
/// overwritten.
pub fn sweep(table: &StudyTable, name: &str, values: &[Scalar]) -> StudyTable {
    let rows = table.rows * values.len();
    let mut columns: BTreeMap<String, Vec<Scalar>> = table
        .columns
        .iter()
        .filter(|(col, _)| col.as_str() != name)
        .map(|(col, data)| {
            let mut repeated = Vec::with_capacity(rows);
            for _ in values {
                repeated.extend(data.iter().cloned());
            }
            (col.clone(), repeated)
        })
        .collect();

    let swept = values
        .iter()
        .flat_map(|v| std::iter::repeat(v.clone()).take(table.rows))
        .collect();
    columns.insert(name.to_string(), swept);

    StudyTable { rows, columns }
}

/// Load a study input map from a YAML or JSON file
pub fn load_input(path: &Path) -> Result<BTreeMap<String, StudyValue>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let is_json = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn ints(values: &[i64]) -> Vec<Scalar> {
        values.iter().map(|v| Scalar::Int(*v)).collect()
    }

    fn input(pairs: Vec<(&str, StudyValue)>) -> BTreeMap<String, StudyValue> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_align_broadcasts_scalars() {
        let table = align(&input(vec![
            ("a", ints(&[1, 2, 3]).into()),
            ("b", Scalar::Int(5).into()),
        ]))
        .unwrap();
        assert_eq!(table.rows(), 3);
        assert_eq!(table.column("a").unwrap(), ints(&[1, 2, 3]).as_slice());
        assert_eq!(table.column("b").unwrap(), ints(&[5, 5, 5]).as_slice());
    }

    #[test]
    fn test_align_rejects_ragged_sequences() {
        let err = align(&input(vec![
            ("a", ints(&[1, 2]).into()),
            ("b", ints(&[1, 2, 3]).into()),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::AlignError { ref column, len: 2, expected: 3 } if column == "a"
        ));
    }

    #[test]
    fn test_align_scalars_only_is_one_row() {
        let table = align(&input(vec![("a", Scalar::from("x").into())])).unwrap();
        assert_eq!(table.rows(), 1);
        assert_eq!(table.row(0).unwrap(), vec![&Scalar::from("x")]);
        assert!(table.row(1).is_none());
    }

    #[test]
    fn test_sweep_adds_slow_column() {
        let table = align(&input(vec![("a", ints(&[1, 2]).into())])).unwrap();
        let swept = sweep(&table, "b", &ints(&[10, 20]));
        assert_eq!(swept.rows(), 4);
        assert_eq!(swept.column("a").unwrap(), ints(&[1, 2, 1, 2]).as_slice());
        assert_eq!(swept.column("b").unwrap(), ints(&[10, 10, 20, 20]).as_slice());
    }

    #[test]
    fn test_sweep_overwrites_existing_column() {
        let table = align(&input(vec![
            ("a", ints(&[1, 2]).into()),
            ("b", Scalar::Int(0).into()),
        ]))
        .unwrap();
        let swept = sweep(&table, "b", &ints(&[7]));
        assert_eq!(swept.rows(), 2);
        assert_eq!(swept.column("b").unwrap(), ints(&[7, 7]).as_slice());
    }

    #[test]
    fn test_sweep_with_no_values_is_empty() {
        let table = align(&input(vec![("a", ints(&[1, 2]).into())])).unwrap();
        let swept = sweep(&table, "b", &[]);
        assert_eq!(swept.rows(), 0);
        assert!(swept.column("a").unwrap().is_empty());
    }

    #[test]
    fn test_load_yaml_and_json_inputs() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("study.yaml");
        fs::write(&yaml, "LENGTH: [100, 150.5]\nNACA_Profile: \"0012\"\n").unwrap();
        let loaded = load_input(&yaml).unwrap();
        assert_eq!(
            loaded["LENGTH"],
            StudyValue::Sequence(vec![Scalar::Int(100), Scalar::Float(150.5)])
        );
        assert_eq!(loaded["NACA_Profile"], StudyValue::Scalar(Scalar::from("0012")));

        let json = dir.path().join("study.json");
        fs::write(&json, r#"{"SPAN": 800}"#).unwrap();
        let loaded = load_input(&json).unwrap();
        assert_eq!(loaded["SPAN"], StudyValue::Scalar(Scalar::Int(800)));
    }
}
