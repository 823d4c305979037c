//! `Dataframe` module for typed, tagged tabular data.
//!
//! Provides a minimal column store used by the drift tests and fairness
//! metrics. Each column carries a [`FeatureType`] and an input/output flag;
//! each row carries a string tag (e.g. `"TRAINING"`).

use crate::error::{Result, TrustError};
use crate::model::{Feature, FeatureType, PredictionInput, PredictionOutput, Value};
use crate::primitives::Matrix;
use crate::stats;
use serde::{Deserialize, Serialize};

/// One named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Semantic type shared by every cell.
    pub column_type: FeatureType,
    /// True for model inputs, false for model outputs.
    pub is_input: bool,
    /// Cell values, one per row.
    pub values: Vec<Value>,
}

impl Column {
    /// Creates an input column.
    pub fn input(name: impl Into<String>, column_type: FeatureType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_input: true,
            values,
        }
    }

    /// Creates an output column.
    pub fn output(name: impl Into<String>, column_type: FeatureType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_input: false,
            values,
        }
    }

    /// Creates a numeric input column.
    pub fn numeric(name: impl Into<String>, values: &[f64]) -> Self {
        Self::input(
            name,
            FeatureType::Number,
            values.iter().map(|&v| Value::Number(v)).collect(),
        )
    }
}

/// A minimal typed `Dataframe`.
///
/// # Examples
///
/// ```
/// use trustkit::data::{Column, Dataframe};
///
/// let df = Dataframe::new(vec![
///     Column::numeric("x", &[1.0, 2.0, 3.0]),
///     Column::numeric("y", &[4.0, 5.0, 6.0]),
/// ])
/// .expect("columns have equal length");
/// assert_eq!(df.shape(), (3, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataframe {
    columns: Vec<Column>,
    tags: Vec<String>,
    n_rows: usize,
}

impl Dataframe {
    /// Creates a `Dataframe` from columns. All rows get an empty tag.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no columns, lengths differ, names are
    /// empty or duplicated, or a cell doesn't match its column type.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(TrustError::empty_input("Dataframe must have at least one column"));
        }

        let n_rows = columns[0].values.len();

        for col in &columns {
            if col.values.len() != n_rows {
                return Err(TrustError::dimension_mismatch(
                    "column length",
                    n_rows,
                    col.values.len(),
                ));
            }
            if col.name.is_empty() {
                return Err("Column names cannot be empty".into());
            }
            if let Some(bad) = col.values.iter().find(|v| !value_matches(col.column_type, v)) {
                return Err(TrustError::Other(format!(
                    "Value {bad} does not match type {} of column '{}'",
                    col.column_type, col.name
                )));
            }
        }

        let mut names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        for i in 1..names.len() {
            if names[i] == names[i - 1] {
                return Err(TrustError::ColumnMismatch(format!(
                    "Duplicate column name '{}'",
                    names[i]
                )));
            }
        }

        Ok(Self {
            columns,
            tags: vec![String::new(); n_rows],
            n_rows,
        })
    }

    /// Creates an all-numeric input `Dataframe` from a matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of names doesn't match the columns.
    pub fn from_matrix(names: &[&str], data: &Matrix<f64>) -> Result<Self> {
        if names.len() != data.n_cols() {
            return Err(TrustError::dimension_mismatch(
                "column names",
                data.n_cols(),
                names.len(),
            ));
        }
        let columns = names
            .iter()
            .enumerate()
            .map(|(j, name)| Column::numeric(*name, data.column(j).as_slice()))
            .collect();
        Self::new(columns)
    }

    /// Builds a `Dataframe` with one input column per feature and one output
    /// column per model output.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch is empty or the schemas differ between rows.
    pub fn from_predictions(
        inputs: &[PredictionInput],
        outputs: &[PredictionOutput],
    ) -> Result<Self> {
        if inputs.is_empty() {
            return Err(TrustError::empty_input("predictions"));
        }
        if inputs.len() != outputs.len() {
            return Err(TrustError::dimension_mismatch(
                "outputs",
                inputs.len(),
                outputs.len(),
            ));
        }

        let mut columns: Vec<Column> = inputs[0]
            .features()
            .iter()
            .map(|f| Column::input(f.name.clone(), f.feature_type, Vec::with_capacity(inputs.len())))
            .collect();
        let n_inputs = columns.len();
        columns.extend(outputs[0].outputs().iter().map(|o| {
            Column::output(o.name.clone(), o.output_type, Vec::with_capacity(inputs.len()))
        }));

        for (input, output) in inputs.iter().zip(outputs) {
            if input.len() != n_inputs || output.outputs().len() != columns.len() - n_inputs {
                return Err(TrustError::ColumnMismatch(
                    "all predictions must share one schema".to_string(),
                ));
            }
            for (col, f) in columns.iter_mut().zip(input.features()) {
                col.values.push(f.value.clone());
            }
            for (col, o) in columns[n_inputs..].iter_mut().zip(output.outputs()) {
                col.values.push(o.value.clone());
            }
        }

        Self::new(columns)
    }

    /// Replaces the row tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of tags doesn't match the rows.
    pub fn with_tags(mut self, tags: Vec<String>) -> Result<Self> {
        if tags.len() != self.n_rows {
            return Err(TrustError::dimension_mismatch("tags", self.n_rows, tags.len()));
        }
        self.tags = tags;
        Ok(self)
    }

    /// Returns the shape as (`n_rows`, `n_cols`).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the column types.
    #[must_use]
    pub fn column_types(&self) -> Vec<FeatureType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    /// Row tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Indices of `Number` columns.
    #[must_use]
    pub fn numeric_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.column_type == FeatureType::Number)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of input columns.
    #[must_use]
    pub fn input_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_input)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of output columns.
    #[must_use]
    pub fn output_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_input)
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns a column by index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn column(&self, idx: usize) -> Result<&Column> {
        self.columns
            .get(idx)
            .ok_or_else(|| TrustError::ColumnMismatch(format!("Column index {idx} out of bounds")))
    }

    /// Returns the index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Numeric encoding of a column.
    ///
    /// # Errors
    ///
    /// Returns `NonNumericFeature` for categorical or text columns.
    pub fn column_as_f64(&self, idx: usize) -> Result<Vec<f64>> {
        let col = self.column(idx)?;
        if !col.column_type.is_numeric() {
            return Err(TrustError::NonNumericFeature {
                name: col.name.clone(),
                feature_type: col.column_type.to_string(),
            });
        }
        col.values
            .iter()
            .map(|v| {
                v.as_number().ok_or_else(|| TrustError::NonNumericFeature {
                    name: col.name.clone(),
                    feature_type: col.column_type.to_string(),
                })
            })
            .collect()
    }

    /// Returns a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn row(&self, idx: usize) -> Result<Vec<Value>> {
        if idx >= self.n_rows {
            return Err(TrustError::Other(format!("Row index {idx} out of bounds")));
        }
        Ok(self.columns.iter().map(|c| c.values[idx].clone()).collect())
    }

    /// Returns the value at (row, col).
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of bounds.
    pub fn value(&self, row: usize, col: usize) -> Result<&Value> {
        self.column(col)?
            .values
            .get(row)
            .ok_or_else(|| TrustError::Other(format!("Row index {row} out of bounds")))
    }

    /// Keeps the rows whose full value list satisfies `predicate`.
    #[must_use]
    pub fn filter_rows<P>(&self, predicate: P) -> Self
    where
        P: Fn(&[Value]) -> bool,
    {
        let keep: Vec<usize> = (0..self.n_rows)
            .filter(|&r| {
                let row: Vec<Value> = self.columns.iter().map(|c| c.values[r].clone()).collect();
                predicate(&row)
            })
            .collect();
        self.take_rows(&keep)
    }

    /// Keeps the rows whose input values satisfy `predicate`.
    #[must_use]
    pub fn filter_rows_by_inputs<P>(&self, predicate: P) -> Self
    where
        P: Fn(&[Value]) -> bool,
    {
        self.filter_by_subset(&self.input_columns(), predicate)
    }

    /// Keeps the rows whose output values satisfy `predicate`.
    #[must_use]
    pub fn filter_rows_by_outputs<P>(&self, predicate: P) -> Self
    where
        P: Fn(&[Value]) -> bool,
    {
        self.filter_by_subset(&self.output_columns(), predicate)
    }

    /// Keeps the rows tagged `tag`.
    #[must_use]
    pub fn filter_rows_by_tag_equals(&self, tag: &str) -> Self {
        let keep: Vec<usize> = (0..self.n_rows).filter(|&r| self.tags[r] == tag).collect();
        self.take_rows(&keep)
    }

    /// Keeps only the `Number` columns.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` if there are none.
    pub fn select_numeric(&self) -> Result<Self> {
        let columns: Vec<Column> = self
            .numeric_columns()
            .into_iter()
            .map(|i| self.columns[i].clone())
            .collect();
        if columns.is_empty() {
            return Err(TrustError::empty_input("no numeric columns"));
        }
        Ok(Self {
            columns,
            tags: self.tags.clone(),
            n_rows: self.n_rows,
        })
    }

    /// The last `n` rows (all rows if fewer).
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let start = self.n_rows.saturating_sub(n);
        let keep: Vec<usize> = (start..self.n_rows).collect();
        self.take_rows(&keep)
    }

    /// Sample standard deviation of every numeric-encodable column, `None` for the rest.
    #[must_use]
    pub fn std(&self) -> Vec<Option<f64>> {
        (0..self.columns.len())
            .map(|j| self.column_as_f64(j).ok().map(|v| stats::sample_std(&v)))
            .collect()
    }

    /// Converts to a row-major matrix.
    ///
    /// # Errors
    ///
    /// Returns `NonNumericFeature` if any column is categorical or text.
    pub fn to_matrix(&self) -> Result<Matrix<f64>> {
        let cols = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, _)| self.column_as_f64(j))
            .collect::<Result<Vec<_>>>()?;

        let mut data = Vec::with_capacity(self.n_rows * cols.len());
        for r in 0..self.n_rows {
            for col in &cols {
                data.push(col[r]);
            }
        }
        Ok(Matrix::from_vec(self.n_rows, cols.len(), data)?)
    }

    /// One `PredictionInput` per row, built from the input columns.
    #[must_use]
    pub fn as_prediction_inputs(&self) -> Vec<PredictionInput> {
        let inputs = self.input_columns();
        (0..self.n_rows)
            .map(|r| {
                PredictionInput::new(
                    inputs
                        .iter()
                        .map(|&j| {
                            let col = &self.columns[j];
                            Feature {
                                name: col.name.clone(),
                                feature_type: col.column_type,
                                value: col.values[r].clone(),
                            }
                        })
                        .collect(),
                )
            })
            .collect()
    }

    /// Adds a new column to the `Dataframe`.
    ///
    /// # Errors
    ///
    /// Returns an error if the column length doesn't match or the name exists.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if column.values.len() != self.n_rows {
            return Err(TrustError::dimension_mismatch(
                "column length",
                self.n_rows,
                column.values.len(),
            ));
        }
        if self.column_index(&column.name).is_some() {
            return Err(TrustError::ColumnMismatch(format!(
                "Column name '{}' already exists",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    fn filter_by_subset<P>(&self, subset: &[usize], predicate: P) -> Self
    where
        P: Fn(&[Value]) -> bool,
    {
        let keep: Vec<usize> = (0..self.n_rows)
            .filter(|&r| {
                let row: Vec<Value> = subset
                    .iter()
                    .map(|&j| self.columns[j].values[r].clone())
                    .collect();
                predicate(&row)
            })
            .collect();
        self.take_rows(&keep)
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                column_type: c.column_type,
                is_input: c.is_input,
                values: rows.iter().map(|&r| c.values[r].clone()).collect(),
            })
            .collect();
        Self {
            columns,
            tags: rows.iter().map(|&r| self.tags[r].clone()).collect(),
            n_rows: rows.len(),
        }
    }
}

fn value_matches(column_type: FeatureType, value: &Value) -> bool {
    match column_type {
        FeatureType::Number => matches!(value, Value::Number(_)),
        FeatureType::Boolean => matches!(value, Value::Boolean(_)),
        FeatureType::Categorical | FeatureType::Text => matches!(value, Value::Text(_)),
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
