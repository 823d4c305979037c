//! Group fairness metrics.
//!
//! Rows are split into a privileged and an unprivileged group by matching
//! input values, and outcomes are compared between the groups:
//!
//! - SPD: `P(fav | unprivileged) - P(fav | privileged)`
//! - DIR: `P(fav | unprivileged) / P(fav | privileged)`
//! - AOD: `((TPR_u - TPR_p) + (FPR_u - FPR_p)) / 2`
//! - APVD: `((PPV_u - PPV_p) + (FOR_u - FOR_p)) / 2`
//!
//! An SPD near 0 and a DIR near 1 indicate parity.

use crate::data::Dataframe;
use crate::error::{Result, TrustError};
use crate::model::Value;
use crate::traits::PredictionProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Selects the privileged group by exact match on input columns.
///
/// `columns` index into the input columns of a [`Dataframe`] (in order), so
/// the same selector works on frames with or without output columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSelector {
    columns: Vec<usize>,
    values: Vec<Value>,
}

impl GroupSelector {
    /// Creates a selector matching `values` at input positions `columns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lists are empty or of different lengths.
    pub fn new(columns: Vec<usize>, values: Vec<Value>) -> Result<Self> {
        if columns.is_empty() {
            return Err(TrustError::empty_input("privilege columns"));
        }
        if columns.len() != values.len() {
            return Err(TrustError::dimension_mismatch(
                "privilege values",
                columns.len(),
                values.len(),
            ));
        }
        Ok(Self { columns, values })
    }

    /// Whether an input row belongs to the privileged group.
    #[must_use]
    pub fn matches(&self, inputs: &[Value]) -> bool {
        self.columns
            .iter()
            .zip(&self.values)
            .all(|(&j, v)| inputs.get(j) == Some(v))
    }

    /// Splits `df` into (privileged, unprivileged).
    ///
    /// # Errors
    ///
    /// Returns an error if a selector column is not an input column of `df`.
    pub fn split(&self, df: &Dataframe) -> Result<(Dataframe, Dataframe)> {
        let n_inputs = df.input_columns().len();
        if let Some(&j) = self.columns.iter().find(|&&j| j >= n_inputs) {
            return Err(TrustError::ColumnMismatch(format!(
                "privilege column {j} out of {n_inputs} input columns"
            )));
        }
        Ok((
            df.filter_rows_by_inputs(|row| self.matches(row)),
            df.filter_rows_by_inputs(|row| !self.matches(row)),
        ))
    }
}

/// Share of rows whose outputs equal `favorable`.
fn favorable_rate(group: &Dataframe, favorable: &[Value], which: &str) -> Result<f64> {
    if group.n_rows() == 0 {
        return Err(TrustError::NumericalDegeneracy(format!("{which} group is empty")));
    }
    let hits = group.filter_rows_by_outputs(|row| row == favorable).n_rows();
    Ok(hits as f64 / group.n_rows() as f64)
}

/// Statistical parity difference between two pre-split groups.
///
/// # Errors
///
/// Returns `NumericalDegeneracy` if either group is empty.
pub fn statistical_parity_difference(
    privileged: &Dataframe,
    unprivileged: &Dataframe,
    favorable: &[Value],
) -> Result<f64> {
    let p_priv = favorable_rate(privileged, favorable, "privileged")?;
    let p_unpriv = favorable_rate(unprivileged, favorable, "unprivileged")?;
    let spd = p_unpriv - p_priv;
    debug!(p_priv, p_unpriv, spd, "Statistical parity difference");
    Ok(spd)
}

/// Disparate impact ratio between two pre-split groups.
///
/// # Errors
///
/// Returns `NumericalDegeneracy` if either group is empty or no privileged
/// row has the favorable outcome.
pub fn disparate_impact_ratio(
    privileged: &Dataframe,
    unprivileged: &Dataframe,
    favorable: &[Value],
) -> Result<f64> {
    let p_priv = favorable_rate(privileged, favorable, "privileged")?;
    let p_unpriv = favorable_rate(unprivileged, favorable, "unprivileged")?;
    if p_priv == 0.0 {
        return Err(TrustError::NumericalDegeneracy(
            "no privileged row has the favorable outcome".to_string(),
        ));
    }
    let dir = p_unpriv / p_priv;
    debug!(p_priv, p_unpriv, dir, "Disparate impact ratio");
    Ok(dir)
}

/// Runs `model` over the inputs of `samples` and returns the
/// prediction-labelled frame.
fn predict_frame(samples: &Dataframe, model: &dyn PredictionProvider) -> Result<Dataframe> {
    let inputs = samples.as_prediction_inputs();
    let outputs = model.predict(&inputs)?;
    if outputs.len() != inputs.len() {
        return Err(TrustError::Collaborator(format!(
            "model returned {} outputs for {} inputs",
            outputs.len(),
            inputs.len()
        )));
    }
    Dataframe::from_predictions(&inputs, &outputs)
}

/// SPD of a model's predictions on `samples`.
///
/// # Errors
///
/// Returns the model's error, or the errors of [`statistical_parity_difference`].
pub fn statistical_parity_difference_model(
    samples: &Dataframe,
    model: &dyn PredictionProvider,
    selector: &GroupSelector,
    favorable: &[Value],
) -> Result<f64> {
    let predicted = predict_frame(samples, model)?;
    let (privileged, unprivileged) = selector.split(&predicted)?;
    statistical_parity_difference(&privileged, &unprivileged, favorable)
}

/// DIR of a model's predictions on `samples`.
///
/// # Errors
///
/// Returns the model's error, or the errors of [`disparate_impact_ratio`].
pub fn disparate_impact_ratio_model(
    samples: &Dataframe,
    model: &dyn PredictionProvider,
    selector: &GroupSelector,
    favorable: &[Value],
) -> Result<f64> {
    let predicted = predict_frame(samples, model)?;
    let (privileged, unprivileged) = selector.split(&predicted)?;
    disparate_impact_ratio(&privileged, &unprivileged, favorable)
}

/// Binary confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    /// Predicted positive, actually positive.
    pub tp: usize,
    /// Predicted negative, actually negative.
    pub tn: usize,
    /// Predicted positive, actually negative.
    pub fp: usize,
    /// Predicted negative, actually positive.
    pub fn_: usize,
}

impl ConfusionCounts {
    /// Counts outcomes of `predicted` against `truth`, row by row.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the frames have different row counts.
    pub fn from_frames(predicted: &Dataframe, truth: &Dataframe, positive: &[Value]) -> Result<Self> {
        if predicted.n_rows() != truth.n_rows() {
            return Err(TrustError::dimension_mismatch(
                "truth rows",
                predicted.n_rows(),
                truth.n_rows(),
            ));
        }
        let pred_rows = output_rows(predicted)?;
        let truth_rows = output_rows(truth)?;

        let mut counts = Self::default();
        for (p, t) in pred_rows.iter().zip(&truth_rows) {
            match (p.as_slice() == positive, t.as_slice() == positive) {
                (true, true) => counts.tp += 1,
                (true, false) => counts.fp += 1,
                (false, true) => counts.fn_ += 1,
                (false, false) => counts.tn += 1,
            }
        }
        Ok(counts)
    }

    /// True positive rate, 0 when there are no positives.
    #[must_use]
    pub fn tpr(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// False positive rate, 0 when there are no negatives.
    #[must_use]
    pub fn fpr(&self) -> f64 {
        ratio(self.fp, self.fp + self.tn)
    }

    /// Positive predictive value, 0 when nothing is predicted positive.
    #[must_use]
    pub fn ppv(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// False omission rate, 0 when nothing is predicted negative.
    #[must_use]
    pub fn false_omission_rate(&self) -> f64 {
        ratio(self.fn_, self.fn_ + self.tn)
    }

    fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn output_rows(df: &Dataframe) -> Result<Vec<Vec<Value>>> {
    let outputs = df.output_columns();
    if outputs.is_empty() {
        return Err(TrustError::ColumnMismatch("frame has no output columns".to_string()));
    }
    (0..df.n_rows())
        .map(|r| outputs.iter().map(|&j| df.value(r, j).cloned()).collect())
        .collect()
}

/// Confusion counts per group: (privileged, unprivileged).
fn group_counts(
    predicted: &Dataframe,
    truth: &Dataframe,
    selector: &GroupSelector,
    positive: &[Value],
) -> Result<(ConfusionCounts, ConfusionCounts)> {
    let (pred_p, pred_u) = selector.split(predicted)?;
    let (truth_p, truth_u) = selector.split(truth)?;
    let privileged = ConfusionCounts::from_frames(&pred_p, &truth_p, positive)?;
    let unprivileged = ConfusionCounts::from_frames(&pred_u, &truth_u, positive)?;
    if privileged.total() == 0 {
        return Err(TrustError::NumericalDegeneracy("privileged group is empty".to_string()));
    }
    if unprivileged.total() == 0 {
        return Err(TrustError::NumericalDegeneracy("unprivileged group is empty".to_string()));
    }
    Ok((privileged, unprivileged))
}

/// Average odds difference of `predicted` against `truth`.
///
/// Both frames hold the same rows in the same order; `predicted` carries the
/// model's outputs and `truth` the true labels.
///
/// # Errors
///
/// Returns `DimensionMismatch` for frames of different lengths, or
/// `NumericalDegeneracy` if a group is empty.
pub fn average_odds_difference(
    predicted: &Dataframe,
    truth: &Dataframe,
    selector: &GroupSelector,
    positive: &[Value],
) -> Result<f64> {
    let (p, u) = group_counts(predicted, truth, selector, positive)?;
    let aod = ((u.tpr() - p.tpr()) + (u.fpr() - p.fpr())) / 2.0;
    debug!(?p, ?u, aod, "Average odds difference");
    Ok(aod)
}

/// Average predictive value difference of `predicted` against `truth`.
///
/// # Errors
///
/// Same as [`average_odds_difference`].
pub fn average_predictive_value_difference(
    predicted: &Dataframe,
    truth: &Dataframe,
    selector: &GroupSelector,
    positive: &[Value],
) -> Result<f64> {
    let (p, u) = group_counts(predicted, truth, selector, positive)?;
    let apvd = ((u.ppv() - p.ppv()) + (u.false_omission_rate() - p.false_omission_rate())) / 2.0;
    debug!(?p, ?u, apvd, "Average predictive value difference");
    Ok(apvd)
}

/// AOD of a model's predictions against the labelled `truth`.
///
/// # Errors
///
/// Returns the model's error, or the errors of [`average_odds_difference`].
pub fn average_odds_difference_model(
    truth: &Dataframe,
    model: &dyn PredictionProvider,
    selector: &GroupSelector,
    positive: &[Value],
) -> Result<f64> {
    let predicted = predict_frame(truth, model)?;
    average_odds_difference(&predicted, truth, selector, positive)
}

/// APVD of a model's predictions against the labelled `truth`.
///
/// # Errors
///
/// Returns the model's error, or the errors of
/// [`average_predictive_value_difference`].
pub fn average_predictive_value_difference_model(
    truth: &Dataframe,
    model: &dyn PredictionProvider,
    selector: &GroupSelector,
    positive: &[Value],
) -> Result<f64> {
    let predicted = predict_frame(truth, model)?;
    average_predictive_value_difference(&predicted, truth, selector, positive)
}

#[cfg(test)]
mod tests;
