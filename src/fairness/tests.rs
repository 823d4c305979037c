pub(crate) use super::*;
use crate::data::Column;
use crate::model::{FeatureType, FnProvider, Output, PredictionInput, PredictionOutput};

const GROUPS: [&str; 8] = ["a", "a", "a", "a", "b", "b", "b", "b"];

fn inputs() -> Vec<Column> {
    vec![
        Column::input(
            "group",
            FeatureType::Categorical,
            GROUPS.iter().map(|&g| Value::from(g)).collect(),
        ),
        Column::numeric("x", &[1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
    ]
}

fn labelled(outcomes: &[bool]) -> Dataframe {
    let mut columns = inputs();
    columns.push(Column::output(
        "approved",
        FeatureType::Boolean,
        outcomes.iter().map(|&b| Value::from(b)).collect(),
    ));
    Dataframe::new(columns).expect("valid frame")
}

fn group_a() -> GroupSelector {
    GroupSelector::new(vec![0], vec![Value::from("a")]).expect("one column")
}

fn approved() -> Vec<Value> {
    vec![Value::from(true)]
}

/// approved = x > 0.5
fn threshold_model() -> FnProvider<impl Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync> {
    FnProvider::new(|batch: &[PredictionInput]| {
        batch
            .iter()
            .map(|input| {
                let x = input.features()[1].as_number()?;
                Ok(PredictionOutput::new(vec![Output::boolean("approved", x > 0.5)]))
            })
            .collect()
    })
}

#[test]
fn test_selector_validation() {
    assert!(GroupSelector::new(vec![], vec![]).is_err());
    assert!(matches!(
        GroupSelector::new(vec![0, 1], vec![Value::from("a")]),
        Err(TrustError::DimensionMismatch { .. })
    ));

    let selector = GroupSelector::new(vec![5], vec![Value::from(1.0)]).expect("shape ok");
    assert!(matches!(
        selector.split(&labelled(&[true; 8])),
        Err(TrustError::ColumnMismatch(_))
    ));
}

#[test]
fn test_selector_split() {
    let selector = GroupSelector::new(
        vec![0, 1],
        vec![Value::from("a"), Value::from(1.0)],
    )
    .expect("two columns");
    assert!(selector.matches(&[Value::from("a"), Value::from(1.0)]));
    assert!(!selector.matches(&[Value::from("a"), Value::from(0.0)]));
    assert!(!selector.matches(&[Value::from("a")]));

    let (privileged, unprivileged) = selector.split(&labelled(&[true; 8])).expect("input columns");
    assert_eq!(privileged.n_rows(), 3);
    assert_eq!(unprivileged.n_rows(), 5);
}

#[test]
fn test_statistical_parity_difference() {
    let df = labelled(&[true, true, true, false, true, false, false, false]);
    let (privileged, unprivileged) = group_a().split(&df).expect("input columns");
    let spd = statistical_parity_difference(&privileged, &unprivileged, &approved())
        .expect("non-empty groups");
    assert!((spd + 0.5).abs() < 1e-12);
}

#[test]
fn test_disparate_impact_ratio() {
    let df = labelled(&[true, true, true, false, true, false, false, false]);
    let (privileged, unprivileged) = group_a().split(&df).expect("input columns");
    let dir =
        disparate_impact_ratio(&privileged, &unprivileged, &approved()).expect("non-empty groups");
    assert!((dir - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_parity() {
    let df = labelled(&[true, false, true, false, false, true, false, true]);
    let (privileged, unprivileged) = group_a().split(&df).expect("input columns");
    assert_eq!(
        statistical_parity_difference(&privileged, &unprivileged, &approved()).expect("groups"),
        0.0
    );
    assert_eq!(
        disparate_impact_ratio(&privileged, &unprivileged, &approved()).expect("groups"),
        1.0
    );
}

#[test]
fn test_degenerate_groups() {
    let df = labelled(&[false, false, false, false, true, true, false, false]);
    let (privileged, unprivileged) = group_a().split(&df).expect("input columns");
    assert!(matches!(
        disparate_impact_ratio(&privileged, &unprivileged, &approved()),
        Err(TrustError::NumericalDegeneracy(_))
    ));

    let nobody = GroupSelector::new(vec![0], vec![Value::from("c")]).expect("one column");
    let (privileged, unprivileged) = nobody.split(&df).expect("input columns");
    assert!(matches!(
        statistical_parity_difference(&privileged, &unprivileged, &approved()),
        Err(TrustError::NumericalDegeneracy(_))
    ));
}

#[test]
fn test_model_driven_group_metrics() {
    // Outputs in the frame are ignored; the model decides
    let samples = labelled(&[false; 8]);
    let model = threshold_model();
    let spd = statistical_parity_difference_model(&samples, &model, &group_a(), &approved())
        .expect("model predicts");
    assert!((spd + 0.5).abs() < 1e-12);
    let dir = disparate_impact_ratio_model(&samples, &model, &group_a(), &approved())
        .expect("model predicts");
    assert!((dir - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_confusion_counts() {
    let predicted = labelled(&[true, true, false, false, true, false, false, false]);
    let truth = labelled(&[true, false, true, false, true, true, false, false]);
    let counts = ConfusionCounts::from_frames(&predicted, &truth, &approved()).expect("same rows");
    assert_eq!(
        counts,
        ConfusionCounts {
            tp: 2,
            tn: 3,
            fp: 1,
            fn_: 2
        }
    );
    assert!((counts.tpr() - 0.5).abs() < 1e-12);
    assert!((counts.fpr() - 0.25).abs() < 1e-12);

    let empty = ConfusionCounts::default();
    assert_eq!(empty.tpr(), 0.0);
    assert_eq!(empty.false_omission_rate(), 0.0);

    let short = labelled(&[true; 8]).tail(3);
    assert!(matches!(
        ConfusionCounts::from_frames(&predicted, &short, &approved()),
        Err(TrustError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_average_odds_difference() {
    // a: tp 1 fp 1 fn 1 tn 1; b: tp 1 fn 1 tn 2
    let predicted = labelled(&[true, true, false, false, true, false, false, false]);
    let truth = labelled(&[true, false, true, false, true, true, false, false]);
    let aod = average_odds_difference(&predicted, &truth, &group_a(), &approved())
        .expect("both groups present");
    assert!((aod + 0.25).abs() < 1e-12, "aod = {aod}");
}

#[test]
fn test_average_predictive_value_difference() {
    let predicted = labelled(&[true, true, false, false, true, false, false, false]);
    let truth = labelled(&[true, false, true, false, true, true, false, false]);
    let apvd = average_predictive_value_difference(&predicted, &truth, &group_a(), &approved())
        .expect("both groups present");
    assert!((apvd - 1.0 / 6.0).abs() < 1e-12, "apvd = {apvd}");
}

#[test]
fn test_model_driven_confusion_metrics() {
    // Model predicts [T, T, T, F | T, F, F, F]
    // a: tp 2 fp 1 tn 1; b: tp 1 fn 1 tn 2
    let truth = labelled(&[true, false, true, false, true, true, false, false]);
    let model = threshold_model();
    let aod = average_odds_difference_model(&truth, &model, &group_a(), &approved())
        .expect("model predicts");
    assert!((aod + 0.5).abs() < 1e-12, "aod = {aod}");
    let apvd = average_predictive_value_difference_model(&truth, &model, &group_a(), &approved())
        .expect("model predicts");
    assert!((apvd - 1.0 / 3.0).abs() < 1e-12, "apvd = {apvd}");
}

#[test]
fn test_model_output_count_checked() {
    let model = FnProvider::new(|_: &[PredictionInput]| Ok(Vec::new()));
    assert!(matches!(
        statistical_parity_difference_model(&labelled(&[true; 8]), &model, &group_a(), &approved()),
        Err(TrustError::Collaborator(_))
    ));
}
