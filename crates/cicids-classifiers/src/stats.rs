//! Binary classification metrics and per-classifier summaries.
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::ModelError;
use crate::models::ClassifierKind;
use crate::pipeline::{EvaluationRecord, RecordOutcome};

/// 2x2 confusion matrix with benign (0) as the negative class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[i32], y_pred: &[i32]) -> Result<Self, ModelError> {
        if y_true.len() != y_pred.len() {
            return Err(ModelError::LengthMismatch {
                rows: y_pred.len(),
                labels: y_true.len(),
            });
        }

        let mut cm = ConfusionMatrix::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (0, 0) => cm.tn += 1,
                (0, 1) => cm.fp += 1,
                (1, 0) => cm.fn_ += 1,
                (1, 1) => cm.tp += 1,
                (0 | 1, other) | (other, _) => return Err(ModelError::InvalidLabel(other)),
            }
        }
        Ok(cm)
    }

    /// Rows are true classes, columns predicted: `[[tn, fp], [fn, tp]]`.
    pub fn as_array(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f_score: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassMetrics {
    fn new(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            precision,
            recall,
            f_score,
            support: tp + fn_,
        }
    }
}

/// Accuracy, per-class precision/recall/F1/support and the confusion matrix.
///
/// Any ratio with a zero denominator is reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    /// Indexed by class: `[benign, attack]`.
    pub per_class: [ClassMetrics; 2],
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn from_labels(y_true: &[i32], y_pred: &[i32]) -> Result<Self, ModelError> {
        let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
        Ok(ClassificationReport {
            accuracy: ratio(cm.tn + cm.tp, cm.total()),
            per_class: [
                ClassMetrics::new(cm.tn, cm.fn_, cm.fp),
                ClassMetrics::new(cm.tp, cm.fp, cm.fn_),
            ],
            confusion: cm,
        })
    }
}

/// Fraction of positions where the labels agree; 0 for empty input.
pub fn accuracy(y_true: &[i32], y_pred: &[i32]) -> f64 {
    let hits = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    ratio(hits, y_true.len().max(y_pred.len()))
}

/// Aggregate of one classifier's records across rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSummary {
    pub classifier: ClassifierKind,
    pub rounds_scored: usize,
    pub rounds_failed: usize,
    pub mean_accuracy: f64,
    pub std_accuracy: f64,
    pub mean_fit_secs: f64,
    pub mean_predict_secs: f64,
}

/// Summarise the records of each classifier in `order`.
pub fn summarize_records(records: &[EvaluationRecord], order: &[ClassifierKind]) -> Vec<ClassifierSummary> {
    order
        .iter()
        .map(|&kind| {
            let mut accuracies = Vec::new();
            let mut fit = Vec::new();
            let mut predict = Vec::new();
            let mut failed = 0;
            for record in records.iter().filter(|r| r.classifier == kind) {
                match &record.outcome {
                    RecordOutcome::Scored(s) => {
                        accuracies.push(s.report.accuracy);
                        fit.push(s.fit_secs);
                        predict.push(s.predict_secs);
                    }
                    RecordOutcome::Failed { .. } => failed += 1,
                }
            }

            let mean_or_zero = |v: &[f64]| if v.is_empty() { 0.0 } else { v.iter().mean() };
            let std_accuracy = if accuracies.len() > 1 {
                accuracies.iter().std_dev()
            } else {
                0.0
            };

            ClassifierSummary {
                classifier: kind,
                rounds_scored: accuracies.len(),
                rounds_failed: failed,
                mean_accuracy: mean_or_zero(accuracies.as_slice()),
                std_accuracy,
                mean_fit_secs: mean_or_zero(fit.as_slice()),
                mean_predict_secs: mean_or_zero(predict.as_slice()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_matches_hand_computed_values() {
        let y_true = [0, 0, 0, 1, 1, 1, 1, 0];
        let y_pred = [0, 0, 1, 1, 1, 0, 1, 0];
        let report = ClassificationReport::from_labels(&y_true, &y_pred).unwrap();

        assert_eq!(report.confusion.as_array(), [[3, 1], [1, 3]]);
        assert!((report.accuracy - 0.75).abs() < 1e-12);
        assert!((report.per_class[1].precision - 0.75).abs() < 1e-12);
        assert!((report.per_class[1].recall - 0.75).abs() < 1e-12);
        assert_eq!(report.per_class[0].support, 4);
        assert_eq!(report.per_class[1].support, 4);
    }

    #[test]
    fn zero_division_reports_zero() {
        let report = ClassificationReport::from_labels(&[0, 0], &[0, 0]).unwrap();
        assert_eq!(report.per_class[1].precision, 0.0);
        assert_eq!(report.per_class[1].recall, 0.0);
        assert_eq!(report.per_class[1].f_score, 0.0);
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn non_binary_labels_are_rejected() {
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 2], &[0, 1]),
            Err(ModelError::InvalidLabel(2))
        ));
        assert!(matches!(
            ConfusionMatrix::from_labels(&[0, 1], &[0, -1]),
            Err(ModelError::InvalidLabel(-1))
        ));
    }

    #[test]
    fn accuracy_of_empty_input_is_zero() {
        assert_eq!(accuracy(&[], &[]), 0.0);
        assert_eq!(accuracy(&[1, 0], &[1, 1]), 0.5);
    }
}
