//! Classification metrics
//!
//! Per-class precision/recall/F1, weighted F1, accuracy and the confusion
//! matrix for the held-out evaluation, plus the weighted-F1 scorer used by
//! cross-validation.

use tabled::{Table, Tabled};

/// Metrics for a single class.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: usize,
}

/// Full held-out evaluation report.
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub class_names: Vec<String>,
    pub per_class: Vec<ClassMetrics>,
    /// confusion[true][predicted]
    pub confusion: Vec<Vec<usize>>,
    pub accuracy: f32,
    pub weighted_f1: f32,
}

/// Evaluate predictions against ground truth.
pub fn evaluate(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> EvalReport {
    let n = class_names.len();
    let confusion = confusion_matrix(y_true, y_pred, n);

    let mut per_class = Vec::with_capacity(n);
    for c in 0..n {
        per_class.push(class_metrics(&confusion, c));
    }

    let total: usize = per_class.iter().map(|m| m.support).sum();
    let correct: usize = (0..n).map(|c| confusion[c][c]).sum();

    let accuracy = ratio(correct, total);
    let weighted_f1 = if total == 0 {
        0.0
    } else {
        per_class.iter().map(|m| m.f1 * m.support as f32).sum::<f32>() / total as f32
    };

    EvalReport {
        class_names: class_names.to_vec(),
        per_class,
        confusion,
        accuracy,
        weighted_f1,
    }
}

/// Weighted F1 without the full report (cross-validation scoring).
pub fn weighted_f1(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> f32 {
    let confusion = confusion_matrix(y_true, y_pred, n_classes);
    let mut sum = 0.0f32;
    let mut total = 0usize;

    for c in 0..n_classes {
        let m = class_metrics(&confusion, c);
        sum += m.f1 * m.support as f32;
        total += m.support;
    }

    if total == 0 {
        0.0
    } else {
        sum / total as f32
    }
}

fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n: usize) -> Vec<Vec<usize>> {
    let mut confusion = vec![vec![0usize; n]; n];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n && p < n {
            confusion[t][p] += 1;
        }
    }
    confusion
}

fn class_metrics(confusion: &[Vec<usize>], c: usize) -> ClassMetrics {
    let n = confusion.len();
    let tp = confusion[c][c];
    let predicted: usize = (0..n).map(|t| confusion[t][c]).sum();
    let support: usize = confusion[c].iter().sum();

    let precision = ratio(tp, predicted);
    let recall = ratio(tp, support);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "class")]
    class: String,
    precision: String,
    recall: String,
    #[tabled(rename = "f1-score")]
    f1: String,
    support: usize,
}

impl EvalReport {
    /// Render the per-class table plus summary lines.
    pub fn render(&self) -> String {
        let rows: Vec<ReportRow> = self
            .class_names
            .iter()
            .zip(&self.per_class)
            .map(|(name, m)| ReportRow {
                class: name.clone(),
                precision: format!("{:.3}", m.precision),
                recall: format!("{:.3}", m.recall),
                f1: format!("{:.3}", m.f1),
                support: m.support,
            })
            .collect();

        format!(
            "{}\naccuracy: {:.4}  weighted f1: {:.4}",
            Table::new(rows), self.accuracy, self.weighted_f1
        )
    }

    /// Render the confusion matrix, rows = true class, columns = predicted.
    pub fn render_confusion(&self) -> String {
        let width = self
            .confusion
            .iter()
            .flatten()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(1);

        let mut out = String::from("confusion matrix (rows = true, cols = predicted):\n");
        for (name, row) in self.class_names.iter().zip(&self.confusion) {
            let cells: Vec<String> = row.iter().map(|c| format!("{:>width$}", c)).collect();
            out.push_str(&format!("  {:>20}  [{}]\n", name, cells.join(" ")));
        }
        out
    }
}
