//! 評価集計モジュール
//!
//! 予測結果の列から正解率・WER・CERを全体とラベル別に集計する。
//!
//! - raw: OCRトークンのうち正解ラベルに最も近いもの vs 正解（OCR単体の品質）
//! - processed: 予測ラベル vs 正解（照合後の品質）
//!
//! センチネル結果は総数にだけ数え、すべての分母から除外する。

use crate::distance::{character_error_rate, find_best_ocr_token, word_error_rate};
use crate::types::{PredictionResult, Resolution};
use serde::Serialize;
use std::collections::BTreeMap;

/// 誤分類サンプルの最大件数
pub const MISCLASSIFIED_SAMPLE_LIMIT: usize = 10;

/// 1件ぶんの誤り率
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntryMetrics {
    pub wer_raw: f64,
    pub cer_raw: f64,
    pub wer_processed: f64,
    pub cer_processed: f64,
}

impl EntryMetrics {
    pub fn compute(result: &PredictionResult) -> Self {
        let best_token = find_best_ocr_token(&result.ocr_text, &result.true_label);
        Self {
            wer_raw: word_error_rate(&result.true_label, best_token),
            cer_raw: character_error_rate(&result.true_label, best_token),
            wer_processed: word_error_rate(&result.true_label, &result.predicted_label),
            cer_processed: character_error_rate(&result.true_label, &result.predicted_label),
        }
    }
}

/// 誤り率（パーセント）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ErrorRates {
    pub wer_raw: f64,
    pub cer_raw: f64,
    pub wer_processed: f64,
    pub cer_processed: f64,
}

/// ラベル単位の累積値
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LabelAccumulator {
    pub total: usize,
    pub correct: usize,
    sums: EntryMetrics,
}

impl LabelAccumulator {
    pub fn add(&mut self, correct: bool, metrics: &EntryMetrics) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
        self.sums.wer_raw += metrics.wer_raw;
        self.sums.cer_raw += metrics.cer_raw;
        self.sums.wer_processed += metrics.wer_processed;
        self.sums.cer_processed += metrics.cer_processed;
    }

    pub fn merge(&mut self, other: &LabelAccumulator) {
        self.total += other.total;
        self.correct += other.correct;
        self.sums.wer_raw += other.sums.wer_raw;
        self.sums.cer_raw += other.sums.cer_raw;
        self.sums.wer_processed += other.sums.wer_processed;
        self.sums.cer_processed += other.sums.cer_processed;
    }

    /// 正解率（%）。件数0なら 0
    pub fn accuracy(&self) -> f64 {
        percent(self.correct as f64, self.total)
    }

    /// 平均誤り率（%）。件数0なら 0
    pub fn rates(&self) -> ErrorRates {
        ErrorRates {
            wer_raw: percent(self.sums.wer_raw, self.total),
            cer_raw: percent(self.sums.cer_raw, self.total),
            wer_processed: percent(self.sums.wer_processed, self.total),
            cer_processed: percent(self.sums.cer_processed, self.total),
        }
    }
}

fn percent(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64 * 100.0
    }
}

/// 誤分類サンプル
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Misclassified {
    pub image_path: String,
    pub true_label: String,
    pub predicted_label: String,
    pub best_score: f64,
}

impl From<&PredictionResult> for Misclassified {
    fn from(result: &PredictionResult) -> Self {
        Self {
            image_path: result.image_path.clone(),
            true_label: result.true_label.clone(),
            predicted_label: result.predicted_label.clone(),
            best_score: result.best_score,
        }
    }
}

/// 評価全体の累積値
///
/// 入力の連続した区間ごとに集計して `merge` で結合できる。
/// 結合は「左が先の区間」の順で行うこと（誤分類サンプルの順序を保つため）。
#[derive(Debug, Clone, Default)]
pub struct EvaluationAccumulator {
    total_rows: usize,
    graph_resolved: usize,
    overall: LabelAccumulator,
    per_label: BTreeMap<String, LabelAccumulator>,
    misclassified: Vec<Misclassified>,
    misclassified_total: usize,
}

impl EvaluationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: &PredictionResult) {
        self.total_rows += 1;
        if !result.is_valid() {
            return;
        }

        let metrics = EntryMetrics::compute(result);
        self.overall.add(result.correct, &metrics);
        self.per_label
            .entry(result.true_label.clone())
            .or_default()
            .add(result.correct, &metrics);

        if result.resolution == Resolution::GraphBrandRule {
            self.graph_resolved += 1;
        }

        if !result.correct {
            self.misclassified_total += 1;
            if self.misclassified.len() < MISCLASSIFIED_SAMPLE_LIMIT {
                self.misclassified.push(Misclassified::from(result));
            }
        }
    }

    pub fn merge(mut self, other: EvaluationAccumulator) -> Self {
        self.total_rows += other.total_rows;
        self.graph_resolved += other.graph_resolved;
        self.overall.merge(&other.overall);
        for (label, acc) in other.per_label {
            self.per_label.entry(label).or_default().merge(&acc);
        }
        self.misclassified_total += other.misclassified_total;
        self.misclassified.extend(other.misclassified);
        self.misclassified.truncate(MISCLASSIFIED_SAMPLE_LIMIT);
        self
    }

    pub fn finish(self) -> EvaluationSummary {
        let per_label = self
            .per_label
            .into_iter()
            .map(|(label, acc)| LabelBreakdown {
                label,
                total: acc.total,
                correct: acc.correct,
                accuracy: acc.accuracy(),
                rates: acc.rates(),
            })
            .collect();

        EvaluationSummary {
            total_rows: self.total_rows,
            skipped: self.total_rows - self.overall.total,
            valid: self.overall.total,
            correct: self.overall.correct,
            accuracy: self.overall.accuracy(),
            graph_resolved: self.graph_resolved,
            overall: self.overall.rates(),
            per_label,
            misclassified: self.misclassified,
            misclassified_total: self.misclassified_total,
        }
    }
}

/// ラベル別の内訳
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelBreakdown {
    pub label: String,
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub rates: ErrorRates,
}

/// 評価サマリ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub total_rows: usize,
    pub skipped: usize,
    pub valid: usize,
    pub correct: usize,
    /// 正解率（%）
    pub accuracy: f64,
    /// グラフで解決した件数
    pub graph_resolved: usize,
    pub overall: ErrorRates,
    /// 正解ラベルのソート順
    pub per_label: Vec<LabelBreakdown>,
    /// 先頭から最大10件（入力順）
    pub misclassified: Vec<Misclassified>,
    pub misclassified_total: usize,
}

impl EvaluationSummary {
    /// 評価対象が1件以上あるか
    pub fn has_valid_predictions(&self) -> bool {
        self.valid > 0
    }
}

/// 予測結果の列を評価する
pub fn evaluate(results: &[PredictionResult]) -> EvaluationSummary {
    results
        .iter()
        .fold(EvaluationAccumulator::new(), |mut acc, result| {
            acc.add(result);
            acc
        })
        .finish()
}
