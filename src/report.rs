//! テキストレポート
//!
//! 画像ごとの照合行と評価サマリーを整形する。出力はすべて文字列で返し、
//! 表示は呼び出し側（main）が行う。

use chrono::Local;
use drug_ocr_common::{EvaluationSummary, PredictionResult, Resolution, SentinelOutcome};
use std::fmt::Write;
use std::path::Path;

const RULE_WIDTH: usize = 75;

fn rule(ch: char) -> String {
    ch.to_string().repeat(RULE_WIDTH)
}

fn display_name(image_path: &str) -> &str {
    image_path.rsplit(['\\', '/']).next().unwrap_or(image_path)
}

/// 照合結果一覧のヘッダー
pub fn row_header() -> String {
    format!(
        "{}\n{:<5} {:<38} {:<16} {:<16} {:<7}\n{}",
        rule('='),
        "#",
        "Image",
        "True",
        "Pred",
        "Score",
        rule('=')
    )
}

/// 照合結果1行（`idx` は1始まり）
pub fn format_row(idx: usize, result: &PredictionResult) -> String {
    if result.predicted_label == SentinelOutcome::NotCached.label() {
        return format!("{:<5} [SKIP - キャッシュなし] {}", idx, result.image_path);
    }

    let tag = if result.resolution == Resolution::GraphBrandRule {
        "[G]"
    } else {
        "   "
    };
    let mark = if result.correct { "OK" } else { "XX" };
    format!(
        "{:<5} {:<38} {:<16} {:<16} {:<7.4} {} {}",
        idx,
        result.display_name(),
        result.true_label,
        result.predicted_label,
        result.best_score,
        mark,
        tag
    )
}

/// 評価サマリー
pub fn format_summary(summary: &EvaluationSummary, results_path: Option<&Path>) -> String {
    if !summary.has_valid_predictions() {
        return format!(
            "評価できる予測がありません（全{}件がスキップ）",
            summary.total_rows
        );
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "{:^width$}", "評価サマリー", width = RULE_WIDTH);
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "  日時                  : {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    if let Some(path) = results_path {
        let _ = writeln!(out, "  結果ファイル          : {}", path.display());
    }
    let _ = writeln!(out, "  総行数                : {}", summary.total_rows);
    let _ = writeln!(out, "  スキップ              : {}", summary.skipped);
    let _ = writeln!(out, "  有効な予測            : {}", summary.valid);
    let _ = writeln!(out, "  正解                  : {}", summary.correct);
    let _ = writeln!(out, "  正解率                : {:.2}%", summary.accuracy);
    let _ = writeln!(out, "  グラフ規則で解決      : {}件", summary.graph_resolved);
    let _ = writeln!(out);

    let _ = writeln!(out, "  {}", "-".repeat(55));
    let _ = writeln!(out, "  {:<28} {:>12} {:>12}", "Metric", "Raw OCR", "Matched");
    let _ = writeln!(out, "  {}", "-".repeat(55));
    let rates = &summary.overall;
    let _ = writeln!(out, "  {:<28} {:>11.2}% {:>11.2}%", "Average WER", rates.wer_raw, rates.wer_processed);
    let _ = writeln!(out, "  {:<28} {:>11.2}% {:>11.2}%", "Average CER", rates.cer_raw, rates.cer_processed);
    let _ = writeln!(out, "  {}", "-".repeat(55));
    let _ = writeln!(out);

    let _ = writeln!(out, "ラベル別:");
    let _ = writeln!(
        out,
        "  {:<16} {:>6} | {:>8} {:>8} | {:>8} {:>8}",
        "Label", "Acc%", "WER_raw", "CER_raw", "WER_dl", "CER_dl"
    );
    let _ = writeln!(out, "  {}", "-".repeat(65));
    for label in &summary.per_label {
        let r = &label.rates;
        let _ = writeln!(
            out,
            "  {:<16} {:>5.1}% | {:>7.2}% {:>7.2}% | {:>7.2}% {:>7.2}%",
            label.label, label.accuracy, r.wer_raw, r.cer_raw, r.wer_processed, r.cer_processed
        );
    }
    let _ = write!(out, "{}", rule('='));

    if !summary.misclassified.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "\n誤分類の例（{}件中{}件）:",
            summary.misclassified_total,
            summary.misclassified.len()
        );
        let _ = writeln!(out, "  {:<35} {:<16} {:<16} Score", "Image", "True", "Pred");
        let _ = writeln!(out, "  {}", rule('-'));
        for m in &summary.misclassified {
            let _ = writeln!(
                out,
                "  {:<35} {:<16} {:<16} {}",
                display_name(&m.image_path),
                m.true_label,
                m.predicted_label,
                m.best_score
            );
        }
        out.truncate(out.trim_end().len());
    }

    out
}
