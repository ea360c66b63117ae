//! 予測結果の型定義
//!
//! - Resolution: 予測の決定方法（またはキャッシュ段階のセンチネル）
//! - Prediction: マッチャーの出力
//! - PredictionResult: 画像1枚ぶんの最終レコード

use crate::distance::OCR_TOKEN_DELIMITER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 予測不能を表すラベル
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// 評価の分母から除外するラベル
pub const SENTINEL_LABELS: &[&str] = &["FILE_NOT_FOUND", "OCR_ERROR", "OCR_NOT_CACHED", UNKNOWN_LABEL];

/// センチネルラベルかどうか
pub fn is_sentinel_label(label: &str) -> bool {
    SENTINEL_LABELS.contains(&label)
}

/// 予測の決定方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// OCRトークンなし
    NoOcr,
    /// DL類似度の最上位
    DlBest,
    /// 同義語グラフで商品名を優先
    GraphBrandRule,
    /// キャッシュに画像がない
    NotCached,
    /// OCR処理エラー
    OcrError,
    /// 画像ファイルがない
    FileNotFound,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::NoOcr => "no_ocr",
            Resolution::DlBest => "dl_best",
            Resolution::GraphBrandRule => "graph_brand_rule",
            Resolution::NotCached => "not_cached",
            Resolution::OcrError => "ocr_error",
            Resolution::FileNotFound => "file_not_found",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 上流（トークンキャッシュ参照）で発生するセンチネル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelOutcome {
    NotCached,
    OcrError,
    FileNotFound,
}

impl SentinelOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SentinelOutcome::NotCached => "OCR_NOT_CACHED",
            SentinelOutcome::OcrError => "OCR_ERROR",
            SentinelOutcome::FileNotFound => "FILE_NOT_FOUND",
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            SentinelOutcome::NotCached => Resolution::NotCached,
            SentinelOutcome::OcrError => Resolution::OcrError,
            SentinelOutcome::FileNotFound => Resolution::FileNotFound,
        }
    }
}

/// マッチャーの出力
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
    pub resolution: Resolution,
}

impl Prediction {
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            score: 0.0,
            resolution: Resolution::NoOcr,
        }
    }
}

/// 画像1枚ぶんの予測結果（生成後は変更しない）
///
/// CSV列: image_path, true_label, predicted_label, best_score, resolution, ocr_text, correct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub image_path: String,
    pub true_label: String,
    pub predicted_label: String,
    pub best_score: f64,
    pub resolution: Resolution,
    /// OCRトークンを ` | ` で連結したもの
    pub ocr_text: String,
    pub correct: bool,
}

impl PredictionResult {
    /// マッチャーの予測から生成
    pub fn from_prediction(
        image_path: &str,
        true_label: &str,
        prediction: Prediction,
        tokens: &[String],
    ) -> Self {
        let correct = prediction.label.to_lowercase() == true_label.to_lowercase();
        Self {
            image_path: image_path.to_string(),
            true_label: true_label.to_string(),
            predicted_label: prediction.label,
            best_score: prediction.score,
            resolution: prediction.resolution,
            ocr_text: join_tokens(tokens),
            correct,
        }
    }

    /// センチネル結果を生成
    pub fn sentinel(image_path: &str, true_label: &str, outcome: SentinelOutcome) -> Self {
        Self {
            image_path: image_path.to_string(),
            true_label: true_label.to_string(),
            predicted_label: outcome.label().to_string(),
            best_score: 0.0,
            resolution: outcome.resolution(),
            ocr_text: String::new(),
            correct: false,
        }
    }

    /// 評価対象か（センチネルでない）
    pub fn is_valid(&self) -> bool {
        !is_sentinel_label(&self.predicted_label)
    }

    /// 表示用ファイル名（パスの末尾）
    pub fn display_name(&self) -> &str {
        self.image_path
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(&self.image_path)
    }
}

/// OCRトークンを連結
pub fn join_tokens(tokens: &[String]) -> String {
    tokens.join(&format!(" {} ", OCR_TOKEN_DELIMITER))
}

/// 小数点以下4桁に丸める
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
