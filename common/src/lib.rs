//! Drug OCR Common Library
//!
//! OCRトークンとラベル語彙の照合・評価のコア（I/Oなし）

pub mod error;
pub mod normalize;
pub mod distance;
pub mod graph;
pub mod types;
pub mod matcher;
pub mod evaluation;

pub use error::{Error, Result};
pub use normalize::{canonical_key, canonicalize, NormalizedText};
pub use distance::{
    character_error_rate, damerau_levenshtein, edit_distance, find_best_ocr_token, similarity,
    word_error_rate,
};
pub use graph::{BrandRelation, GraphSeed, SynonymGraph};
pub use types::{is_sentinel_label, Prediction, PredictionResult, Resolution, SentinelOutcome};
pub use matcher::{predict_label, LabelMatcher, LabelVocabulary, MatcherOptions, ScoredLabel};
pub use evaluation::{evaluate, EvaluationAccumulator, EvaluationSummary, LabelBreakdown};
