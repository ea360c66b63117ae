//! 一括照合・評価
//!
//! 画像ごとの照合は互いに独立なので rayon で並列に行い、
//! 結果は入力（正解データ）の順序のまま返す。

use crate::config::Config;
use crate::dataset::GroundTruthRow;
use crate::error::Result;
use crate::ocr_cache::TokenLookup;
use drug_ocr_common::{
    EvaluationAccumulator, EvaluationSummary, GraphSeed, LabelMatcher, PredictionResult,
    SentinelOutcome, SynonymGraph,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::Path;

/// 評価の集計単位（固定長なのでスレッド数によらず結果が同じ）
const EVAL_CHUNK_SIZE: usize = 256;

/// 一括照合の結果
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// 入力順の予測結果
    pub results: Vec<PredictionResult>,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

/// 同義語グラフを構築（組み込み＋追加シード）
pub fn build_graph(config: &Config, seed_override: Option<&Path>) -> Result<SynonymGraph> {
    let mut seed = GraphSeed::builtin();
    if let Some(path) = seed_override.or(config.graph_seed.as_deref()) {
        let extra = GraphSeed::from_file(path)?;
        tracing::info!(path = %path.display(), relations = extra.relations.len(), "追加シードを読み込み");
        seed.relations.extend(extra.relations);
    }
    Ok(SynonymGraph::from_seed(&seed))
}

/// 画像1枚を照合
///
/// キャッシュにない画像はセンチネル結果になり、バッチは継続する。
pub fn predict_row(
    row: &GroundTruthRow,
    lookup: &TokenLookup<'_>,
    matcher: &LabelMatcher<'_>,
) -> PredictionResult {
    match lookup.get(&row.image) {
        Some(tokens) => {
            let prediction = matcher.predict(tokens);
            tracing::debug!(
                image = %row.image,
                predicted = %prediction.label,
                score = prediction.score,
                resolution = %prediction.resolution,
                "照合"
            );
            PredictionResult::from_prediction(&row.image, &row.label, prediction, tokens)
        }
        None => {
            tracing::debug!(image = %row.image, "キャッシュにない画像");
            PredictionResult::sentinel(&row.image, &row.label, SentinelOutcome::NotCached)
        }
    }
}

/// 全画像を並列に照合（結果は入力順）
pub fn run_batch(
    rows: &[GroundTruthRow],
    lookup: &TokenLookup<'_>,
    matcher: &LabelMatcher<'_>,
    show_progress: bool,
) -> BatchOutcome {
    let progress = if show_progress {
        let pb = ProgressBar::new(rows.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("  [{bar:40}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let results: Vec<PredictionResult> = rows
        .par_iter()
        .map(|row| {
            let result = predict_row(row, lookup, matcher);
            progress.inc(1);
            result
        })
        .collect();
    progress.finish_and_clear();

    let cache_misses = results
        .iter()
        .filter(|r| r.predicted_label == SentinelOutcome::NotCached.label())
        .count();

    BatchOutcome {
        cache_hits: results.len() - cache_misses,
        cache_misses,
        results,
    }
}

/// 予測結果を評価（固定長チャンクごとに並列集計し、入力順に結合）
pub fn evaluate_results(results: &[PredictionResult]) -> EvaluationSummary {
    let partials: Vec<EvaluationAccumulator> = results
        .par_chunks(EVAL_CHUNK_SIZE)
        .map(|chunk| {
            let mut acc = EvaluationAccumulator::new();
            chunk.iter().for_each(|r| acc.add(r));
            acc
        })
        .collect();

    partials
        .into_iter()
        .fold(EvaluationAccumulator::new(), EvaluationAccumulator::merge)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr_cache::TokenCache;
    use drug_ocr_common::{LabelVocabulary, MatcherOptions, Resolution};

    fn row(image: &str, label: &str) -> GroundTruthRow {
        GroundTruthRow {
            image: image.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_run_batch_keeps_input_order() {
        let mut cache = TokenCache::default();
        for i in 0..50 {
            cache.insert(&format!("\\Acetin\\image_{}.jpg", i), vec!["acetin".to_string()]);
        }
        let rows: Vec<GroundTruthRow> = (0..50)
            .map(|i| row(&format!("/acetin/image_{}.jpg", i), "Acetin"))
            .collect();

        let vocab = LabelVocabulary::from_labels(["Acetin", "Acepress"]);
        let matcher = LabelMatcher::new(&vocab, None, MatcherOptions::default());
        let outcome = run_batch(&rows, &cache.lookup(), &matcher, false);

        assert_eq!(outcome.results.len(), 50);
        assert_eq!(outcome.cache_hits, 50);
        for (i, result) in outcome.results.iter().enumerate() {
            assert_eq!(result.image_path, format!("/acetin/image_{}.jpg", i));
            assert!(result.correct);
        }
    }

    #[test]
    fn test_missing_image_becomes_sentinel() {
        let cache = TokenCache::default();
        let vocab = LabelVocabulary::from_labels(["Acetin"]);
        let matcher = LabelMatcher::new(&vocab, None, MatcherOptions::default());
        let outcome = run_batch(&[row("a.jpg", "Acetin")], &cache.lookup(), &matcher, false);

        assert_eq!(outcome.cache_misses, 1);
        assert_eq!(outcome.results[0].predicted_label, "OCR_NOT_CACHED");
        assert_eq!(outcome.results[0].resolution, Resolution::NotCached);
    }

    #[test]
    fn test_evaluate_results_matches_sequential_counts() {
        let mut cache = TokenCache::default();
        let mut rows = Vec::new();
        for i in 0..600 {
            let image = format!("img_{}.jpg", i);
            if i % 7 != 0 {
                let token = if i % 3 == 0 { "acepress" } else { "acetin" };
                cache.insert(&image, vec![token.to_string()]);
            }
            rows.push(row(&image, "Acetin"));
        }

        let vocab = LabelVocabulary::from_labels(["Acetin", "Acepress"]);
        let matcher = LabelMatcher::new(&vocab, None, MatcherOptions::default());
        let outcome = run_batch(&rows, &cache.lookup(), &matcher, false);

        let parallel = evaluate_results(&outcome.results);
        let sequential = drug_ocr_common::evaluate(&outcome.results);

        assert_eq!(parallel.total_rows, sequential.total_rows);
        assert_eq!(parallel.valid, sequential.valid);
        assert_eq!(parallel.correct, sequential.correct);
        assert_eq!(parallel.misclassified, sequential.misclassified);
        assert!((parallel.overall.cer_processed - sequential.overall.cer_processed).abs() < 1e-9);
    }

    #[test]
    fn test_build_graph_with_extra_seed() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = dir.path().join("seed.json");
        std::fs::write(
            &seed_path,
            r#"{"relations":[{"brand":"Fluimucil","generic":"Acetylcysteine"}]}"#,
        )
        .unwrap();

        let graph = build_graph(&Config::default(), Some(&seed_path)).unwrap();
        assert!(graph.is_brand_of("Fluimucil", "Acetylcysteine"));
        assert!(graph.is_brand_of("Acetin", "Acetylcysteine"));
    }
}
