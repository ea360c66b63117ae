//! ラベル照合モジュール
//!
//! OCRトークン群とラベル語彙をDL類似度で照合し、画像1枚につき1つの
//! ラベルを予測する。上位候補が拮抗した場合は同義語グラフで商品名を優先する。

use crate::distance::similarity;
use crate::graph::SynonymGraph;
use crate::normalize::{canonicalize, NormalizedText};
use crate::types::{round4, Prediction, Resolution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 照合オプション
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatcherOptions {
    /// グラフ照合に回す上位候補数
    pub top_k: usize,
    /// 曖昧候補とみなす最低スコア（以上）
    pub conflict_threshold: f64,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            top_k: 3,
            conflict_threshold: 0.55,
        }
    }
}

#[derive(Debug, Clone)]
struct VocabularyEntry {
    label: String,
    canonical: NormalizedText,
}

/// ラベル語彙（重複なし・ソート済み・構築後は不変）
///
/// ソート順がスコア同点時の優先順位になる。
#[derive(Debug, Clone, Default)]
pub struct LabelVocabulary {
    entries: Vec<VocabularyEntry>,
}

impl LabelVocabulary {
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        let entries = unique
            .into_iter()
            .map(|label| VocabularyEntry {
                canonical: canonicalize(&label),
                label,
            })
            .collect();
        Self { entries }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries
            .binary_search_by(|e| e.label.as_str().cmp(label))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// ラベルとスコアの組
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredLabel<'a> {
    pub label: &'a str,
    pub score: f64,
}

/// ラベル照合器
///
/// 語彙とグラフは借用するだけで、照合中に状態は持たない。
#[derive(Debug, Clone, Copy)]
pub struct LabelMatcher<'a> {
    vocabulary: &'a LabelVocabulary,
    graph: Option<&'a SynonymGraph>,
    options: MatcherOptions,
}

impl<'a> LabelMatcher<'a> {
    pub fn new(
        vocabulary: &'a LabelVocabulary,
        graph: Option<&'a SynonymGraph>,
        options: MatcherOptions,
    ) -> Self {
        Self {
            vocabulary,
            graph,
            options,
        }
    }

    pub fn options(&self) -> MatcherOptions {
        self.options
    }

    /// 全ラベルをスコア降順に並べる（同点は語彙順）
    ///
    /// ラベルのスコアは全トークンとの類似度の最大値。
    /// 正規化後に空になるトークンは無視する。
    pub fn rank<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<ScoredLabel<'a>> {
        let normalized: Vec<NormalizedText> = tokens
            .iter()
            .map(|t| canonicalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();

        let vocabulary: &'a LabelVocabulary = self.vocabulary;
        let mut ranked: Vec<ScoredLabel<'a>> = vocabulary
            .entries
            .iter()
            .map(|entry| ScoredLabel {
                label: entry.label.as_str(),
                score: normalized
                    .iter()
                    .map(|token| similarity(token.as_str(), entry.canonical.as_str()))
                    .fold(0.0, f64::max),
            })
            .collect();

        // 安定ソートなので同点は語彙順のまま
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// 画像1枚ぶんのトークンからラベルを予測
    pub fn predict<S: AsRef<str>>(&self, tokens: &[S]) -> Prediction {
        if tokens.is_empty() {
            return Prediction::unknown();
        }

        let ranked = self.rank(tokens);
        let Some(best) = ranked.first().copied() else {
            return Prediction::unknown();
        };

        let threshold = self.options.conflict_threshold;
        if let Some(graph) = self.graph {
            if best.score >= threshold {
                let candidates: Vec<&str> = ranked
                    .iter()
                    .take(self.options.top_k)
                    .filter(|c| c.score >= threshold)
                    .map(|c| c.label)
                    .collect();

                if candidates.len() >= 2 {
                    if let Some(resolved) = graph.resolve_conflict(&candidates) {
                        // スコアは解決されたラベル自身のもの
                        let score = ranked
                            .iter()
                            .find(|c| c.label == resolved)
                            .map(|c| c.score)
                            .unwrap_or(best.score);
                        return Prediction {
                            label: resolved.to_string(),
                            score,
                            resolution: Resolution::GraphBrandRule,
                        };
                    }
                }
            }
        }

        Prediction {
            label: best.label.to_string(),
            score: round4(best.score),
            resolution: Resolution::DlBest,
        }
    }
}

/// 関数形式の照合（`LabelMatcher` を一時的に組み立てる）
pub fn predict_label<S: AsRef<str>>(
    tokens: &[S],
    vocabulary: &LabelVocabulary,
    graph: Option<&SynonymGraph>,
    options: MatcherOptions,
) -> Prediction {
    LabelMatcher::new(vocabulary, graph, options).predict(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UNKNOWN_LABEL;

    fn vocab(labels: &[&str]) -> LabelVocabulary {
        LabelVocabulary::from_labels(labels.iter().copied())
    }

    #[test]
    fn test_vocabulary_sorted_and_deduplicated() {
        let v = vocab(&["Acetin", "Acepress", "Acetin", "Acebutolol"]);
        let labels: Vec<&str> = v.labels().collect();
        assert_eq!(labels, vec!["Acebutolol", "Acepress", "Acetin"]);
        assert!(v.contains("Acepress"));
        assert!(!v.contains("acepress"));
    }

    #[test]
    fn test_predict_empty_tokens() {
        let v = vocab(&["Acetin"]);
        let tokens: Vec<String> = vec![];
        let prediction = predict_label(&tokens, &v, None, MatcherOptions::default());
        assert_eq!(prediction.label, UNKNOWN_LABEL);
        assert_eq!(prediction.score, 0.0);
        assert_eq!(prediction.resolution, Resolution::NoOcr);
    }

    #[test]
    fn test_predict_empty_vocabulary() {
        let v = LabelVocabulary::default();
        let prediction = predict_label(&["acetin"], &v, None, MatcherOptions::default());
        assert_eq!(prediction, Prediction::unknown());
    }

    #[test]
    fn test_predict_max_over_tokens() {
        let v = vocab(&["Acebutolol", "Acetin"]);
        let tokens = ["PT KALBE FARMA", "10 x 10 tablet", "acetn"];
        let prediction = predict_label(&tokens, &v, None, MatcherOptions::default());
        assert_eq!(prediction.label, "Acetin");
        assert_eq!(prediction.resolution, Resolution::DlBest);
        // 1 - 1/6
        assert_eq!(prediction.score, 0.8333);
    }

    #[test]
    fn test_predict_ignores_blank_tokens() {
        let v = vocab(&["Acetin"]);
        let prediction = predict_label(&["   ", "錠"], &v, None, MatcherOptions::default());
        assert_eq!(prediction.label, "Acetin");
        assert_eq!(prediction.score, 0.0);
        assert_eq!(prediction.resolution, Resolution::DlBest);
    }

    #[test]
    fn test_rank_ties_keep_vocabulary_order() {
        let v = vocab(&["bbb", "aaa", "ccc"]);
        let matcher = LabelMatcher::new(&v, None, MatcherOptions::default());
        let ranked = matcher.rank(&["zzz"]);
        let labels: Vec<&str> = ranked.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn test_graph_prefers_brand_over_higher_generic() {
        let v = vocab(&["Acetin", "Acetylcysteine"]);
        let graph = SynonymGraph::from_pairs([("Acetin", "Acetylcysteine")]);
        let matcher = LabelMatcher::new(&v, Some(&graph), MatcherOptions::default());

        // 一般名 0.714 / 商品名 0.6 → どちらも閾値以上
        let ranked = matcher.rank(&["acetycstin"]);
        assert_eq!(ranked[0].label, "Acetylcysteine");

        let prediction = matcher.predict(&["acetycstin"]);
        assert_eq!(prediction.label, "Acetin");
        assert_eq!(prediction.resolution, Resolution::GraphBrandRule);
        assert!((prediction.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_graph_prefers_brand_when_brand_higher() {
        let v = vocab(&["Acetin", "Acetylcysteine"]);
        let graph = SynonymGraph::builtin();
        let prediction = predict_label(
            &["acetin", "acetylcysteine 200mg"],
            &v,
            Some(&graph),
            MatcherOptions::default(),
        );
        assert_eq!(prediction.label, "Acetin");
        assert_eq!(prediction.resolution, Resolution::GraphBrandRule);
        assert_eq!(prediction.score, 1.0);
    }

    #[test]
    fn test_graph_unrelated_falls_back_to_best() {
        let v = vocab(&["X1", "X12"]);
        let graph = SynonymGraph::builtin();
        // 両方閾値以上（1.0 / 0.667）だが関係がない
        let prediction = predict_label(&["x1"], &v, Some(&graph), MatcherOptions::default());
        assert_eq!(prediction.label, "X1");
        assert_eq!(prediction.resolution, Resolution::DlBest);
    }

    #[test]
    fn test_graph_skipped_below_threshold() {
        let v = vocab(&["Acetin", "Acetylcysteine"]);
        let graph = SynonymGraph::builtin();
        // "acetylcysin" は商品名に対して 0.545 で閾値未満
        let prediction = predict_label(&["acetylcysin"], &v, Some(&graph), MatcherOptions::default());
        assert_eq!(prediction.label, "Acetylcysteine");
        assert_eq!(prediction.resolution, Resolution::DlBest);
    }

    #[test]
    fn test_graph_respects_top_k() {
        let v = vocab(&["Acetin", "Acetycstin", "Acetylcysteine"]);
        let graph = SynonymGraph::builtin();
        // 順位: Acetycstin 1.0 / Acetylcysteine 0.714 / Acetin 0.6
        let narrow = MatcherOptions { top_k: 2, ..Default::default() };
        let prediction = predict_label(&["acetycstin"], &v, Some(&graph), narrow);
        assert_eq!(prediction.label, "Acetycstin");
        assert_eq!(prediction.resolution, Resolution::DlBest);

        let prediction = predict_label(&["acetycstin"], &v, Some(&graph), MatcherOptions::default());
        assert_eq!(prediction.label, "Acetin");
        assert_eq!(prediction.resolution, Resolution::GraphBrandRule);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let v = vocab(&["abcdefghij", "abcdefghik"]);
        let graph = SynonymGraph::from_pairs([("abcdefghik", "abcdefghij")]);
        let options = MatcherOptions { top_k: 3, conflict_threshold: 0.9 };
        // 両方ちょうど 0.9
        let prediction = predict_label(&["abcdefghiz"], &v, Some(&graph), options);
        assert_eq!(prediction.label, "abcdefghik");
        assert_eq!(prediction.resolution, Resolution::GraphBrandRule);
    }

    #[test]
    fn test_scores_in_unit_range() {
        let v = vocab(&["Acetin", "Acepress", "Acebutolol"]);
        let matcher = LabelMatcher::new(&v, None, MatcherOptions::default());
        for scored in matcher.rank(&["ACEBUTOLOL 400", "", "Açétin"]) {
            assert!((0.0..=1.0).contains(&scored.score));
        }
    }
}
