//! 編集距離モジュール
//!
//! - 類似度スコア用: 隣接転置つき Damerau-Levenshtein（OSA版）
//! - WER/CER用: 挿入・削除・置換のみの標準的な編集距離

use crate::normalize::{char_tokens, word_tokens};

/// OCRトークンの区切り文字（`PredictionResult::ocr_text` の連結に使う）
pub const OCR_TOKEN_DELIMITER: char = '|';

/// Damerau-Levenshtein距離（小文字化して比較）
///
/// 隣接する2文字の転置のみを許す制限版（optimal string alignment）。
/// 一度転置した部分文字列を再編集できないため距離の公理を満たさない場合がある
/// （例: `"ca"` → `"abc"` は 3。無制限版なら 2）。
/// 閾値 0.55 はこの挙動を前提に調整されているので、無制限版に差し替える場合は
/// 閾値も見直すこと。
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let s1 = char_tokens(a);
    let s2 = char_tokens(b);
    let (len1, len2) = (s1.len(), s2.len());

    if len1 == 0 {
        return len2;
    }
    if len2 == 0 {
        return len1;
    }

    let mut dp = vec![vec![0usize; len2 + 1]; len1 + 1];
    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in dp[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=len1 {
        for j in 1..=len2 {
            let cost = usize::from(s1[i - 1] != s2[j - 1]);
            dp[i][j] = (dp[i - 1][j] + 1) // 削除
                .min(dp[i][j - 1] + 1) // 挿入
                .min(dp[i - 1][j - 1] + cost); // 置換

            // 隣接転置
            if i > 1 && j > 1 && s1[i - 1] == s2[j - 2] && s1[i - 2] == s2[j - 1] {
                dp[i][j] = dp[i][j].min(dp[i - 2][j - 2] + cost);
            }
        }
    }

    dp[len1][len2]
}

/// DL距離を [0, 1] の類似度に正規化
///
/// 両方空なら 1.0、片方だけ空なら 0.0。
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = damerau_levenshtein(a, b);
    (1.0 - distance as f64 / max_len as f64).clamp(0.0, 1.0)
}

/// 挿入・削除・置換のみの編集距離（転置なし）
pub fn edit_distance<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> usize {
    if reference.is_empty() {
        return hypothesis.len();
    }
    if hypothesis.is_empty() {
        return reference.len();
    }

    let mut prev_row: Vec<usize> = (0..=hypothesis.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; hypothesis.len() + 1];

    for (i, r) in reference.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, h) in hypothesis.iter().enumerate() {
            let cost = usize::from(r != h);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[hypothesis.len()]
}

/// 参照長0のときの扱い: 仮説も空なら 0.0、そうでなければ 1.0
fn error_rate<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> f64 {
    if reference.is_empty() {
        return if hypothesis.is_empty() { 0.0 } else { 1.0 };
    }
    edit_distance(reference, hypothesis) as f64 / reference.len() as f64
}

/// 単語誤り率（WER）
pub fn word_error_rate(reference: &str, hypothesis: &str) -> f64 {
    error_rate(&word_tokens(reference), &word_tokens(hypothesis))
}

/// 文字誤り率（CER）
pub fn character_error_rate(reference: &str, hypothesis: &str) -> f64 {
    error_rate(&char_tokens(reference), &char_tokens(hypothesis))
}

/// `|` 区切りのOCRテキストから正解ラベルに最も近いトークンを返す
///
/// マッチャーの予測とは無関係に、OCR単体の品質を測るために使う。
/// 距離が同じなら先に出現したトークンを優先。トークンがなければ空文字列。
pub fn find_best_ocr_token<'a>(ocr_text: &'a str, true_label: &str) -> &'a str {
    let reference = char_tokens(true_label);

    ocr_text
        .split(OCR_TOKEN_DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| (token, edit_distance(&reference, &char_tokens(token))))
        .fold(None, |best: Option<(&str, usize)>, (token, dist)| match best {
            Some((_, best_dist)) if best_dist <= dist => best,
            _ => Some((token, dist)),
        })
        .map(|(token, _)| token)
        .unwrap_or("")
}
