//! テキスト正規化モジュール
//!
//! - 類似度計算用の正規化（アクセント除去・ASCII化・小文字化）
//! - 画像識別子（パス）の比較用キー
//!
//! WER/CERはここを通さず、小文字化と空白分割だけの軽い変換を使う。

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 正規化済みテキスト（生成後は不変）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 文字数（バイト数ではない）
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 類似度計算用にテキストを正規化する
///
/// NFKD分解 → 結合文字除去 → ASCII以外を除去 → 前後空白除去 → 小文字化
pub fn canonicalize(text: &str) -> NormalizedText {
    let folded: String = text
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .filter(|ch| ch.is_ascii())
        .collect();

    NormalizedText(folded.trim().to_ascii_lowercase())
}

/// 画像識別子を比較用キーに変換
///
/// `\` と `/` を同一視し、`.` と空セグメントを除去、`..` は一つ上に戻る。
/// 先頭の区切り文字は保持し、最後に小文字化する。
pub fn canonical_key(identifier: &str) -> String {
    let unified = identifier.trim().replace('\\', "/");
    let rooted = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            _ => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    let key = if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    };

    key.to_lowercase()
}

/// WER用の単語分割（小文字化＋空白分割）
pub fn word_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// CER用の文字列（小文字化のみ）
pub fn char_tokens(text: &str) -> Vec<char> {
    text.to_lowercase().chars().collect()
}
