//! OCRトークンキャッシュ
//!
//! 外部のOCR処理が画像ごとに書き出したトークン列を読み込み、
//! 画像IDの表記ゆれ（区切り文字・大文字小文字）を吸収して引けるようにする。
//!
//! ```json
//! {
//!   "images":    { "\\Acetin\\image_1.jpg": "output/Acetin/result_image_1.jpg" },
//!   "sentences": { "\\Acetin\\image_1.jpg": ["ACETIN", "Acetylcysteine 200 mg"] }
//! }
//! ```

use crate::error::{DrugOcrError, Result};
use drug_ocr_common::canonical_key;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// キャッシュファイルの構造
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenCache {
    /// 画像ID → 注釈画像のパス
    #[serde(default)]
    pub images: BTreeMap<String, String>,
    /// 画像ID → OCRトークン列
    #[serde(default)]
    pub sentences: BTreeMap<String, Vec<String>>,
}

impl TokenCache {
    /// キャッシュファイルを読み込み（存在しない・壊れている場合はエラー）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DrugOcrError::FileNotFound(path.display().to_string()));
        }

        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader)
            .map_err(|e| DrugOcrError::InvalidCache(format!("{}: {}", path.display(), e)))
    }

    /// キャッシュファイルを保存
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// トークン列を追加
    pub fn insert(&mut self, image_id: &str, tokens: Vec<String>) {
        self.sentences.insert(image_id.to_string(), tokens);
    }

    /// キャッシュ件数
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// トークンが0個の画像数
    pub fn empty_entries(&self) -> usize {
        self.sentences.values().filter(|t| t.is_empty()).count()
    }

    /// トークン総数
    pub fn token_count(&self) -> usize {
        self.sentences.values().map(Vec::len).sum()
    }

    /// 正規化キーで引ける索引を作る
    pub fn lookup(&self) -> TokenLookup<'_> {
        let mut by_key: HashMap<String, &[String]> = HashMap::with_capacity(self.sentences.len());
        for (image_id, tokens) in &self.sentences {
            if by_key.insert(canonical_key(image_id), tokens.as_slice()).is_some() {
                tracing::warn!(image = %image_id, "正規化後のキーが重複（後のエントリを使用）");
            }
        }
        TokenLookup { by_key }
    }
}

/// 正規化キー → トークン列の索引
#[derive(Debug, Clone, Default)]
pub struct TokenLookup<'a> {
    by_key: HashMap<String, &'a [String]>,
}

impl<'a> TokenLookup<'a> {
    /// 画像IDでトークン列を取得（`\`/`/` と大文字小文字は区別しない）
    pub fn get(&self, image_id: &str) -> Option<&'a [String]> {
        self.by_key.get(&canonical_key(image_id)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_separator_and_case() {
        let mut cache = TokenCache::default();
        cache.insert("\\Acetin\\image_1.jpg", vec!["ACETIN".to_string()]);

        let lookup = cache.lookup();
        assert_eq!(lookup.get("/acetin/IMAGE_1.jpg"), Some(&["ACETIN".to_string()][..]));
        assert_eq!(lookup.get("\\ACETIN\\image_1.jpg").map(<[String]>::len), Some(1));
        assert!(lookup.get("\\Acetin\\image_2.jpg").is_none());
    }

    #[test]
    fn test_counts() {
        let mut cache = TokenCache::default();
        cache.insert("a.jpg", vec!["x".to_string(), "y".to_string()]);
        cache.insert("b.jpg", vec![]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.token_count(), 2);
        assert_eq!(cache.empty_entries(), 1);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let cache: TokenCache = serde_json::from_str("{}").unwrap();
        assert!(cache.is_empty());
        assert!(cache.images.is_empty());
    }
}
