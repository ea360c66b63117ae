//! 商品名⇔一般名の同義語グラフ
//!
//! 商品名（ブランド）と一般名（有効成分名）の多対多の関係を
//! 双方向のマップで保持する。起動時に一度だけ構築し、以降は読み取り専用。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// 組み込みの関係（商品名, 一般名）
const BUILTIN_RELATIONS: &[(&str, &str)] = &[
    ("Acetin", "Acetylcysteine"),
    ("Acepress", "Acebutolol"),
];

/// シード定義の1関係
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRelation {
    pub brand: String,
    pub generic: String,
}

/// シード定義（JSON）
///
/// ```json
/// { "relations": [ { "brand": "Acetin", "generic": "Acetylcysteine" } ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSeed {
    #[serde(default)]
    pub relations: Vec<BrandRelation>,
}

impl GraphSeed {
    /// 組み込みシード
    pub fn builtin() -> Self {
        Self {
            relations: BUILTIN_RELATIONS
                .iter()
                .map(|(brand, generic)| BrandRelation {
                    brand: brand.to_string(),
                    generic: generic.to_string(),
                })
                .collect(),
        }
    }

    /// JSON文字列から読み込み（空の名前はエラー）
    pub fn from_json(json: &str) -> Result<Self> {
        let seed: Self = serde_json::from_str(json)?;
        if let Some(bad) = seed
            .relations
            .iter()
            .find(|r| r.brand.trim().is_empty() || r.generic.trim().is_empty())
        {
            return Err(Error::Seed(format!(
                "空の名前を含む関係: brand={:?}, generic={:?}",
                bad.brand, bad.generic
            )));
        }
        Ok(seed)
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// 商品名⇔一般名グラフ
#[derive(Debug, Clone, Default)]
pub struct SynonymGraph {
    brand_to_generics: HashMap<String, HashSet<String>>,
    generic_to_brands: HashMap<String, HashSet<String>>,
}

impl SynonymGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 組み込みシードから構築
    pub fn builtin() -> Self {
        Self::from_seed(&GraphSeed::builtin())
    }

    pub fn from_seed(seed: &GraphSeed) -> Self {
        Self::from_pairs(seed.relations.iter().map(|r| (r.brand.as_str(), r.generic.as_str())))
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut graph = Self::new();
        for (brand, generic) in pairs {
            graph.add_relation(brand, generic);
        }
        graph
    }

    /// 関係を双方向に追加する（冪等）
    ///
    /// 片方向だけの関係が存在しないよう、更新はこのメソッドに限る。
    pub fn add_relation(&mut self, brand: &str, generic: &str) {
        self.brand_to_generics
            .entry(brand.to_string())
            .or_default()
            .insert(generic.to_string());
        self.generic_to_brands
            .entry(generic.to_string())
            .or_default()
            .insert(brand.to_string());
    }

    /// 商品名に対応する一般名
    pub fn generics_of(&self, brand: &str) -> Option<&HashSet<String>> {
        self.brand_to_generics.get(brand)
    }

    /// 一般名に対応する商品名
    pub fn brands_of(&self, generic: &str) -> Option<&HashSet<String>> {
        self.generic_to_brands.get(generic)
    }

    pub fn is_brand_of(&self, brand: &str, generic: &str) -> bool {
        self.generics_of(brand)
            .is_some_and(|generics| generics.contains(generic))
    }

    /// 関係（辺）の数
    pub fn relation_count(&self) -> usize {
        self.brand_to_generics.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.brand_to_generics.is_empty()
    }

    /// 曖昧な候補群から商品名を選ぶ
    ///
    /// 候補はスコア降順で渡すこと。先頭から走査し、候補群の中に
    /// 自身の一般名が含まれる最初の候補（＝商品名側）を返す。
    /// 該当なしは `None`（呼び出し側はスコア最上位にフォールバックする）。
    pub fn resolve_conflict<'a, S: AsRef<str>>(&self, candidates: &'a [S]) -> Option<&'a str> {
        candidates
            .iter()
            .map(|c| -> &'a str { c.as_ref() })
            .find(|&candidate| {
                self.generics_of(candidate).is_some_and(|generics| {
                    candidates
                        .iter()
                        .map(|c| -> &str { c.as_ref() })
                        .any(|other| other != candidate && generics.contains(other))
                })
            })
    }

    /// 人が読める形式の一覧
    pub fn summary(&self) -> String {
        let mut edges: Vec<(&str, &str)> = self
            .brand_to_generics
            .iter()
            .flat_map(|(brand, generics)| {
                generics.iter().map(move |g| (brand.as_str(), g.as_str()))
            })
            .collect();
        edges.sort();

        let mut lines = vec![format!("Drug graph: {} relations brand->generic", edges.len())];
        lines.extend(
            edges
                .iter()
                .map(|(brand, generic)| format!("  {} --[is_brand_of]--> {}", brand, generic)),
        );
        lines.join("\n")
    }
}
