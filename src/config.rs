use crate::error::{DrugOcrError, Result};
use drug_ocr_common::MatcherOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub top_k: usize,
    pub conflict_threshold: f64,
    pub dataset_path: PathBuf,
    pub cache_path: PathBuf,
    pub output_path: PathBuf,
    /// 追加の商品名⇔一般名シード（JSON）
    pub graph_seed: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let options = MatcherOptions::default();
        Self {
            top_k: options.top_k,
            conflict_threshold: options.conflict_threshold,
            dataset_path: PathBuf::from("dataset.csv"),
            cache_path: PathBuf::from("output/ocr_results.json"),
            output_path: PathBuf::from("prediction_results.csv"),
            graph_seed: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DrugOcrError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("drug-ocr").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(DrugOcrError::Config("top_k は1以上にしてください".into()));
        }
        if !(0.0..=1.0).contains(&self.conflict_threshold) {
            return Err(DrugOcrError::Config(format!(
                "conflict_threshold は0.0〜1.0の範囲にしてください: {}",
                self.conflict_threshold
            )));
        }
        Ok(())
    }

    /// CLI引数で上書きした照合オプション
    pub fn matcher_options(&self, top_k: Option<usize>, threshold: Option<f64>) -> Result<MatcherOptions> {
        let merged = Config {
            top_k: top_k.unwrap_or(self.top_k),
            conflict_threshold: threshold.unwrap_or(self.conflict_threshold),
            ..self.clone()
        };
        merged.validate()?;
        Ok(MatcherOptions {
            top_k: merged.top_k,
            conflict_threshold: merged.conflict_threshold,
        })
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<()> {
        self.top_k = top_k;
        self.save()
    }

    pub fn set_conflict_threshold(&mut self, threshold: f64) -> Result<()> {
        self.conflict_threshold = threshold;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_matcher_defaults() {
        let config = Config::default();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.conflict_threshold, 0.55);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_matcher_options_override() {
        let config = Config::default();
        let options = config.matcher_options(Some(5), None).unwrap();
        assert_eq!(options.top_k, 5);
        assert_eq!(options.conflict_threshold, 0.55);
    }

    #[test]
    fn test_invalid_threshold() {
        let config = Config::default();
        assert!(matches!(
            config.matcher_options(None, Some(1.5)),
            Err(DrugOcrError::Config(_))
        ));
        assert!(config.matcher_options(Some(0), None).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"top_k": 4}"#).unwrap();
        assert_eq!(config.top_k, 4);
        assert_eq!(config.conflict_threshold, 0.55);
        assert_eq!(config.dataset_path, PathBuf::from("dataset.csv"));
    }
}
