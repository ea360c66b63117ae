//! 画像フォルダのスキャン
//!
//! `<root>/<薬品名>/<画像>` の構成から正解データを作る。
//! 画像IDは `\<薬品名>\<ファイル名>` 形式（OCRキャッシュ側のキーと同じ）。

use crate::dataset::GroundTruthRow;
use crate::error::{DrugOcrError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    /// 親フォルダ名（＝正解ラベル）
    pub label: String,
}

impl ImageInfo {
    /// 正解データ用の画像ID
    pub fn image_id(&self) -> String {
        format!("\\{}\\{}", self.label, self.file_name)
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "gif"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// 薬品フォルダ単位で画像を列挙（フォルダ名順・ファイル名順）
pub fn scan_drug_folders(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.is_dir() {
        return Err(DrugOcrError::FolderNotFound(folder.display().to_string()));
    }

    let mut images = Vec::new();

    for drug_dir in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let label = drug_dir.file_name().to_string_lossy().to_string();
        let before = images.len();

        for entry in WalkDir::new(drug_dir.path())
            .min_depth(1)
            .max_depth(1)  // 直下のみ（再帰しない）
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let is_image = path
                .extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false);
            if !is_image {
                continue;
            }

            images.push(ImageInfo {
                path: path.to_path_buf(),
                file_name: entry.file_name().to_string_lossy().to_string(),
                label: label.clone(),
            });
        }

        if images.len() == before {
            tracing::info!(label = %label, "画像がないフォルダをスキップ");
        }
    }

    Ok(images)
}

/// スキャン結果を正解データの行に変換
pub fn to_ground_truth(images: &[ImageInfo]) -> Vec<GroundTruthRow> {
    images
        .iter()
        .map(|img| GroundTruthRow {
            image: img.image_id(),
            label: img.label.clone(),
        })
        .collect()
}
