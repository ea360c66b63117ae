//! 正解データ（画像ID, ラベル）の読み書き
//!
//! CSV（`csv`）とExcel（`calamine`）に対応。
//! 画像列は `Image Name`（なければ先頭列）、ラベル列は `Label`。

use crate::error::{DrugOcrError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use drug_ocr_common::LabelVocabulary;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

pub const IMAGE_COLUMN: &str = "Image Name";
pub const LABEL_COLUMN: &str = "Label";

/// 正解データの1行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthRow {
    #[serde(rename = "Image Name")]
    pub image: String,
    #[serde(rename = "Label")]
    pub label: String,
}

/// 正解データ全体（入力順を保持）
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    pub rows: Vec<GroundTruthRow>,
}

impl GroundTruth {
    /// 拡張子で形式を判定して読み込む
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DrugOcrError::FileNotFound(path.display().to_string()));
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Self::from_excel(path),
            _ => Self::from_csv_reader(std::fs::File::open(path)?),
        }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(record.iter().map(str::to_string).collect());
        }

        Self::from_records(header, records)
    }

    pub fn from_excel(path: &Path) -> Result<Self> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| DrugOcrError::ExcelRead(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| DrugOcrError::ExcelRead("シートがありません".into()))?
            .map_err(|e| DrugOcrError::ExcelRead(e.to_string()))?;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .map(|cells| cells.iter().map(cell_text).collect())
            .unwrap_or_default();
        let records = rows
            .map(|cells| cells.iter().map(cell_text).collect())
            .collect();

        Self::from_records(header, records)
    }

    fn from_records(header: Vec<String>, records: Vec<Vec<String>>) -> Result<Self> {
        let header: Vec<String> = header
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if header.is_empty() {
            return Err(DrugOcrError::InvalidDataset("ヘッダー行がありません".into()));
        }

        let image_idx = header.iter().position(|h| h == IMAGE_COLUMN).unwrap_or(0);
        let label_idx = header
            .iter()
            .position(|h| h == LABEL_COLUMN)
            .ok_or_else(|| {
                DrugOcrError::InvalidDataset(format!("`{}` 列がありません: {:?}", LABEL_COLUMN, header))
            })?;

        let mut rows = Vec::with_capacity(records.len());
        for (line, record) in records.iter().enumerate() {
            let field = |idx: usize| record.get(idx).map(|s| s.trim()).unwrap_or("");
            let (image, label) = (field(image_idx), field(label_idx));

            if image.is_empty() || label.is_empty() {
                tracing::warn!(row = line + 2, "画像IDまたはラベルが空の行をスキップ");
                continue;
            }

            rows.push(GroundTruthRow {
                image: image.to_string(),
                label: label.to_string(),
            });
        }

        Ok(Self { rows })
    }

    /// ラベル語彙（重複除去・ソート済み）
    pub fn vocabulary(&self) -> LabelVocabulary {
        LabelVocabulary::from_labels(self.rows.iter().map(|r| r.label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 正解データをCSVに書き出す（`Image Name,Label`）
pub fn write_dataset_csv(rows: &[GroundTruthRow], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
