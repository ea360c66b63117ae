pub mod excel;

use crate::cli::ExportFormat;
use crate::error::Result;
use drug_ocr_common::{EvaluationSummary, PredictionResult};
use std::path::{Path, PathBuf};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// 出力パスの拡張子を差し替えたパス
fn sibling_with_extension(output: &Path, extension: &str) -> PathBuf {
    output.with_extension(extension)
}

/// 予測結果をCSVに書き出す（入力順）
pub fn write_results_csv(results: &[PredictionResult], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}

/// 保存済みの結果CSVを読み込む
pub fn read_results_csv(path: &Path) -> Result<Vec<PredictionResult>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut results = Vec::new();
    for record in reader.deserialize() {
        results.push(record?);
    }
    Ok(results)
}

/// 評価サマリーをJSONに書き出す
pub fn write_summary_json(summary: &EvaluationSummary, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// 形式に応じて結果を書き出し、書き出したパスを返す
///
/// CSVは常に `output` に書く。Excelは同じ名前で拡張子 `.xlsx`。
pub fn export_results(
    results: &[PredictionResult],
    summary: &EvaluationSummary,
    format: &ExportFormat,
    output: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    match format {
        ExportFormat::Csv => {
            write_results_csv(results, output)?;
            written.push(output.to_path_buf());
        }
        ExportFormat::Excel | ExportFormat::Both => {
            if matches!(format, ExportFormat::Both) {
                write_results_csv(results, output)?;
                written.push(output.to_path_buf());
            }
            let excel_path = sibling_with_extension(output, "xlsx");
            ensure_parent(&excel_path)?;
            println!("- Excelを生成中...");
            excel::generate_excel(results, summary, &excel_path)?;
            written.push(excel_path);
        }
    }

    for path in &written {
        println!("✔ 出力: {}", path.display());
    }
    Ok(written)
}
