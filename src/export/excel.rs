//! Excel出力（rust_xlsxwriter）
//!
//! 「結果」シートに画像ごとの予測、「集計」シートに評価サマリーを書き出す。

use crate::error::{DrugOcrError, Result};
use drug_ocr_common::{EvaluationSummary, PredictionResult};
use rust_xlsxwriter::*;
use std::path::Path;

const RESULT_HEADERS: &[(&str, f64)] = &[
    ("Image Name", 36.0),
    ("True Label", 18.0),
    ("Predicted Label", 18.0),
    ("Best Score", 10.0),
    ("Resolution", 18.0),
    ("Correct", 8.0),
    ("OCR Text", 60.0),
];

fn xlsx_err(context: &str) -> impl Fn(XlsxError) -> DrugOcrError + '_ {
    move |e| DrugOcrError::ExcelGeneration(format!("{}: {}", context, e))
}

/// 結果と集計をExcelに保存
pub fn generate_excel(
    results: &[PredictionResult],
    summary: &EvaluationSummary,
    output_path: &Path,
) -> Result<()> {
    let buffer = generate_excel_buffer(results, summary)?;
    std::fs::write(output_path, buffer)?;
    Ok(())
}

/// Excelをバッファに生成
pub fn generate_excel_buffer(
    results: &[PredictionResult],
    summary: &EvaluationSummary,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::RGB(0xAAAAAA));
    let miss_format = Format::new().set_font_color(Color::RGB(0xC00000));
    let score_format = Format::new().set_num_format("0.0000");
    let percent_format = Format::new().set_num_format("0.00");

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("結果").map_err(xlsx_err("シート名設定エラー"))?;

        for (col, (title, width)) in RESULT_HEADERS.iter().enumerate() {
            let col = col as u16;
            sheet
                .write_string_with_format(0, col, *title, &header_format)
                .map_err(xlsx_err("ヘッダー書き込みエラー"))?;
            sheet.set_column_width(col, *width).map_err(xlsx_err("列幅設定エラー"))?;
        }
        sheet.set_freeze_panes(1, 0).map_err(xlsx_err("ウィンドウ枠固定エラー"))?;

        for (idx, result) in results.iter().enumerate() {
            let row = idx as u32 + 1;
            sheet
                .write_string(row, 0, &result.image_path)
                .and_then(|s| s.write_string(row, 1, &result.true_label))
                .and_then(|s| s.write_number_with_format(row, 3, result.best_score, &score_format))
                .and_then(|s| s.write_string(row, 4, result.resolution.as_str()))
                .and_then(|s| s.write_boolean(row, 5, result.correct))
                .and_then(|s| s.write_string(row, 6, &result.ocr_text))
                .map_err(xlsx_err("結果書き込みエラー"))?;

            // 不正解の予測は赤字
            let written = if result.correct {
                sheet.write_string(row, 2, &result.predicted_label)
            } else {
                sheet.write_string_with_format(row, 2, &result.predicted_label, &miss_format)
            };
            written.map_err(xlsx_err("結果書き込みエラー"))?;
        }
    }

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("集計").map_err(xlsx_err("シート名設定エラー"))?;
        sheet.set_column_width(0, 24.0).map_err(xlsx_err("列幅設定エラー"))?;

        let counts: [(&str, f64); 6] = [
            ("Total rows", summary.total_rows as f64),
            ("Skipped", summary.skipped as f64),
            ("Valid", summary.valid as f64),
            ("Correct", summary.correct as f64),
            ("Accuracy (%)", summary.accuracy),
            ("Graph resolved", summary.graph_resolved as f64),
        ];
        for (row, (name, value)) in counts.iter().enumerate() {
            let row = row as u32;
            sheet
                .write_string_with_format(row, 0, *name, &header_format)
                .and_then(|s| s.write_number_with_format(row, 1, *value, &percent_format))
                .map_err(xlsx_err("集計書き込みエラー"))?;
        }

        let table_top = counts.len() as u32 + 1;
        let columns = ["Label", "Total", "Correct", "Accuracy (%)", "WER raw", "CER raw", "WER processed", "CER processed"];
        for (col, title) in columns.iter().enumerate() {
            sheet
                .write_string_with_format(table_top, col as u16, *title, &header_format)
                .map_err(xlsx_err("ヘッダー書き込みエラー"))?;
        }

        for (idx, label) in summary.per_label.iter().enumerate() {
            let row = table_top + 1 + idx as u32;
            sheet
                .write_string(row, 0, &label.label)
                .and_then(|s| s.write_number(row, 1, label.total as f64))
                .and_then(|s| s.write_number(row, 2, label.correct as f64))
                .and_then(|s| s.write_number_with_format(row, 3, label.accuracy, &percent_format))
                .and_then(|s| s.write_number_with_format(row, 4, label.rates.wer_raw, &percent_format))
                .and_then(|s| s.write_number_with_format(row, 5, label.rates.cer_raw, &percent_format))
                .and_then(|s| s.write_number_with_format(row, 6, label.rates.wer_processed, &percent_format))
                .and_then(|s| s.write_number_with_format(row, 7, label.rates.cer_processed, &percent_format))
                .map_err(xlsx_err("集計書き込みエラー"))?;
        }
    }

    workbook
        .save_to_buffer()
        .map_err(xlsx_err("Excel保存エラー"))
}
