use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drug-ocr")]
#[command(about = "薬品ラベルOCRの照合・評価ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// OCRキャッシュと正解データを照合して評価
    Evaluate {
        /// 正解データ（CSV/XLSX、省略時は設定値）
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// OCRトークンキャッシュ（JSON、省略時は設定値）
        #[arg(short, long)]
        cache: Option<PathBuf>,

        /// 結果の出力先（省略時は設定値）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 出力形式 (csv/excel/both)
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        /// 類似度上位の候補数
        #[arg(long)]
        top_k: Option<usize>,

        /// 同義語グラフを使う類似度の下限（0.0-1.0）
        #[arg(long)]
        threshold: Option<f64>,

        /// 同義語グラフを使わない
        #[arg(long)]
        no_graph: bool,

        /// 追加の商品名⇔一般名シード（JSON）
        #[arg(long)]
        graph_seed: Option<PathBuf>,

        /// 評価サマリーをJSONでも保存
        #[arg(long)]
        summary_json: Option<PathBuf>,

        /// 1件ごとの照合結果を表示
        #[arg(long)]
        show_rows: bool,
    },

    /// OCRトークンからラベルを1件予測
    Predict {
        /// OCRトークン
        #[arg(required = true)]
        tokens: Vec<String>,

        /// 候補ラベル（複数指定可）
        #[arg(short, long = "label")]
        labels: Vec<String>,

        /// 候補ラベルを正解データから読む
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// 類似度上位の候補数
        #[arg(long)]
        top_k: Option<usize>,

        /// 同義語グラフを使う類似度の下限（0.0-1.0）
        #[arg(long)]
        threshold: Option<f64>,

        /// 同義語グラフを使わない
        #[arg(long)]
        no_graph: bool,
    },

    /// 薬品フォルダから正解データCSVを生成
    Dataset {
        /// 薬品ごとのサブフォルダを持つフォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// 出力CSV（省略時は設定値）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 同義語グラフを表示
    Graph {
        /// 追加の商品名⇔一般名シード（JSON）
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// OCRトークンキャッシュの情報を表示
    Cache {
        /// キャッシュファイル（省略時は設定値）
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 候補数を設定
        #[arg(long)]
        set_top_k: Option<usize>,

        /// 類似度の下限を設定
        #[arg(long)]
        set_threshold: Option<f64>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Excel,
    Both,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "both" => Ok(ExportFormat::Both),
            _ => Err(format!("Unknown format: {}. Use csv, excel, or both", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("xlsx".parse::<ExportFormat>(), Ok(ExportFormat::Excel));
        assert_eq!("both".parse::<ExportFormat>(), Ok(ExportFormat::Both));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_parse_evaluate_flags() {
        let cli = Cli::parse_from([
            "drug-ocr", "evaluate", "--format", "both", "--top-k", "5", "--no-graph", "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Evaluate { format, top_k, no_graph, .. } => {
                assert_eq!(format, ExportFormat::Both);
                assert_eq!(top_k, Some(5));
                assert!(no_graph);
            }
            _ => panic!("evaluate expected"),
        }
    }

    #[test]
    fn test_parse_predict_repeated_labels() {
        let cli = Cli::parse_from([
            "drug-ocr", "predict", "acetycstin", "200mg", "-l", "Acetin", "-l", "Acetylcysteine",
        ]);
        match cli.command {
            Commands::Predict { tokens, labels, .. } => {
                assert_eq!(tokens, vec!["acetycstin", "200mg"]);
                assert_eq!(labels, vec!["Acetin", "Acetylcysteine"]);
            }
            _ => panic!("predict expected"),
        }
    }
}
