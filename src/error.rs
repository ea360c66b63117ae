use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrugOcrError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("データセットが不正: {0}")]
    InvalidDataset(String),

    #[error("トークンキャッシュが不正: {0}")]
    InvalidCache(String),

    #[error("ラベルがありません: {0}")]
    NoLabels(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("CSVエラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel読み込みエラー: {0}")]
    ExcelRead(String),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error(transparent)]
    Common(#[from] drug_ocr_common::Error),
}

pub type Result<T> = std::result::Result<T, DrugOcrError>;
