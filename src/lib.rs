pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod ocr_cache;
pub mod pipeline;
pub mod report;
pub mod scanner;
