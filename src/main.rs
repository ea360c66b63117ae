use clap::Parser;
use drug_ocr::{cli, config, dataset, error, export, ocr_cache, pipeline, report, scanner};
use cli::{Cli, Commands};
use config::Config;
use dataset::GroundTruth;
use drug_ocr_common::{LabelMatcher, LabelVocabulary};
use error::{DrugOcrError, Result};
use ocr_cache::TokenCache;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Evaluate {
            dataset,
            cache,
            output,
            format,
            top_k,
            threshold,
            no_graph,
            graph_seed,
            summary_json,
            show_rows,
        } => {
            println!("💊 drug-ocr - 照合・評価\n");
            let options = config.matcher_options(top_k, threshold)?;

            // 1. OCRキャッシュ
            let cache_path = cache.unwrap_or_else(|| config.cache_path.clone());
            println!("[1/4] OCRキャッシュを読み込み中... {}", cache_path.display());
            let token_cache = TokenCache::load(&cache_path)?;
            let lookup = token_cache.lookup();
            println!("✔ {}件のOCR結果 / {}件の注釈画像\n", token_cache.len(), token_cache.images.len());

            // 2. 正解データ
            let dataset_path = dataset.unwrap_or_else(|| config.dataset_path.clone());
            println!("[2/4] 正解データを読み込み中... {}", dataset_path.display());
            let truth = GroundTruth::load(&dataset_path)?;
            let vocabulary = truth.vocabulary();
            if vocabulary.is_empty() {
                return Err(DrugOcrError::NoLabels(dataset_path.display().to_string()));
            }
            println!("✔ {}件の画像 / {}種類のラベル\n", truth.len(), vocabulary.len());

            let graph = if no_graph {
                None
            } else {
                let graph = pipeline::build_graph(&config, graph_seed.as_deref())?;
                println!("{}\n", graph.summary());
                Some(graph)
            };

            // 3. 照合
            println!("[3/4] 照合中... (top_k: {}, 閾値: {})", options.top_k, options.conflict_threshold);
            let matcher = LabelMatcher::new(&vocabulary, graph.as_ref(), options);
            let outcome = pipeline::run_batch(&truth.rows, &lookup, &matcher, !show_rows);
            println!(
                "✔ 照合完了（キャッシュあり: {} / なし: {}）\n",
                outcome.cache_hits, outcome.cache_misses
            );

            if show_rows {
                println!("{}", report::row_header());
                for (idx, result) in outcome.results.iter().enumerate() {
                    println!("{}", report::format_row(idx + 1, result));
                }
                println!();
            }

            // 4. 評価・出力
            println!("[4/4] 評価・出力中...");
            let summary = pipeline::evaluate_results(&outcome.results);
            let output_path = output.unwrap_or_else(|| config.output_path.clone());
            export::export_results(&outcome.results, &summary, &format, &output_path)?;
            if let Some(path) = summary_json {
                export::write_summary_json(&summary, &path)?;
                println!("✔ サマリーJSON: {}", path.display());
            }

            println!("\n{}", report::format_summary(&summary, Some(&output_path)));
            println!("\n✅ 評価完了");
        }

        Commands::Predict {
            tokens,
            labels,
            dataset,
            top_k,
            threshold,
            no_graph,
        } => {
            let options = config.matcher_options(top_k, threshold)?;

            let mut candidates = labels;
            if let Some(path) = dataset {
                let truth = GroundTruth::load(&path)?;
                candidates.extend(truth.rows.into_iter().map(|r| r.label));
            }
            let vocabulary = LabelVocabulary::from_labels(candidates);
            if vocabulary.is_empty() {
                return Err(DrugOcrError::NoLabels(
                    "--label または --dataset で候補ラベルを指定してください".into(),
                ));
            }

            let graph = if no_graph {
                None
            } else {
                Some(pipeline::build_graph(&config, None)?)
            };
            let matcher = LabelMatcher::new(&vocabulary, graph.as_ref(), options);

            println!("候補（上位{}件）:", options.top_k);
            for scored in matcher.rank(&tokens).iter().take(options.top_k) {
                println!("  {:<20} {:.4}", scored.label, scored.score);
            }

            let prediction = matcher.predict(&tokens);
            println!(
                "\n予測: {} (score: {}, {})",
                prediction.label, prediction.score, prediction.resolution
            );
        }

        Commands::Dataset { folder, output } => {
            println!("📂 drug-ocr - 正解データ生成\n");

            println!("[1/2] 画像をスキャン中...");
            let images = scanner::scan_drug_folders(&folder)?;
            if images.is_empty() {
                return Err(DrugOcrError::InvalidDataset(format!(
                    "画像が見つかりません: {}",
                    folder.display()
                )));
            }
            println!("✔ {}枚の画像を検出\n", images.len());

            println!("[2/2] CSVを保存中...");
            let output_path = output.unwrap_or_else(|| config.dataset_path.clone());
            let rows = scanner::to_ground_truth(&images);
            dataset::write_dataset_csv(&rows, &output_path)?;
            println!("✔ 正解データを保存: {}", output_path.display());

            println!("\n✅ 完了");
        }

        Commands::Graph { seed } => {
            let graph = pipeline::build_graph(&config, seed.as_deref())?;
            println!("{}", graph.summary());
        }

        Commands::Cache { path } => {
            let cache_path = path.unwrap_or_else(|| config.cache_path.clone());
            if !cache_path.exists() {
                println!("キャッシュファイルが存在しません: {}", cache_path.display());
                return Ok(());
            }

            let cache = TokenCache::load(&cache_path)?;
            println!("キャッシュ情報:");
            println!("  パス: {}", cache_path.display());
            println!("  OCR結果: {}件", cache.len());
            println!("  注釈画像: {}件", cache.images.len());
            println!("  トークン総数: {}", cache.token_count());
            println!("  トークンなし: {}件", cache.empty_entries());
            if let Ok(meta) = std::fs::metadata(&cache_path) {
                println!("  サイズ: {} bytes", meta.len());
            }
        }

        Commands::Config {
            show,
            set_top_k,
            set_threshold,
        } => {
            let mut config = config;

            if let Some(top_k) = set_top_k {
                config.set_top_k(top_k)?;
                println!("✔ top_k を {} に設定しました", top_k);
            }

            if let Some(threshold) = set_threshold {
                config.set_conflict_threshold(threshold)?;
                println!("✔ 閾値を {} に設定しました", threshold);
            }

            if show {
                println!("設定:");
                println!("  top_k: {}", config.top_k);
                println!("  閾値: {}", config.conflict_threshold);
                println!("  正解データ: {}", config.dataset_path.display());
                println!("  OCRキャッシュ: {}", config.cache_path.display());
                println!("  出力: {}", config.output_path.display());
                match &config.graph_seed {
                    Some(path) => println!("  追加シード: {}", path.display()),
                    None => println!("  追加シード: 未設定"),
                }
            }
        }
    }

    Ok(())
}
