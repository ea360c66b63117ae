//! OCRトークンキャッシュのテスト

use drug_ocr::ocr_cache::TokenCache;
use tempfile::tempdir;

/// 保存と読み込み
#[test]
fn test_cache_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("output").join("ocr_results.json");

    let mut cache = TokenCache::default();
    cache.insert(
        "\\Acetin\\image_1.jpg",
        vec!["ACETIN".to_string(), "Acetylcysteine 200 mg".to_string()],
    );
    cache.images.insert(
        "\\Acetin\\image_1.jpg".to_string(),
        "output/Acetin/result_image_1.jpg".to_string(),
    );
    cache.save(&path).expect("キャッシュ保存失敗");

    let loaded = TokenCache::load(&path).expect("キャッシュ読み込み失敗");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.images.len(), 1);
    assert_eq!(loaded.token_count(), 2);
}

/// 外部OCRが書いた形式をそのまま読める
#[test]
fn test_cache_external_format() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("ocr_results.json");
    std::fs::write(
        &path,
        r#"{
            "images": {},
            "sentences": {
                "\\Acetin\\image_1.jpg": ["ACETIN"],
                "\\Acepress\\image_2.jpg": []
            }
        }"#,
    )
    .unwrap();

    let cache = TokenCache::load(&path).expect("キャッシュ読み込み失敗");
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.empty_entries(), 1);

    let lookup = cache.lookup();
    assert_eq!(lookup.len(), 2);
    assert_eq!(lookup.get("/acetin/image_1.jpg").map(|t| t.len()), Some(1));
    assert_eq!(lookup.get("\\ACEPRESS\\IMAGE_2.JPG").map(|t| t.len()), Some(0));
    assert!(lookup.get("\\Acetin\\image_9.jpg").is_none());
}
