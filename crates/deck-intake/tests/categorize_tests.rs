mod common;

use common::*;
use deck_assemble::ImageSource;
use deck_intake::*;
use serde_json::{Value, json};

fn file(id: u64, name: &str) -> Value {
    json!({"assetId": id, "name": name})
}

fn event(columns: Value) -> Event {
    serde_json::from_value(json!({"pulseId": 99, "columnValues": columns})).unwrap()
}

fn names(images: &[ImageSource]) -> Vec<String> {
    images.iter().map(ImageSource::display_name).collect()
}

#[tokio::test]
async fn test_columns_map_to_categories() {
    let source = ScriptedSource::default()
        .file("1", png_bytes(4, 4))
        .file("2", pdf_with_images())
        .file("3", jpeg_bytes(4, 4));
    let event = event(json!({
        "files": {"files": [file(1, "floor.png"), file(2, "elevations.pdf")]},
        "files3": {"files": [file(3, "mood.jpg")]},
        "text8": {"value": "not a file column"}
    }));

    let options = IntakeOptions::default();
    let images = categorize(&event, &source, &options).await;

    assert_eq!(images.category_count(), 2);
    assert_eq!(
        names(images.get("Layout").unwrap()),
        vec!["floor.png", "elevations-p1-1.png", "elevations-p2-2.jpg"]
    );
    assert_eq!(names(images.get("inspiration").unwrap()), vec!["mood.jpg"]);
    assert!(images.get("Elevation").is_none());
}

#[tokio::test]
async fn test_stable_links_skip_the_download() {
    let source = ScriptedSource::default()
        .link("1", "https://bucket.s3.amazonaws.com/floor.png")
        .link("2", "https://bucket.s3.amazonaws.com/plans.pdf")
        .file("2", pdf_with_images())
        .link("3", "https://cdn.example.test/photo.png")
        .file("3", png_bytes(2, 2));
    let event = event(json!({
        "files": {"files": [file(1, "floor.png"), file(2, "plans.pdf"), file(3, "photo.png")]}
    }));

    let options = IntakeOptions::default();
    let images = categorize(&event, &source, &options).await;
    let layout = images.get("Layout").unwrap();

    assert_eq!(
        layout[0],
        ImageSource::Url("https://bucket.s3.amazonaws.com/floor.png".into())
    );
    // Containers are always downloaded and extracted; unstable links are not trusted
    assert_eq!(source.downloaded(), vec!["2", "3"]);
    assert_eq!(layout.len(), 4);
    assert_eq!(layout[3].display_name(), "photo.png");
}

#[tokio::test]
async fn test_order_survives_uneven_fetch_times() {
    let source = ScriptedSource::default()
        .file("1", png_bytes(1, 1))
        .delay("1", 60)
        .file("2", png_bytes(2, 2))
        .file("3", png_bytes(3, 3))
        .delay("3", 20);
    let event = event(json!({
        "fileh7us51cr": {"files": [file(1, "a.png"), file(2, "b.png"), file(3, "c.png")]}
    }));

    let options = IntakeOptions::default();
    let images = categorize(&event, &source, &options).await;

    assert_eq!(names(images.get("Image").unwrap()), vec!["a.png", "b.png", "c.png"]);
}

#[tokio::test]
async fn test_failing_asset_does_not_stop_the_column() {
    let source = ScriptedSource::default()
        .failing("1")
        .file("2", b"%PDF-garbage".to_vec())
        .file("3", png_bytes(2, 2));
    let event = event(json!({
        "files": {"files": [file(1, "gone.png"), file(2, "broken.pdf"), file(3, "ok.png"), file(4, "movie.mov")]},
        "fileb3p8t108": {"files": [file(5, "missing.png")]}
    }));

    let options = IntakeOptions::default();
    let images = categorize(&event, &source, &options).await;

    assert_eq!(names(images.get("Layout").unwrap()), vec!["ok.png"]);
    // Column whose only asset failed is left out entirely
    assert!(images.get("Elevation").is_none());
    // Unsupported types are never fetched
    assert!(!source.downloaded().contains(&"4".to_string()));
}

#[tokio::test]
async fn test_scratch_dir_holds_downloaded_images() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::default().file("7", png_bytes(2, 2));
    let event = event(json!({"files": {"files": [file(7, "plan.png")]}}));

    let options = IntakeOptions::default();
    let images = Categorizer::new(&source, &options)
        .with_scratch_dir(dir.path())
        .categorize(&event)
        .await;

    let expected = dir.path().join("asset_7.png");
    assert_eq!(images.get("Layout").unwrap(), &[ImageSource::Path(expected.clone())]);
    assert_eq!(std::fs::read(expected).unwrap(), png_bytes(2, 2));
}

#[tokio::test]
async fn test_profile_default_is_empty() {
    struct Bare;

    #[async_trait::async_trait]
    impl AssetSource for Bare {
        async fn public_url(&self, _: &AssetRef) -> Result<Option<String>> {
            Ok(None)
        }
        async fn download(&self, asset: &AssetRef) -> Result<Vec<u8>> {
            Err(IntakeError::Platform(asset.id.clone()))
        }
    }

    assert!(Bare.profile("a@b.test").await.unwrap().is_empty());
}
