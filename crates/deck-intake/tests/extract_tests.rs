mod common;

use common::*;
use deck_assemble::ImageSource;
use deck_intake::extract::{docx_images, pdf_images};
use deck_intake::*;

fn rules() -> ExtractRules {
    ExtractRules {
        image_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
        max_archive_depth: 3,
        max_entry_bytes: 1 << 20,
    }
}

fn decoded_size(source: &ImageSource) -> (u32, u32) {
    let ImageSource::Bytes { data, .. } = source else {
        panic!("expected in-memory image, got {source:?}");
    };
    let img = image::load_from_memory(data).unwrap();
    (img.width(), img.height())
}

#[test]
fn test_pdf_images_in_page_order_once_each() {
    let images = pdf_images(&pdf_with_images(), "plan.pdf").unwrap();

    assert_eq!(images.len(), 2);
    assert_eq!(images[0].display_name(), "plan-p1-1.png");
    assert_eq!(decoded_size(&images[0]), (2, 1));
    assert_eq!(images[1].display_name(), "plan-p2-2.jpg");
    assert_eq!(decoded_size(&images[1]), (8, 8));
}

#[test]
fn test_corrupt_pdf_is_an_error() {
    assert!(pdf_images(b"%PDF-1.7 garbage", "bad.pdf").is_err());
}

#[test]
fn test_docx_keeps_only_embedded_rasters() {
    let images = docx_images(&docx_with_images(), "brief.docx", &rules()).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].display_name(), "brief-image1.png");
    assert_eq!(decoded_size(&images[0]), (3, 3));
}

#[test]
fn test_zip_recurses_into_containers() {
    let nested = zip_of(&[("deep/b.jpg", jpeg_bytes(4, 4))]);
    let archive = zip_of(&[
        ("a.png", png_bytes(5, 5)),
        ("__MACOSX/._a.png", b"junk".to_vec()),
        ("notes.txt", b"hello".to_vec()),
        ("inner/spec.docx", docx_with_images()),
        ("nested.zip", nested),
        ("broken.pdf", b"not a pdf".to_vec()),
    ]);

    let images = extract_images("uploads.zip", archive, &rules()).unwrap();
    let names: Vec<String> = images.iter().map(ImageSource::display_name).collect();
    assert_eq!(names, vec!["a.png", "spec-image1.png", "deep/b.jpg"]);
}

#[test]
fn test_zip_depth_is_bounded() {
    let mut archive = zip_of(&[("leaf.png", png_bytes(1, 1))]);
    for level in 0..4 {
        archive = zip_of(&[(format!("level{level}.zip").as_str(), archive)]);
    }

    let images = extract_images("deep.zip", archive.clone(), &rules()).unwrap();
    assert!(images.is_empty());

    let generous = ExtractRules {
        max_archive_depth: 10,
        ..rules()
    };
    assert_eq!(extract_images("deep.zip", archive, &generous).unwrap().len(), 1);
}

#[test]
fn test_oversized_entries_are_skipped() {
    let small = png_bytes(1, 1);
    let archive = zip_of(&[("big.png", png_bytes(512, 512)), ("small.png", small.clone())]);
    let tight = ExtractRules {
        max_entry_bytes: small.len() as u64,
        ..rules()
    };

    let images = extract_images("uploads.zip", archive, &tight).unwrap();
    let names: Vec<String> = images.iter().map(ImageSource::display_name).collect();
    assert_eq!(names, vec!["small.png"]);
}

#[test]
fn test_docx_part_over_the_limit_fails_the_upload() {
    let tight = ExtractRules {
        max_entry_bytes: 16,
        ..rules()
    };
    assert!(docx_images(&docx_with_images(), "brief.docx", &tight).is_err());
}
