//! Upload fixtures and a scripted asset source

#![allow(dead_code)]

use async_trait::async_trait;
use deck_intake::*;
use image::{DynamicImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::time::Duration;
use zip::write::{SimpleFileOptions, ZipWriter};

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

fn image_stream(width: i64, height: i64, filter: Option<&str>, data: Vec<u8>) -> Stream {
    let mut dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width)),
        ("Height", Object::Integer(height)),
        ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ]);
    if let Some(filter) = filter {
        dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    }
    Stream::new(dict, data)
}

/// Two pages: a raw 2x1 RGB image, then a JPEG plus the same RGB image again
pub fn pdf_with_images() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let raw_id = doc.add_object(image_stream(2, 1, None, vec![255, 0, 0, 0, 255, 0]));
    let jpeg_id = doc.add_object(image_stream(8, 8, Some("DCTDecode"), jpeg_bytes(8, 8)));

    let page = |doc: &mut Document, images: Vec<(&str, ObjectId)>| {
        let xobjects = Dictionary::from_iter(
            images
                .into_iter()
                .map(|(name, id)| (name, Object::Reference(id))),
        );
        let resources = Dictionary::from_iter(vec![("XObject", Object::Dictionary(xobjects))]);
        doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Resources", Object::Dictionary(resources)),
        ]))
    };
    let first = page(&mut doc, vec![("Im1", raw_id)]);
    let second = page(&mut doc, vec![("Im1", jpeg_id), ("Im2", raw_id)]);

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        (
            "Kids",
            Object::Array(vec![Object::Reference(first), Object::Reference(second)]),
        ),
        ("Count", Object::Integer(2)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn zip_of(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A document linking one PNG, one EMF and one external picture
pub fn docx_with_images() -> Vec<u8> {
    let rel = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    zip_of(&[
        (
            "_rels/.rels",
            format!(
                r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{rel}/officeDocument" Target="word/document.xml"/></Relationships>"#
            )
            .into_bytes(),
        ),
        ("word/document.xml", b"<w:document/>".to_vec()),
        (
            "word/_rels/document.xml.rels",
            format!(
                r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{rel}/styles" Target="styles.xml"/><Relationship Id="rId2" Type="{rel}/image" Target="media/image1.png"/><Relationship Id="rId3" Type="{rel}/image" Target="media/image2.emf"/><Relationship Id="rId4" Type="{rel}/image" Target="https://example.test/x.png" TargetMode="External"/></Relationships>"#
            )
            .into_bytes(),
        ),
        ("word/media/image1.png", png_bytes(3, 3)),
        ("word/media/image2.emf", b"not a raster".to_vec()),
    ])
}

/// Serves scripted bytes and links, recording what was asked for
#[derive(Default)]
pub struct ScriptedSource {
    pub files: HashMap<String, Vec<u8>>,
    pub links: HashMap<String, String>,
    pub delays: HashMap<String, u64>,
    pub failing: Vec<String>,
    pub downloads: Mutex<Vec<String>>,
    pub lookups: Mutex<Vec<String>>,
    pub profile: Option<deck_assemble::LabelMap>,
}

impl ScriptedSource {
    pub fn file(mut self, id: &str, data: Vec<u8>) -> Self {
        self.files.insert(id.to_string(), data);
        self
    }

    pub fn link(mut self, id: &str, url: &str) -> Self {
        self.links.insert(id.to_string(), url.to_string());
        self
    }

    pub fn delay(mut self, id: &str, millis: u64) -> Self {
        self.delays.insert(id.to_string(), millis);
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetSource for ScriptedSource {
    async fn public_url(&self, asset: &AssetRef) -> Result<Option<String>> {
        self.lookups.lock().unwrap().push(asset.id.clone());
        Ok(self.links.get(&asset.id).cloned())
    }

    async fn download(&self, asset: &AssetRef) -> Result<Vec<u8>> {
        if let Some(millis) = self.delays.get(&asset.id) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
        self.downloads.lock().unwrap().push(asset.id.clone());
        if self.failing.contains(&asset.id) {
            return Err(IntakeError::Platform(format!("404 for {}", asset.id)));
        }
        self.files
            .get(&asset.id)
            .cloned()
            .ok_or_else(|| IntakeError::Platform(format!("no file {}", asset.id)))
    }

    async fn profile(&self, _email: &str) -> Result<deck_assemble::LabelMap> {
        Ok(self.profile.clone().unwrap_or_default())
    }
}
