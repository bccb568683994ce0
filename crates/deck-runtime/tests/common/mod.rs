//! Collaborators and fixtures for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use deck_assemble::{LabelMap, LocalImageLoader};
use deck_intake::{AssetRef, AssetSource, Event, FieldRule, FormMapping, IntakeError};
use deck_runtime::*;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{Value, json};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use zip::write::{SimpleFileOptions, ZipWriter};

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([30, 90, 60])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// Presentation with one slide per entry, each text in its own framed box
pub fn template(slides: &[&[&str]]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut put = |name: &str, data: &[u8]| {
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    };
    let ns = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
    let rel = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    put(
        "[Content_Types].xml",
        br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#,
    );
    put(
        "_rels/.rels",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{rel}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
        )
        .as_bytes(),
    );

    let mut ids = String::new();
    let mut rels = String::new();
    for i in 1..=slides.len() {
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{i}"/>"#, 255 + i));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="{rel}/slide" Target="slides/slide{i}.xml"/>"#
        ));
    }
    put(
        "ppt/presentation.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation {ns}><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#
        )
        .as_bytes(),
    );
    put(
        "ppt/_rels/presentation.xml.rels",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        )
        .as_bytes(),
    );

    for (i, texts) in slides.iter().enumerate() {
        let shapes: String = texts
            .iter()
            .enumerate()
            .map(|(n, text)| {
                let id = n + 2;
                let y = 1_000_000 * n;
                format!(
                    r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Box {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="500000" y="{y}"/><a:ext cx="4000000" cy="3000000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
                )
            })
            .collect();
        put(
            &format!("ppt/slides/slide{}.xml", i + 1),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><p:sld {ns}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
            )
            .as_bytes(),
        );
    }

    writer.finish().unwrap().into_inner()
}

pub fn event(item_id: u64, columns: Value) -> Event {
    serde_json::from_value(json!({"pulseId": item_id, "columnValues": columns})).unwrap()
}

/// Event with a city, a client address and one uploaded floor plan
pub fn client_event(item_id: u64) -> Event {
    event(
        item_id,
        json!({
            "text8": {"value": "Lisbon"},
            "email": {"email": "client@example.test", "text": "client@example.test"},
            "files": {"files": [{"assetId": 11, "name": "plan.png"}]}
        }),
    )
}

/// Service configuration around a template written into `dir`
pub fn config_in(dir: &Path, slides: &[&[&str]]) -> ServiceConfig {
    let template_path = dir.join("template.pptx");
    std::fs::write(&template_path, template(slides)).unwrap();

    let mut config = ServiceConfig::default();
    config.assembly.template_path = template_path;
    config.assembly.styles_dir = None;
    config.intake.form = FormMapping {
        rules: vec![FieldRule::new("City", "text8", deck_intake::Extractor::Value)],
        style_columns: Vec::new(),
        style_label: None,
        email_column: "email".to_string(),
    };
    config.ledger_path = dir.join("ledger.txt");
    config
}

// ============================================================================
// Collaborators
// ============================================================================

/// Serves every asset as a small PNG and counts downloads
#[derive(Default)]
pub struct FakeSource {
    pub downloads: Mutex<usize>,
    pub profile: LabelMap,
}

impl FakeSource {
    pub fn downloads(&self) -> usize {
        *self.downloads.lock().unwrap()
    }
}

#[async_trait]
impl AssetSource for FakeSource {
    async fn public_url(&self, _asset: &AssetRef) -> deck_intake::Result<Option<String>> {
        Ok(None)
    }

    async fn download(&self, asset: &AssetRef) -> deck_intake::Result<Vec<u8>> {
        *self.downloads.lock().unwrap() += 1;
        if asset.id.is_empty() {
            return Err(IntakeError::Platform("no id".into()));
        }
        Ok(png_bytes(40, 20))
    }

    async fn profile(&self, _email: &str) -> deck_intake::Result<LabelMap> {
        Ok(self.profile.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub attachments: Vec<PathBuf>,
    /// Attachment bytes as they were when the message went out
    pub contents: Vec<Vec<u8>>,
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        _body: &str,
        attachments: &[PathBuf],
    ) -> Result<()> {
        if self.fail {
            return Err(RuntimeError::Mail("connection refused".into()));
        }
        let contents = attachments
            .iter()
            .map(|path| std::fs::read(path).unwrap())
            .collect();
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            attachments: attachments.to_vec(),
            contents,
        });
        Ok(())
    }
}

pub struct Harness {
    pub pipeline: Arc<Pipeline>,
    pub source: Arc<FakeSource>,
    pub mailer: Arc<RecordingMailer>,
    pub store: Arc<MemoryStore>,
}

pub fn harness(config: ServiceConfig, source: FakeSource, mailer: RecordingMailer) -> Harness {
    let source = Arc::new(source);
    let mailer = Arc::new(mailer);
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(
        config,
        source.clone(),
        Arc::new(LocalImageLoader),
        mailer.clone(),
        Ledger::shared(store.clone()),
    );
    Harness {
        pipeline: Arc::new(pipeline),
        source,
        mailer,
        store,
    }
}
