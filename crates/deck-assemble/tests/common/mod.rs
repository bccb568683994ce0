//! In-memory template decks for integration tests

#![allow(dead_code)]

use deck_assemble::layout::Rect;
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::{Cursor, Write};
use zip::write::{SimpleFileOptions, ZipWriter};

pub const SLIDE_WIDTH: i64 = 9_144_000;
pub const SLIDE_HEIGHT: i64 = 6_858_000;

pub enum ShapeSpec {
    Text { text: String, rect: Option<Rect> },
    Picture { rect: Rect },
    Group { children: Vec<ShapeSpec> },
    /// `p:ph` text shape taking its frame from the layout
    Placeholder { text: String, ph_type: String, idx: u32 },
}

/// A placeholder of the slide layout or master
pub struct LayoutPlaceholder {
    pub ph_type: &'static str,
    pub idx: u32,
    pub rect: Option<Rect>,
}

/// Placeholders of the single layout and master every slide uses
#[derive(Default)]
pub struct Layout {
    pub layout: Vec<LayoutPlaceholder>,
    pub master: Vec<LayoutPlaceholder>,
}

impl ShapeSpec {
    pub fn text(text: &str, rect: Rect) -> Self {
        ShapeSpec::Text {
            text: text.to_string(),
            rect: Some(rect),
        }
    }

    pub fn text_without_frame(text: &str) -> Self {
        ShapeSpec::Text {
            text: text.to_string(),
            rect: None,
        }
    }

    pub fn picture(rect: Rect) -> Self {
        ShapeSpec::Picture { rect }
    }

    pub fn placeholder(text: &str, ph_type: &str, idx: u32) -> Self {
        ShapeSpec::Placeholder {
            text: text.to_string(),
            ph_type: ph_type.to_string(),
            idx,
        }
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

/// Build a minimal presentation with one slide per entry
pub fn build_deck(slides: Vec<Vec<ShapeSpec>>) -> Vec<u8> {
    build_deck_with_layout(slides, None)
}

/// Like [`build_deck`], with every slide related to one layout and master
pub fn build_deck_with_layout(slides: Vec<Vec<ShapeSpec>>, layout: Option<Layout>) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let mut put = |name: &str, data: &[u8]| {
        writer.start_file(name, options).unwrap();
        writer.write_all(data).unwrap();
    };

    let mut overrides = String::new();
    for i in 1..=slides.len() {
        overrides.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));
    }
    put(
        "[Content_Types].xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{overrides}</Types>"#
        )
        .as_bytes(),
    );

    put(
        "_rels/.rels",
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#,
    );

    let mut ids = String::new();
    let mut rels = String::new();
    for i in 1..=slides.len() {
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{i}"/>"#, 255 + i));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{i}.xml"/>"#
        ));
    }
    put(
        "ppt/presentation.xml",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/></p:presentation>"#
        )
        .as_bytes(),
    );
    put(
        "ppt/_rels/presentation.xml.rels",
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
        )
        .as_bytes(),
    );

    let existing = png_bytes(10, 10);
    let mut has_media = false;
    for (i, shapes) in slides.iter().enumerate() {
        let mut next_id = 2;
        let mut body = String::new();
        let mut uses_picture = false;
        for shape in shapes {
            body.push_str(&shape_xml(shape, &mut next_id, &mut uses_picture));
        }
        put(
            &format!("ppt/slides/slide{}.xml", i + 1),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{body}</p:spTree></p:cSld></p:sld>"#
            )
            .as_bytes(),
        );
        let mut slide_rels = String::new();
        if uses_picture {
            has_media = true;
            slide_rels.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/existing.png"/>"#);
        }
        if layout.is_some() {
            slide_rels.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>"#);
        }
        if !slide_rels.is_empty() {
            put(
                &format!("ppt/slides/_rels/slide{}.xml.rels", i + 1),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{slide_rels}</Relationships>"#
                )
                .as_bytes(),
            );
        }
    }
    if has_media {
        put("ppt/media/existing.png", &existing);
    }

    if let Some(layout) = &layout {
        put(
            "ppt/slideLayouts/slideLayout1.xml",
            placeholder_part("sldLayout", &layout.layout).as_bytes(),
        );
        put(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/></Relationships>"#,
        );
        put(
            "ppt/slideMasters/slideMaster1.xml",
            placeholder_part("sldMaster", &layout.master).as_bytes(),
        );
    }

    writer.finish().unwrap().into_inner()
}

fn placeholder_part(root: &str, placeholders: &[LayoutPlaceholder]) -> String {
    let shapes: String = placeholders
        .iter()
        .enumerate()
        .map(|(i, ph)| {
            let frame = ph.rect.as_ref().map(xfrm).unwrap_or_default();
            format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr/><p:nvPr><p:ph type="{}" idx="{}"/></p:nvPr></p:nvSpPr><p:spPr>{frame}</p:spPr></p:sp>"#,
                i + 2,
                ph.ph_type,
                ph.idx,
                ph.ph_type,
                ph.idx
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:{root} xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:{root}>"#
    )
}

fn xfrm(rect: &Rect) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        rect.x, rect.y, rect.width, rect.height
    )
}

fn shape_xml(shape: &ShapeSpec, next_id: &mut u32, uses_picture: &mut bool) -> String {
    let id = *next_id;
    *next_id += 1;
    match shape {
        ShapeSpec::Text { text, rect } => {
            let frame = rect.as_ref().map(xfrm).unwrap_or_default();
            format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr>{frame}</p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                escape(text)
            )
        }
        ShapeSpec::Picture { rect } => {
            *uses_picture = true;
            format!(
                r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Existing {id}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId1"/></p:blipFill><p:spPr>{}</p:spPr></p:pic>"#,
                xfrm(rect)
            )
        }
        ShapeSpec::Placeholder { text, ph_type, idx } => format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Placeholder {id}"/><p:cNvSpPr/><p:nvPr><p:ph type="{ph_type}" idx="{idx}"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
            escape(text)
        ),
        ShapeSpec::Group { children } => {
            let inner: String = children
                .iter()
                .map(|c| shape_xml(c, next_id, uses_picture))
                .collect();
            format!(
                r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="{id}" name="Group {id}"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/><a:chOff x="0" y="0"/><a:chExt cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/></a:xfrm></p:grpSpPr>{inner}</p:grpSp>"#
            )
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
