//! Raster images out of uploaded containers
//!
//! PDF: every image XObject reachable from a page, in page order.
//! DOCX: every image relationship of the main document part.
//! ZIP: entries in archive order; images kept, containers re-extracted.

use crate::types::*;
use deck_assemble::ImageSource;
use deck_assemble::package::{Package, read_capped};
use deck_assemble::package::rels::resolve_target;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::io::Cursor;

// =============================================================================
// File kinds
// =============================================================================

/// What an upload is, judged by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Docx,
    Zip,
    Unsupported,
}

/// Limits and recognized types for one extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRules {
    pub image_extensions: Vec<String>,
    pub max_archive_depth: usize,
    /// Largest size one archive entry or DOCX part may inflate to
    pub max_entry_bytes: u64,
}

impl ExtractRules {
    pub fn kind_of(&self, ext: &str) -> FileKind {
        let ext = ext.to_ascii_lowercase();
        if self.image_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
            return FileKind::Image;
        }
        match ext.as_str() {
            "pdf" => FileKind::Pdf,
            "docx" => FileKind::Docx,
            "zip" => FileKind::Zip,
            _ => FileKind::Unsupported,
        }
    }
}

/// Images contained in `bytes`, an upload called `name`.
///
/// An image upload is returned as it is. Unsupported kinds yield nothing.
pub fn extract_images(name: &str, bytes: Vec<u8>, rules: &ExtractRules) -> Result<Vec<ImageSource>> {
    extract_at_depth(name, bytes, rules, 0)
}

/// [`extract_images`] on the blocking pool
pub async fn extract_images_blocking(
    name: String,
    bytes: Vec<u8>,
    rules: ExtractRules,
) -> Result<Vec<ImageSource>> {
    tokio::task::spawn_blocking(move || extract_images(&name, bytes, &rules)).await?
}

fn extract_at_depth(
    name: &str,
    bytes: Vec<u8>,
    rules: &ExtractRules,
    depth: usize,
) -> Result<Vec<ImageSource>> {
    match rules.kind_of(&extension_of(name)) {
        FileKind::Image => Ok(vec![ImageSource::bytes(name, bytes)]),
        FileKind::Pdf => pdf_images(&bytes, name),
        FileKind::Docx => docx_images(&bytes, name, rules),
        FileKind::Zip => zip_images(&bytes, rules, depth),
        FileKind::Unsupported => {
            log::warn!("unsupported file type: {name}");
            Ok(Vec::new())
        }
    }
}

fn stem(name: &str) -> &str {
    let file = name.rsplit('/').next().unwrap_or(name);
    file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file)
}

// =============================================================================
// PDF
// =============================================================================

/// Image XObjects of every page, each extracted once
pub fn pdf_images(bytes: &[u8], name: &str) -> Result<Vec<ImageSource>> {
    let doc = Document::load_mem(bytes)?;
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut images = Vec::new();

    for (page_no, page_id) in doc.get_pages() {
        let Some(xobjects) = page_xobjects(&doc, page_id) else {
            continue;
        };
        for (_, obj) in xobjects.iter() {
            let Ok(id) = obj.as_reference() else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            let Ok(stream) = doc.get_object(id).and_then(|o| o.as_stream()) else {
                continue;
            };
            if !is_image(stream) {
                continue;
            }
            match encode_pdf_image(&doc, stream) {
                Ok(Some((data, ext))) => {
                    let file = format!("{}-p{}-{}.{}", stem(name), page_no, images.len() + 1, ext);
                    images.push(ImageSource::bytes(file, data));
                }
                Ok(None) => log::debug!("skipping undecodable image {id:?} in {name}"),
                Err(e) => log::warn!("failed to read image {id:?} in {name}: {e}"),
            }
        }
    }

    log::debug!("{} images in {name}", images.len());
    Ok(images)
}

/// The XObject dictionary of a page, inherited from its ancestors if needed
fn page_xobjects(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound only guards against cycles
    for _ in 0..32 {
        if let Ok(resources) = node.get(b"Resources") {
            let (_, resources) = doc.dereference(resources).ok()?;
            let xobjects = resources.as_dict().ok()?.get(b"XObject").ok()?;
            let (_, xobjects) = doc.dereference(xobjects).ok()?;
            return xobjects.as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn is_image(stream: &Stream) -> bool {
    stream
        .dict
        .get(b"Subtype")
        .and_then(|o| o.as_name())
        .is_ok_and(|n| n == b"Image")
}

fn filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Encoded file bytes and extension, `None` for encodings we cannot turn
/// into a raster file
fn encode_pdf_image(doc: &Document, stream: &Stream) -> Result<Option<(Vec<u8>, &'static str)>> {
    let filters = filters(&stream.dict);
    match filters.iter().map(Vec::as_slice).collect::<Vec<_>>().as_slice() {
        // Baseline JPEG, stored as a complete file
        [b"DCTDecode"] => return Ok(Some((stream.content.clone(), "jpg"))),
        chain
            if chain.iter().any(|name| {
                matches!(*name, b"DCTDecode" | b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode")
            }) =>
        {
            return Ok(None);
        }
        _ => {}
    }

    let dict = &stream.dict;
    let (Some(width), Some(height)) = (dimension(dict, b"Width"), dimension(dict, b"Height")) else {
        return Ok(None);
    };
    if dimension(dict, b"BitsPerComponent") != Some(8) || width == 0 || height == 0 {
        return Ok(None);
    }
    let Some(components) = color_components(doc, dict) else {
        return Ok(None);
    };

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content()?
    };
    let needed = width as usize * height as usize * components;
    if samples.len() < needed {
        log::debug!("image stream holds {} of {needed} bytes", samples.len());
        return Ok(None);
    }
    let samples = &samples[..needed];

    let image = match components {
        1 => GrayImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples.to_vec()).map(DynamicImage::ImageRgb8),
        4 => RgbImage::from_raw(width, height, cmyk_to_rgb(samples)).map(DynamicImage::ImageRgb8),
        _ => None,
    };
    let Some(image) = image else {
        return Ok(None);
    };

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(Some((png, "png")))
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key).ok()?.as_i64().ok().and_then(|v| u32::try_from(v).ok())
}

fn color_components(doc: &Document, dict: &Dictionary) -> Option<usize> {
    let (_, space) = doc.dereference(dict.get(b"ColorSpace").ok()?).ok()?;
    match space {
        Object::Name(name) => device_components(name),
        Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let (_, profile) = doc.dereference(items.get(1)?).ok()?;
                    let n = profile.as_stream().ok()?.dict.get(b"N").ok()?.as_i64().ok()?;
                    usize::try_from(n).ok()
                }
                b"CalRGB" => Some(3),
                b"CalGray" => Some(1),
                _ => None,
            }
        }
        _ => None,
    }
}

fn device_components(name: &[u8]) -> Option<usize> {
    match name {
        b"DeviceGray" | b"CalGray" => Some(1),
        b"DeviceRGB" | b"CalRGB" => Some(3),
        b"DeviceCMYK" => Some(4),
        _ => None,
    }
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u32;
            [0, 1, 2].map(|i| ((255 - px[i] as u32) * k / 255) as u8)
        })
        .collect()
}

// =============================================================================
// DOCX
// =============================================================================

const DOCX_MAIN_PART: &str = "word/document.xml";

/// Raster parts linked from the main document, in relationship order
pub fn docx_images(bytes: &[u8], name: &str, rules: &ExtractRules) -> Result<Vec<ImageSource>> {
    let package = Package::from_bytes_limited(bytes, rules.max_entry_bytes)?;
    let main_part = package
        .relationships("")?
        .of_type("officeDocument")
        .next()
        .map(|rel| resolve_target("", &rel.target))
        .unwrap_or_else(|| DOCX_MAIN_PART.to_string());

    let mut seen = HashSet::new();
    let mut images = Vec::new();
    for rel in package.relationships(&main_part)?.of_type("image") {
        if rel.external {
            continue;
        }
        let part = resolve_target(&main_part, &rel.target);
        if !seen.insert(part.clone()) {
            continue;
        }
        match package.part(&part) {
            Some(data) if image::guess_format(data).is_ok() => {
                let file = format!("{}-{}", stem(name), part.rsplit('/').next().unwrap_or(&part));
                images.push(ImageSource::bytes(file, data.to_vec()));
            }
            Some(_) => log::debug!("skipping non-raster {part} in {name}"),
            None => log::warn!("{name} links missing part {part}"),
        }
    }

    log::debug!("{} images in {name}", images.len());
    Ok(images)
}

// =============================================================================
// ZIP
// =============================================================================

/// Images in archive order; nested containers are extracted in place
fn zip_images(bytes: &[u8], rules: &ExtractRules, depth: usize) -> Result<Vec<ImageSource>> {
    if depth >= rules.max_archive_depth {
        log::warn!("archive nesting deeper than {}, skipping", rules.max_archive_depth);
        return Ok(Vec::new());
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut images = Vec::new();

    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(IntakeError::from).and_then(|mut file| {
            if file.is_dir() {
                return Ok(None);
            }
            let name = file.name().to_string();
            if is_archive_noise(&name) || rules.kind_of(&extension_of(&name)) == FileKind::Unsupported {
                log::debug!("skipping archive entry {name}");
                return Ok(None);
            }
            let declared = file.size();
            match read_capped(&mut file, declared, rules.max_entry_bytes)? {
                Some(data) => Ok(Some((name, data))),
                None => {
                    log::warn!("skipping {name}: inflates past {} bytes", rules.max_entry_bytes);
                    Ok(None)
                }
            }
        });

        match entry {
            Ok(Some((name, data))) => match extract_at_depth(&name, data, rules, depth + 1) {
                Ok(found) => images.extend(found),
                Err(e) => log::warn!("failed to extract {name}: {e}"),
            },
            Ok(None) => {}
            Err(e) => log::warn!("unreadable archive entry {index}: {e}"),
        }
    }

    Ok(images)
}

/// Metadata that archivers add next to real files
fn is_archive_noise(name: &str) -> bool {
    name.starts_with("__MACOSX/")
        || name
            .rsplit('/')
            .next()
            .is_some_and(|file| file.starts_with("._") || file == ".DS_Store")
}
