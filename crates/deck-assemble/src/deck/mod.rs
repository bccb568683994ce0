//! The presentation as an ordered list of slides
//!
//! A [`Deck`] owns the package for the duration of one assembly run. Slides
//! are identified by their part name ([`SlideRef`]); positional indices are
//! only valid until the next deletion.

mod inherited;
mod io;
mod picture;
mod shape;
mod slide;

pub use io::{load_deck, save_deck};
pub use picture::PictureData;
pub use shape::{ShapeInfo, ShapeKind, ShapePath};
pub use slide::Slide;

use crate::constants::{DEFAULT_SLIDE_HEIGHT_EMU, DEFAULT_SLIDE_WIDTH_EMU};
use crate::layout::{Rect, SlideSize};
use crate::package::Package;
use crate::package::content_types::{CONTENT_TYPES_PART, ContentTypes, image_content_type};
use crate::package::rels::{
    REL_IMAGE, Relationships, rels_part_for, relative_target, resolve_target,
};
use crate::package::xml::{self, Element};
use crate::types::*;
use inherited::{FrameCache, inherited_frames};
use picture::{ensure_namespaces, picture_element};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct Deck {
    package: Package,
    content_types: ContentTypes,
    presentation_part: String,
    presentation: Element,
    presentation_rels: Relationships,
    slides: Vec<Slide>,
    slide_size: SlideSize,
    /// Media parts already written, keyed by content hash
    media: HashMap<u64, String>,
}

impl Deck {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let package = Package::from_bytes(bytes)?;
        let content_types = ContentTypes::parse(package.require(CONTENT_TYPES_PART)?)?;

        let root_rels = package.relationships("")?;
        let presentation_part = root_rels
            .of_type("officeDocument")
            .next()
            .map(|rel| resolve_target("", &rel.target))
            .ok_or_else(|| AssembleError::Package("no office document relationship".into()))?;

        let presentation = xml::parse(package.require(&presentation_part)?)?;
        let presentation_rels = package.relationships(&presentation_part)?;

        let slide_size = presentation
            .child("sldSz")
            .and_then(|sz| {
                Some(SlideSize {
                    width: sz.attr("cx")?.parse().ok()?,
                    height: sz.attr("cy")?.parse().ok()?,
                })
            })
            .filter(|sz| sz.width > 0 && sz.height > 0)
            .unwrap_or(SlideSize {
                width: DEFAULT_SLIDE_WIDTH_EMU,
                height: DEFAULT_SLIDE_HEIGHT_EMU,
            });

        let mut slides = Vec::new();
        let mut frames = FrameCache::new();
        for slide_id in presentation
            .child("sldIdLst")
            .into_iter()
            .flat_map(|list| list.elements().filter(|el| el.is("sldId")))
        {
            let rel_id = relationship_id(slide_id).ok_or_else(|| {
                AssembleError::Package("slide id entry without relationship id".into())
            })?;
            let rel = presentation_rels.get(rel_id).ok_or_else(|| {
                AssembleError::Package(format!("slide relationship {rel_id} is missing"))
            })?;
            let part_name = resolve_target(&presentation_part, &rel.target);
            let mut slide = Slide::parse(
                part_name.clone(),
                rel_id.to_string(),
                package.require(&part_name)?,
                package.relationships(&part_name)?,
            )?;
            slide.inherited = inherited_frames(&package, &part_name, &slide.rels, &mut frames);
            slides.push(slide);
        }

        log::debug!(
            "opened deck with {} slides ({}x{} EMU)",
            slides.len(),
            slide_size.width,
            slide_size.height
        );

        Ok(Self {
            package,
            content_types,
            presentation_part,
            presentation,
            presentation_rels,
            slides,
            slide_size,
            media: HashMap::new(),
        })
    }

    /// Serialize the deck, dropping every part no longer referenced
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        for slide in &self.slides {
            self.package
                .set_part(slide.part_name.clone(), xml::write(&slide.xml)?);
            let rels_part = rels_part_for(&slide.part_name);
            if !slide.rels.is_empty() || self.package.contains(&rels_part) {
                self.package.set_part(rels_part, slide.rels.to_xml()?);
            }
        }

        self.package.set_part(
            self.presentation_part.clone(),
            xml::write(&self.presentation)?,
        );
        self.package.set_part(
            rels_part_for(&self.presentation_part),
            self.presentation_rels.to_xml()?,
        );

        for removed in self.package.sweep_unreachable()? {
            self.content_types.remove_override(&removed);
        }
        self.package
            .set_part(CONTENT_TYPES_PART, self.content_types.to_xml()?);

        self.package.to_bytes()
    }

    pub fn slide_size(&self) -> SlideSize {
        self.slide_size
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn slide_mut(&mut self, index: usize) -> Option<&mut Slide> {
        self.slides.get_mut(index)
    }

    /// Current position of a slide, if it has not been deleted
    pub fn position_of(&self, slide: &SlideRef) -> Option<usize> {
        self.slides.iter().position(|s| s.part_name == slide.0)
    }

    /// Delete a slide: its slide-id entry, its relationship and its part
    pub fn delete_slide(&mut self, index: usize) -> Result<SlideRef> {
        if index >= self.slides.len() {
            return Err(AssembleError::Package(format!(
                "slide index {index} out of range ({} slides)",
                self.slides.len()
            )));
        }
        let slide = self.slides.remove(index);

        if let Some(list) = self.presentation.child_mut("sldIdLst") {
            list.children.retain(|node| match node {
                xml::Node::Element(el) if el.is("sldId") => {
                    relationship_id(el) != Some(slide.rel_id.as_str())
                }
                _ => true,
            });
        }
        self.presentation_rels.remove(&slide.rel_id);

        self.package.remove_part(&slide.part_name);
        self.package.remove_part(&rels_part_for(&slide.part_name));
        self.content_types.remove_override(&slide.part_name);

        log::debug!("deleted slide {} ({})", index + 1, slide.part_name);
        Ok(slide.slide_ref())
    }

    /// Replace the shape at `path` with a picture framed at `rect`
    /// (slide coordinates). The picture keeps the shape's z-order.
    pub fn replace_with_picture(
        &mut self,
        index: usize,
        path: &ShapePath,
        picture: &PictureData,
        rect: Rect,
    ) -> Result<()> {
        let slide = self.slide_or_err(index)?;
        if slide.shape(path).is_none() {
            return Err(AssembleError::ShapeNotFound(format!(
                "{}{}",
                slide.part_name, path
            )));
        }
        let local = slide.container_transform(path).to_local(rect);

        let rel_id = self.embed_image(index, picture)?;
        let slide = self.slide_mut_or_err(index)?;
        let element = picture_element(slide.next_shape_id(), &picture.name, &rel_id, local);
        slide.replace_shape(path, element)?;
        ensure_namespaces(&mut slide.xml);
        Ok(())
    }

    /// Insert a picture behind every other shape of a slide
    pub fn insert_background_picture(
        &mut self,
        index: usize,
        picture: &PictureData,
        rect: Rect,
    ) -> Result<()> {
        self.slide_or_err(index)?;
        let rel_id = self.embed_image(index, picture)?;
        let slide = self.slide_mut_or_err(index)?;
        let element = picture_element(slide.next_shape_id(), &picture.name, &rel_id, rect);
        slide.insert_at_back(element)?;
        ensure_namespaces(&mut slide.xml);
        Ok(())
    }

    /// Store image bytes as a media part and relate it to a slide
    fn embed_image(&mut self, index: usize, picture: &PictureData) -> Result<String> {
        let ext = picture.extension.to_ascii_lowercase();
        let mut hasher = DefaultHasher::new();
        picture.bytes.hash(&mut hasher);
        let key = hasher.finish();

        let media_part = match self.media.get(&key) {
            Some(part) if self.package.part(part) == Some(picture.bytes.as_slice()) => part.clone(),
            _ => {
                let part = self.package.unique_part_name("ppt/media/image", &ext);
                self.package.set_part(part.clone(), picture.bytes.clone());
                self.content_types
                    .ensure_default(&ext, image_content_type(&ext));
                self.media.insert(key, part.clone());
                part
            }
        };

        let slide = self.slide_mut_or_err(index)?;
        let target = relative_target(&slide.part_name, &media_part);
        if let Some(existing) = slide
            .rels
            .of_type("image")
            .find(|rel| !rel.external && rel.target == target)
        {
            return Ok(existing.id.clone());
        }
        Ok(slide.rels.add(REL_IMAGE, target))
    }

    fn slide_or_err(&self, index: usize) -> Result<&Slide> {
        self.slides.get(index).ok_or_else(|| {
            AssembleError::Package(format!("slide index {index} out of range"))
        })
    }

    fn slide_mut_or_err(&mut self, index: usize) -> Result<&mut Slide> {
        self.slides.get_mut(index).ok_or_else(|| {
            AssembleError::Package(format!("slide index {index} out of range"))
        })
    }
}

/// The `r:id` of a slide-id entry, whatever prefix the document bound
fn relationship_id(el: &Element) -> Option<&str> {
    el.attr("r:id").or_else(|| {
        el.attrs
            .iter()
            .find(|(k, _)| k.ends_with(":id"))
            .map(|(_, v)| v.as_str())
    })
}
