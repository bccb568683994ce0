//! The `[Content_Types].xml` part

use super::xml::{self, Element};
use crate::types::*;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

#[derive(Debug, Clone)]
pub struct ContentTypes {
    root: Element,
}

impl ContentTypes {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = xml::parse(bytes)?;
        if !root.is("Types") {
            return Err(AssembleError::Package(format!(
                "content types root is <{}>, expected <Types>",
                root.name
            )));
        }
        Ok(Self { root })
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        xml::write(&self.root)
    }

    /// Declared default content type for an extension
    pub fn default_for(&self, ext: &str) -> Option<&str> {
        self.root
            .elements()
            .filter(|el| el.is("Default"))
            .find(|el| el.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(ext)))
            .and_then(|el| el.attr("ContentType"))
    }

    /// Declare a default for the extension unless one already exists
    pub fn ensure_default(&mut self, ext: &str, content_type: &str) {
        if self.default_for(ext).is_some() {
            return;
        }
        let entry = Element::new("Default")
            .with_attr("Extension", ext.to_ascii_lowercase())
            .with_attr("ContentType", content_type);
        // Defaults precede overrides
        let at = self
            .root
            .children
            .iter()
            .position(|node| matches!(node, xml::Node::Element(el) if el.is("Override")))
            .unwrap_or(self.root.children.len());
        self.root.children.insert(at, xml::Node::Element(entry));
    }

    /// Drop the override for a part; returns whether one existed
    pub fn remove_override(&mut self, part: &str) -> bool {
        let name = format!("/{}", part.trim_start_matches('/'));
        let before = self.root.children.len();
        self.root.children.retain(|node| match node {
            xml::Node::Element(el) if el.is("Override") => el.attr("PartName") != Some(&name),
            _ => true,
        });
        self.root.children.len() != before
    }
}

/// Content type for an image file extension
pub fn image_content_type(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
