//! Relationship parts (`_rels/*.rels`)

use super::xml::{self, Element};
use crate::types::*;

pub const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type ends with the given short name, e.g. `slide`
    pub fn is_type(&self, short: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .is_some_and(|t| t == short)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relationships {
    items: Vec<Relationship>,
}

impl Relationships {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let root = xml::parse(bytes)?;
        let items = root
            .elements()
            .filter(|el| el.is("Relationship"))
            .filter_map(|el| {
                Some(Relationship {
                    id: el.attr("Id")?.to_string(),
                    rel_type: el.attr("Type").unwrap_or_default().to_string(),
                    target: el.attr("Target")?.to_string(),
                    external: el
                        .attr("TargetMode")
                        .is_some_and(|m| m.eq_ignore_ascii_case("External")),
                })
            })
            .collect();
        Ok(Self { items })
    }

    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut root = Element::new("Relationships").with_attr("xmlns", RELS_NS);
        for rel in &self.items {
            let mut el = Element::new("Relationship")
                .with_attr("Id", rel.id.as_str())
                .with_attr("Type", rel.rel_type.as_str())
                .with_attr("Target", rel.target.as_str());
            if rel.external {
                el.set_attr("TargetMode", "External");
            }
            root = root.with_child(el);
        }
        xml::write(&root)
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.items.iter().find(|rel| rel.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.items.iter()
    }

    /// Relationships whose type ends with the given short name
    pub fn of_type<'a>(&'a self, short: &'a str) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.items.iter().filter(move |rel| rel.is_type(short))
    }

    /// Add an internal relationship under a fresh id and return that id
    pub fn add(&mut self, rel_type: &str, target: impl Into<String>) -> String {
        let next = self
            .items
            .iter()
            .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{next}");
        self.items.push(Relationship {
            id: id.clone(),
            rel_type: rel_type.to_string(),
            target: target.into(),
            external: false,
        });
        id
    }

    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let idx = self.items.iter().position(|rel| rel.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Name of the relationship part belonging to `part`.
///
/// The package itself (empty part name) owns `_rels/.rels`.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns it
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalize(absolute);
    }
    let base = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    if base.is_empty() {
        normalize(target)
    } else {
        normalize(&format!("{base}/{target}"))
    }
}

/// Target string that reaches `target_part` from `source_part`
pub fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = source_part
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    let target: Vec<&str> = target_part.split('/').collect();

    let common = source_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat_n("..", source_dir.len() - common).collect();
    parts.extend(&target[common..]);
    parts.join("/")
}

fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_part_names() {
        assert_eq!(rels_part_for(""), "_rels/.rels");
        assert_eq!(
            rels_part_for("ppt/slides/slide1.xml"),
            "ppt/slides/_rels/slide1.xml.rels"
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute_targets() {
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../media/image1.png"),
            "ppt/media/image1.png"
        );
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slides/slide2.xml"),
            "ppt/slides/slide2.xml"
        );
        assert_eq!(resolve_target("", "ppt/presentation.xml"), "ppt/presentation.xml");
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "/ppt/media/a.png"),
            "ppt/media/a.png"
        );
    }

    #[test]
    fn test_relative_target_inverts_resolve() {
        let target = relative_target("ppt/slides/slide1.xml", "ppt/media/image3.png");
        assert_eq!(target, "../media/image3.png");
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", &target),
            "ppt/media/image3.png"
        );
    }

    #[test]
    fn test_add_picks_next_free_id() {
        let xml = br#"<?xml version="1.0"?><Relationships xmlns="urn:r"><Relationship Id="rId2" Type="http://x/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId7" Type="http://x/image" Target="../media/image1.png"/></Relationships>"#;
        let mut rels = Relationships::parse(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels.of_type("image").count(), 1);

        let id = rels.add(REL_IMAGE, "../media/image2.png");
        assert_eq!(id, "rId8");
        assert!(rels.remove("rId2").is_some());
        assert!(rels.get("rId2").is_none());

        let reparsed = Relationships::parse(&rels.to_xml().unwrap()).unwrap();
        assert_eq!(reparsed, rels);
    }
}
