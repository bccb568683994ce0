//! Picture shape markup

use crate::layout::Rect;
use crate::package::xml::Element;

pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Encoded image ready to embed in a slide
#[derive(Debug, Clone, PartialEq)]
pub struct PictureData {
    /// PNG or JPEG bytes
    pub bytes: Vec<u8>,
    /// File extension matching the encoding, lowercase without the dot
    pub extension: String,
    /// Shown as the picture's description
    pub name: String,
}

/// Build a `p:pic` element framed at `rect` (container coordinates)
pub(crate) fn picture_element(id: u32, descr: &str, rel_id: &str, rect: Rect) -> Element {
    let nv = Element::new("p:nvPicPr")
        .with_child(
            Element::new("p:cNvPr")
                .with_attr("id", id.to_string())
                .with_attr("name", format!("Picture {id}"))
                .with_attr("descr", descr),
        )
        .with_child(
            Element::new("p:cNvPicPr")
                .with_child(Element::new("a:picLocks").with_attr("noChangeAspect", "1")),
        )
        .with_child(Element::new("p:nvPr"));

    let fill = Element::new("p:blipFill")
        .with_child(Element::new("a:blip").with_attr("r:embed", rel_id))
        .with_child(Element::new("a:stretch").with_child(Element::new("a:fillRect")));

    let sp_pr = Element::new("p:spPr")
        .with_child(
            Element::new("a:xfrm")
                .with_child(
                    Element::new("a:off")
                        .with_attr("x", rect.x.to_string())
                        .with_attr("y", rect.y.to_string()),
                )
                .with_child(
                    Element::new("a:ext")
                        .with_attr("cx", rect.width.to_string())
                        .with_attr("cy", rect.height.to_string()),
                ),
        )
        .with_child(
            Element::new("a:prstGeom")
                .with_attr("prst", "rect")
                .with_child(Element::new("a:avLst")),
        );

    Element::new("p:pic")
        .with_child(nv)
        .with_child(fill)
        .with_child(sp_pr)
}

/// Declare the prefixes used by [`picture_element`] on a slide root
pub(crate) fn ensure_namespaces(root: &mut Element) {
    for (prefix, uri) in [
        ("xmlns:a", NS_DRAWING),
        ("xmlns:p", NS_PRESENTATION),
        ("xmlns:r", NS_RELATIONSHIPS),
    ] {
        if root.attr(prefix).is_none() {
            root.set_attr(prefix, uri);
        }
    }
}
