use super::inherited::{InheritedFrames, PlaceholderKey};
use super::shape::{
    ShapeInfo, ShapeKind, ShapePath, Transform, classify, local_bounds, non_visual_props,
    shape_text,
};
use crate::package::rels::Relationships;
use crate::package::xml::{self, Element, Node};
use crate::types::*;

/// One slide: its part, markup and relationships
#[derive(Debug, Clone)]
pub struct Slide {
    pub(crate) part_name: String,
    /// Relationship id under which the presentation part references this slide
    pub(crate) rel_id: String,
    pub(crate) xml: Element,
    pub(crate) rels: Relationships,
    /// Frames for placeholders that declare none of their own
    pub(crate) inherited: InheritedFrames,
}

impl Slide {
    pub(crate) fn parse(
        part_name: String,
        rel_id: String,
        bytes: &[u8],
        rels: Relationships,
    ) -> Result<Self> {
        let xml = xml::parse(bytes)?;
        if xml.find(&["cSld", "spTree"]).is_none() {
            return Err(AssembleError::Package(format!(
                "{part_name} has no shape tree"
            )));
        }
        Ok(Self {
            part_name,
            rel_id,
            xml,
            rels,
            inherited: InheritedFrames::default(),
        })
    }

    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    pub fn slide_ref(&self) -> SlideRef {
        SlideRef(self.part_name.clone())
    }

    /// Every shape on the slide in document order, group members after their group
    pub fn shapes(&self) -> Vec<ShapeInfo> {
        let mut out = Vec::new();
        if let Some(tree) = self.sp_tree() {
            walk_shapes(tree, &mut Vec::new(), Transform::IDENTITY, &self.inherited, &mut out);
        }
        out
    }

    pub fn shape(&self, path: &ShapePath) -> Option<&Element> {
        let container = self.container(path.parent())?;
        match container.children.get(path.last()?)? {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Whether the slide holds at least one picture shape, groups included
    pub fn has_picture(&self) -> bool {
        self.sp_tree()
            .is_some_and(|tree| tree.contains_descendant("pic"))
    }

    /// Text of every run in every text body, in document order
    pub fn text_runs(&self) -> Vec<String> {
        let mut runs = Vec::new();
        if let Some(tree) = self.sp_tree() {
            collect_runs(tree, false, &mut runs);
        }
        runs
    }

    /// Let `f` rewrite every run's text. Returns how many runs changed.
    pub fn visit_runs_mut(&mut self, mut f: impl FnMut(&mut String)) -> usize {
        let mut changed = 0;
        if let Some(tree) = self.sp_tree_mut() {
            visit_text_bodies(tree, false, &mut f, &mut changed);
        }
        changed
    }

    /// Blank the text of every run in a shape, keeping the shape
    pub fn clear_shape_text(&mut self, path: &ShapePath) -> Result<()> {
        self.shape_mut(path)
            .map(clear_text)
            .ok_or_else(|| self.not_found(path))
    }

    pub fn remove_shape(&mut self, path: &ShapePath) -> Result<Element> {
        let removed = path.last().and_then(|idx| {
            let container = self.container_mut(path.parent())?;
            match container.children.get(idx) {
                Some(Node::Element(_)) => Some(container.children.remove(idx)),
                _ => None,
            }
        });
        match removed {
            Some(Node::Element(el)) => Ok(el),
            _ => Err(self.not_found(path)),
        }
    }

    /// Swap the shape at `path` for `replacement` at the same position
    pub(crate) fn replace_shape(&mut self, path: &ShapePath, replacement: Element) -> Result<Element> {
        self.shape_mut(path)
            .map(|shape| std::mem::replace(shape, replacement))
            .ok_or_else(|| self.not_found(path))
    }

    /// Insert a shape behind every other shape on the slide
    pub(crate) fn insert_at_back(&mut self, shape: Element) -> Result<()> {
        let part = self.part_name.clone();
        let tree = self
            .sp_tree_mut()
            .ok_or_else(|| AssembleError::Package(format!("{part} has no shape tree")))?;
        let at = tree
            .children
            .iter()
            .rposition(|node| {
                matches!(node, Node::Element(el) if el.is("nvGrpSpPr") || el.is("grpSpPr"))
            })
            .map(|i| i + 1)
            .unwrap_or(0);
        tree.children.insert(at, Node::Element(shape));
        Ok(())
    }

    /// A shape id not used anywhere on the slide
    pub(crate) fn next_shape_id(&self) -> u32 {
        max_shape_id(&self.xml) + 1
    }

    /// Coordinate mapping for the container holding the shape at `path`
    pub(crate) fn container_transform(&self, path: &ShapePath) -> Transform {
        let mut transform = Transform::IDENTITY;
        let Some(mut el) = self.sp_tree() else {
            return transform;
        };
        for &i in path.parent() {
            match el.children.get(i) {
                Some(Node::Element(group)) if group.is("grpSp") => {
                    transform = transform.enter_group(group);
                    el = group;
                }
                _ => break,
            }
        }
        transform
    }

    fn sp_tree(&self) -> Option<&Element> {
        self.xml.find(&["cSld", "spTree"])
    }

    fn sp_tree_mut(&mut self) -> Option<&mut Element> {
        self.xml.find_mut(&["cSld", "spTree"])
    }

    fn container(&self, parent: &[usize]) -> Option<&Element> {
        let mut el = self.sp_tree()?;
        for &i in parent {
            el = match el.children.get(i)? {
                Node::Element(group) if group.is("grpSp") => group,
                _ => return None,
            };
        }
        Some(el)
    }

    fn container_mut(&mut self, parent: &[usize]) -> Option<&mut Element> {
        let mut el = self.sp_tree_mut()?;
        for &i in parent {
            el = match el.children.get_mut(i)? {
                Node::Element(group) if group.is("grpSp") => group,
                _ => return None,
            };
        }
        Some(el)
    }

    fn shape_mut(&mut self, path: &ShapePath) -> Option<&mut Element> {
        let idx = path.last()?;
        match self.container_mut(path.parent())?.children.get_mut(idx)? {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    fn not_found(&self, path: &ShapePath) -> AssembleError {
        AssembleError::ShapeNotFound(format!("{}{}", self.part_name, path))
    }
}

fn walk_shapes(
    container: &Element,
    prefix: &mut Vec<usize>,
    transform: Transform,
    inherited: &InheritedFrames,
    out: &mut Vec<ShapeInfo>,
) {
    for (i, node) in container.children.iter().enumerate() {
        let Node::Element(el) = node else {
            continue;
        };
        let Some(kind) = classify(el) else {
            continue;
        };

        prefix.push(i);
        let props = non_visual_props(el);
        out.push(ShapeInfo {
            path: ShapePath(prefix.clone()),
            kind,
            id: props.and_then(|p| p.attr("id")?.parse().ok()),
            name: props
                .and_then(|p| p.attr("name"))
                .unwrap_or_default()
                .to_string(),
            bounds: local_bounds(el)
                .map(|r| transform.to_slide(r))
                .or_else(|| PlaceholderKey::of(el).and_then(|key| inherited.resolve(&key))),
            text: match kind {
                ShapeKind::Group => String::new(),
                _ => shape_text(el),
            },
        });
        if kind == ShapeKind::Group {
            walk_shapes(el, prefix, transform.enter_group(el), inherited, out);
        }
        prefix.pop();
    }
}

fn collect_runs(el: &Element, inside_body: bool, out: &mut Vec<String>) {
    for child in el.elements() {
        let inside = inside_body || child.is("txBody");
        if inside && child.is("t") {
            out.push(child.text());
        } else {
            collect_runs(child, inside, out);
        }
    }
}

fn visit_text_bodies(
    el: &mut Element,
    inside_body: bool,
    f: &mut impl FnMut(&mut String),
    changed: &mut usize,
) {
    for child in el.elements_mut() {
        let inside = inside_body || child.is("txBody");
        if inside && child.is("t") {
            let before = child.text();
            let mut text = before.clone();
            f(&mut text);
            if text != before {
                child.set_text(text);
                *changed += 1;
            }
        } else {
            visit_text_bodies(child, inside, f, changed);
        }
    }
}

fn clear_text(el: &mut Element) {
    for child in el.elements_mut() {
        if child.is("t") {
            child.set_text("");
        } else {
            clear_text(child);
        }
    }
}

fn max_shape_id(el: &Element) -> u32 {
    let own = if el.is("cNvPr") {
        el.attr("id").and_then(|id| id.parse().ok()).unwrap_or(0)
    } else {
        0
    };
    el.elements().map(max_shape_id).fold(own, u32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<p:sld xmlns:a="a" xmlns:p="p" xmlns:r="r"><p:cSld><p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/></p:nvSpPr><p:spPr><a:xfrm><a:off x="10" y="20"/><a:ext cx="300" cy="400"/></a:xfrm></p:spPr><p:txBody><a:p><a:r><a:t>Hello</a:t></a:r><a:r><a:t> world</a:t></a:r></a:p></p:txBody></p:sp>
<p:grpSp><p:nvGrpSpPr><p:cNvPr id="9" name="Group"/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="1000" y="1000"/><a:ext cx="100" cy="100"/><a:chOff x="0" y="0"/><a:chExt cx="100" cy="100"/></a:xfrm></p:grpSpPr>
<p:sp><p:nvSpPr><p:cNvPr id="4" name="Inner"/></p:nvSpPr><p:spPr><a:xfrm><a:off x="5" y="5"/><a:ext cx="50" cy="50"/></a:xfrm></p:spPr><p:txBody><a:p><a:r><a:t>{{Layout1}}</a:t></a:r></a:p></p:txBody></p:sp>
</p:grpSp>
</p:spTree></p:cSld></p:sld>"#;

    fn slide() -> Slide {
        Slide::parse(
            "ppt/slides/slide1.xml".into(),
            "rId2".into(),
            SLIDE.as_bytes(),
            Relationships::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_shapes_recurse_into_groups() {
        let slide = slide();
        let shapes = slide.shapes();
        let kinds: Vec<ShapeKind> = shapes.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![ShapeKind::Text, ShapeKind::Group, ShapeKind::Text]);

        assert_eq!(shapes[0].text, "Hello world");
        assert_eq!(shapes[0].bounds, Some(crate::layout::Rect::new(10, 20, 300, 400)));
        assert_eq!(shapes[2].text, "{{Layout1}}");
        assert_eq!(shapes[2].bounds, Some(crate::layout::Rect::new(1005, 1005, 50, 50)));
        assert_eq!(shapes[2].path.depth(), 2);
        assert_eq!(slide.next_shape_id(), 10);
    }

    #[test]
    fn test_visit_runs_counts_changes() {
        let mut slide = slide();
        let changed = slide.visit_runs_mut(|text| {
            if text == "Hello" {
                *text = "Goodbye".into();
            }
        });
        assert_eq!(changed, 1);
        assert_eq!(slide.text_runs(), vec!["Goodbye", " world", "{{Layout1}}"]);
    }

    #[test]
    fn test_clear_and_remove_shape() {
        let mut slide = slide();
        let inner = slide.shapes()[2].path.clone();
        slide.clear_shape_text(&inner).unwrap();
        assert_eq!(slide.shapes()[2].text, "");

        let title = slide.shapes()[0].path.clone();
        slide.remove_shape(&title).unwrap();
        assert_eq!(slide.shapes().len(), 2);
        assert!(slide.remove_shape(&ShapePath(vec![999])).is_err());
    }

    #[test]
    fn test_insert_at_back_goes_after_group_properties() {
        let mut slide = slide();
        slide.insert_at_back(Element::new("p:pic")).unwrap();
        assert!(slide.has_picture());
        assert_eq!(slide.shapes()[0].kind, ShapeKind::Picture);
    }
}
