use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Malformed package: {0}")]
    Package(String),
    #[error("Missing package part: {0}")]
    MissingPart(String),
    #[error("No shape at {0}")]
    ShapeNotFound(String),
    #[error("Image unavailable: {0}")]
    ImageUnavailable(String),
}

pub type Result<T> = std::result::Result<T, AssembleError>;

/// Where the bytes of a candidate image can be obtained from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Remote reference, fetched by a network-capable loader
    Url(String),
    /// File on local disk (temp download, style library)
    Path(PathBuf),
    /// Image already in memory (e.g. extracted from a PDF or archive)
    Bytes { name: String, data: Arc<[u8]> },
}

impl ImageSource {
    pub fn bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        ImageSource::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Short human-readable name, used for picture descriptions and logs
    pub fn display_name(&self) -> String {
        match self {
            ImageSource::Url(url) => url
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or(url)
                .split('?')
                .next()
                .unwrap_or(url)
                .to_string(),
            ImageSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            ImageSource::Bytes { name, .. } => name.clone(),
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Url(url) => write!(f, "{url}"),
            ImageSource::Path(path) => write!(f, "{}", path.display()),
            ImageSource::Bytes { name, data } => write!(f, "{name} ({} bytes)", data.len()),
        }
    }
}

/// Images grouped by semantic category, in the order they arrived.
///
/// Category names compare case-insensitively. Order inside a category is
/// meaningful: ordinal placeholders index into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizedImages {
    categories: Vec<(String, Vec<ImageSource>)>,
}

impl CategorizedImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image to a category, creating the category on first use
    pub fn push(&mut self, category: &str, source: ImageSource) {
        match self.position(category) {
            Some(idx) => self.categories[idx].1.push(source),
            None => self.categories.push((category.to_string(), vec![source])),
        }
    }

    /// Append several images to a category, preserving their order
    pub fn extend(&mut self, category: &str, sources: impl IntoIterator<Item = ImageSource>) {
        for source in sources {
            self.push(category, source);
        }
    }

    pub fn get(&self, category: &str) -> Option<&[ImageSource]> {
        self.position(category)
            .map(|idx| self.categories[idx].1.as_slice())
    }

    /// All images across every category, concatenated in category order
    pub fn global_pool(&self) -> Vec<&ImageSource> {
        self.categories
            .iter()
            .flat_map(|(_, sources)| sources.iter())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ImageSource])> {
        self.categories
            .iter()
            .map(|(name, sources)| (name.as_str(), sources.as_slice()))
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn image_count(&self) -> usize {
        self.categories.iter().map(|(_, s)| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.image_count() == 0
    }

    fn position(&self, category: &str) -> Option<usize> {
        self.categories
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(category))
    }
}

/// Ordered mapping of literal placeholder label to its resolved value.
///
/// `None` and empty values are kept so callers can see which labels had no
/// data; the substitution pass skips them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    entries: Vec<(String, Option<String>)>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a label. Overwriting keeps the original position.
    pub fn insert(&mut self, label: impl Into<String>, value: Option<String>) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_deref()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<String>> FromIterator<(L, Option<String>)> for LabelMap {
    fn from_iter<T: IntoIterator<Item = (L, Option<String>)>>(iter: T) -> Self {
        let mut map = LabelMap::new();
        for (label, value) in iter {
            map.insert(label, value);
        }
        map
    }
}

/// Stable identity of a slide: its part name inside the package.
///
/// Survives deletion of other slides, unlike a positional index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlideRef(pub String);

impl fmt::Display for SlideRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order in which literal labels are applied to a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LabelOrder {
    /// Longer labels first, ties in insertion order. A label that contains
    /// another label is always substituted before it.
    #[default]
    LongestFirst,
    /// Exactly the caller's insertion order
    Insertion,
}
