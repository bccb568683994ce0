//! Webhook intake for deck assembly
//!
//! Parses platform deliveries, maps form answers to template labels and
//! turns uploaded files (images, PDF, DOCX, ZIP) into categorized images.

mod categorize;
pub mod event;
pub mod extract;
pub mod form;
mod options;
pub mod platform;
mod types;

pub use categorize::{Categorizer, categorize};
pub use event::{Delivery, Event, WebhookEnvelope};
pub use extract::{ExtractRules, FileKind, extract_images};
pub use form::{Extractor, FieldRule, FormAnswers, FormMapping};
pub use options::*;
pub use platform::{AssetSource, PlatformClient, PlatformConfig};
pub use types::*;
