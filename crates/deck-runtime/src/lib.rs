//! Service runtime for deck assembly: the processed ledger, mail delivery,
//! configuration, the end-to-end pipeline and its background worker.

mod config;
pub mod ledger;
pub mod mail;
pub mod pipeline;
mod types;
pub mod worker;

pub use config::ServiceConfig;
pub use ledger::{Admission, Claim, FileStore, Ledger, MemoryStore, ProcessedStore};
pub use mail::{MailConfig, Mailer, SmtpMailer};
pub use pipeline::{BuiltDeck, Pipeline};
pub use types::*;
pub use worker::{spawn_worker, worker_task};

// Re-export types from library crates
pub use deck_assemble::{AssemblyOptions, AssemblyReport};
pub use deck_intake::{Delivery, Event, IntakeOptions, PlatformConfig, WebhookEnvelope};

/// Commands sent from the HTTP layer to the worker
#[derive(Debug)]
pub enum DeckCommand {
    /// Build and mail the deck for an admitted event
    Process { event: Event, claim: Claim },
}

/// Updates sent from the worker
#[derive(Debug, Clone)]
pub enum DeckUpdate {
    Started { key: String },
    Finished { outcome: PipelineOutcome },
}
