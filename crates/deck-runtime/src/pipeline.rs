//! One event in, one mailed deck out
//!
//! Stages run in order: intake (form answers, client profile, uploaded
//! images), load the template, assemble, save, email. Whatever happens
//! after admission, the key is written to the ledger so webhook retries do
//! not rebuild the deck; failures are written with their reason.

use crate::config::ServiceConfig;
use crate::ledger::{Admission, Claim, Ledger};
use crate::mail::Mailer;
use crate::types::*;
use deck_assemble::{AssemblyInput, AssemblyReport, ImageLoader, assemble, load_deck, save_deck};
use deck_intake::{AssetSource, Categorizer, Event};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A saved deck and what went into it
#[derive(Debug, Clone)]
pub struct BuiltDeck {
    pub path: PathBuf,
    pub report: AssemblyReport,
    pub recipient: Option<String>,
}

/// Processes admitted events end to end
pub struct Pipeline {
    config: Arc<ServiceConfig>,
    source: Arc<dyn AssetSource>,
    loader: Arc<dyn ImageLoader>,
    mailer: Arc<dyn Mailer>,
    ledger: Ledger,
}

impl Pipeline {
    pub fn new(
        config: ServiceConfig,
        source: Arc<dyn AssetSource>,
        loader: Arc<dyn ImageLoader>,
        mailer: Arc<dyn Mailer>,
        ledger: Ledger,
    ) -> Self {
        Self {
            config: Arc::new(config),
            source,
            loader,
            mailer,
            ledger,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Ledger key of `event` under the configured keying
    pub fn key_of(&self, event: &Event) -> String {
        event.key(self.config.intake.key_per_trigger)
    }

    /// Claim `event` for processing; `Err` carries the skip outcome
    pub async fn admit(&self, event: &Event) -> std::result::Result<Claim, PipelineOutcome> {
        let key = self.key_of(event);
        let skipped = |reason: &str| PipelineOutcome::Skipped {
            key: key.clone(),
            reason: reason.to_string(),
        };

        match self.ledger.admit(&key).await {
            Ok(Admission::Fresh(claim)) => Ok(claim),
            Ok(Admission::AlreadyProcessed) => Err(skipped("already processed")),
            Ok(Admission::InFlight) => Err(skipped("already in progress")),
            Err(e) => {
                // An unreadable ledger must not turn into duplicate mail
                log::error!("ledger lookup failed for {key}: {e}");
                Err(skipped(&format!("ledger unavailable: {e}")))
            }
        }
    }

    /// Admit and run
    pub async fn process(&self, event: &Event) -> PipelineOutcome {
        match self.admit(event).await {
            Ok(claim) => self.run(event, claim).await,
            Err(skipped) => skipped,
        }
    }

    /// Run an admitted event and record it in the ledger
    pub async fn run(&self, event: &Event, claim: Claim) -> PipelineOutcome {
        let key = claim.key().to_string();
        log::info!("processing {key}");

        let outcome = self.execute(event, &key).await;
        match &outcome {
            PipelineOutcome::Processed { .. } => log::info!("{key} processed"),
            other => log::warn!("{key}: {}", other.annotation().unwrap_or_default()),
        }

        let annotation = outcome.annotation();
        if let Err(e) = claim.complete(annotation.as_deref()).await {
            log::error!("could not record {key} as processed: {e}");
        }
        outcome
    }

    async fn execute(&self, event: &Event, key: &str) -> PipelineOutcome {
        // Downloads and, without an output directory, the deck itself live
        // here until the run ends
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return PipelineOutcome::Failed {
                    key: key.to_string(),
                    stage: Stage::Intake,
                    reason: format!("scratch directory: {e}"),
                };
            }
        };
        let output = self.output_path(event, scratch.path());

        let built = match self.build_deck(event, scratch.path(), &output).await {
            Ok(built) => built,
            Err(failure) => {
                return PipelineOutcome::Failed {
                    key: key.to_string(),
                    stage: failure.stage,
                    reason: failure.reason,
                };
            }
        };

        let summary = self.summarize(&built);
        let partial = |reason: String| PipelineOutcome::Partial {
            key: key.to_string(),
            stage: Stage::Email,
            reason,
            summary: summary.clone(),
        };

        let Some(recipient) = built.recipient.as_deref() else {
            return partial("no recipient address".to_string());
        };
        let mail = &self.config.mail;
        if let Err(e) = self
            .mailer
            .send(recipient, &mail.subject, &mail.body, &[built.path.clone()])
            .await
        {
            return partial(e.to_string());
        }

        PipelineOutcome::Processed {
            key: key.to_string(),
            summary,
        }
    }

    /// Intake, load, assemble and save `event` to `output`.
    ///
    /// Downloaded images are written under `scratch`.
    pub async fn build_deck(
        &self,
        event: &Event,
        scratch: &Path,
        output: &Path,
    ) -> std::result::Result<BuiltDeck, StageFailure> {
        let intake = &self.config.intake;

        // Intake
        let answers = intake.form.read(event);
        let mut labels = answers.labels;
        let recipient = answers.recipient.or_else(|| intake.default_recipient.clone());
        if let Some(address) = &recipient {
            match self.source.profile(address).await {
                Ok(profile) => {
                    for (label, value) in profile.iter() {
                        if let Some(value) = value {
                            labels.insert(label, Some(value.to_string()));
                        }
                    }
                }
                Err(e) => log::warn!("no profile for {address}: {e}"),
            }
        }

        let images = Categorizer::new(self.source.as_ref(), intake)
            .with_scratch_dir(scratch)
            .categorize(event)
            .await;
        log::info!(
            "{} images in {} categories",
            images.image_count(),
            images.category_count()
        );

        let input = AssemblyInput {
            labels,
            images,
            styles: answers.styles,
        };

        // Load
        let options = &self.config.assembly;
        let mut deck = load_deck(&options.template_path)
            .await
            .map_err(|e| StageFailure::new(Stage::Load, e))?;

        // Assemble
        let report = assemble(&mut deck, &input, self.loader.as_ref(), options)
            .await
            .map_err(|e| StageFailure::new(Stage::Assemble, e))?;

        // Save
        if let Some(dir) = output.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StageFailure::new(Stage::Save, e))?;
        }
        save_deck(deck, output)
            .await
            .map_err(|e| StageFailure::new(Stage::Save, e))?;

        Ok(BuiltDeck {
            path: output.to_owned(),
            report,
            recipient,
        })
    }

    fn output_path(&self, event: &Event, scratch: &Path) -> PathBuf {
        match &self.config.output_dir {
            Some(dir) => dir.join(format!(
                "{}-{}",
                file_safe(&event.item_id),
                self.config.output_name
            )),
            None => scratch.join(&self.config.output_name),
        }
    }

    fn summarize(&self, built: &BuiltDeck) -> RunSummary {
        let report = &built.report;
        RunSummary {
            recipient: built.recipient.clone(),
            output: self.config.output_dir.as_ref().map(|_| built.path.clone()),
            slides: report.slide_count,
            images_placed: report.images.replaced,
            images_unresolved: report.images.unresolved,
            styles_filled: report.styles.filled,
            text_replacements: report.text_replacements,
            slides_pruned: report.pruned.len(),
            style_slides_removed: report.style_slides_removed,
        }
    }
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
