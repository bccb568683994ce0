mod server;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use deck_assemble::placeholder::{PlaceholderKind, find_braced_labels, scan_literals, scan_structured};
use deck_intake::{Delivery, Event, PlatformClient, WebhookEnvelope};
use deck_runtime::{
    Ledger, Mailer, MemoryStore, Pipeline, PipelineOutcome, ServiceConfig, SmtpMailer, spawn_worker,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "deckt", about = "Slide deck assembly from form webhooks", version)]
struct Cli {
    /// Service configuration (JSON); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        /// Listen address, overriding the configuration
        #[arg(long)]
        bind: Option<String>,

        #[arg(long, env = "MONDAY_API_KEY", hide_env_values = true)]
        api_key: String,

        #[arg(long, env = "EMAIL_USER")]
        smtp_user: String,

        #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
        smtp_password: String,
    },

    /// Build the deck for a saved webhook body or event
    Assemble {
        /// Webhook body or bare event (JSON)
        #[arg(short, long)]
        event: PathBuf,

        /// Directory the finished deck is written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        #[arg(long, env = "MONDAY_API_KEY", hide_env_values = true, default_value = "")]
        api_key: String,

        /// Email the deck instead of only saving it
        #[arg(long, requires_all = ["smtp_user", "smtp_password"])]
        send: bool,

        #[arg(long, env = "EMAIL_USER")]
        smtp_user: Option<String>,

        #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
        smtp_password: Option<String>,
    },

    /// List the placeholders a template contains
    Inspect {
        /// Template deck; the configured template when omitted
        template: Option<PathBuf>,
    },

    /// Write the default configuration to a file
    InitConfig {
        output: PathBuf,
    },
}

/// Logs instead of sending; used when a run should not reach anyone
pub(crate) struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        recipient: &str,
        _subject: &str,
        _body: &str,
        attachments: &[PathBuf],
    ) -> deck_runtime::Result<()> {
        for path in attachments {
            log::info!("not sending {} to {recipient}", path.display());
        }
        Ok(())
    }
}

async fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let config = match path {
        Some(path) => ServiceConfig::load(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

async fn read_event(path: &Path) -> Result<Event> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    if let Ok(envelope) = WebhookEnvelope::parse(&bytes) {
        if let Delivery::Event(event) = envelope.into_delivery() {
            return Ok(event);
        }
    }
    serde_json::from_slice(&bytes).with_context(|| format!("{} holds no event", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            api_key,
            smtp_user,
            smtp_password,
        } => {
            let mut config = load_config(cli.config.as_deref()).await?;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            let addr = config.bind_addr()?;

            let client = Arc::new(PlatformClient::new(config.platform.clone(), api_key)?);
            let mailer = Arc::new(SmtpMailer::new(&config.mail, &smtp_user, &smtp_password)?);
            let ledger = Ledger::open(&config.ledger_path).await?;
            let pipeline = Arc::new(Pipeline::new(config, client.clone(), client, mailer, ledger));

            let (commands, mut updates, _worker) = spawn_worker(pipeline.clone());
            tokio::spawn(async move {
                while let Some(update) = updates.recv().await {
                    log::debug!("{update:?}");
                }
            });

            let state = server::AppState {
                pipeline,
                commands,
                started: chrono::Utc::now(),
            };
            server::serve(addr, state).await?;
        }

        Commands::Assemble {
            event,
            output_dir,
            api_key,
            send,
            smtp_user,
            smtp_password,
        } => {
            let mut config = load_config(cli.config.as_deref()).await?;
            config.output_dir = Some(output_dir);
            let event = read_event(&event).await?;

            let mailer: Arc<dyn Mailer> = match (send, smtp_user, smtp_password) {
                (true, Some(user), Some(password)) => {
                    Arc::new(SmtpMailer::new(&config.mail, &user, &password)?)
                }
                (true, _, _) => bail!("--send needs SMTP credentials"),
                (false, _, _) => Arc::new(LogMailer),
            };
            let client = Arc::new(PlatformClient::new(config.platform.clone(), api_key)?);
            let ledger = Ledger::new(MemoryStore::new());
            let pipeline = Pipeline::new(config, client.clone(), client, mailer, ledger);

            let outcome = pipeline.process(&event).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if let PipelineOutcome::Failed { stage, reason, .. } = outcome {
                bail!("{stage} failed: {reason}");
            }
        }

        Commands::Inspect { template } => {
            let config = load_config(cli.config.as_deref()).await?;
            let path = template.unwrap_or_else(|| config.assembly.template_path.clone());
            let deck = deck_assemble::load_deck(&path).await?;

            println!("{}: {} slides", path.display(), deck.slide_count());
            for found in scan_structured(&deck) {
                let what = match &found.kind {
                    PlaceholderKind::Image { category, ordinal } => {
                        format!("image {category} #{ordinal}")
                    }
                    PlaceholderKind::Style { ordinal } => format!("style #{ordinal}"),
                    PlaceholderKind::Literal { label } => format!("label {label}"),
                };
                println!("  slide {:>3}  {:<20} {what}", found.slide_index + 1, found.raw_text);
            }

            let labels: Vec<&str> = config
                .intake
                .form
                .rules
                .iter()
                .map(|rule| rule.label.as_str())
                .collect();
            let used = scan_literals(&deck, labels);
            println!("Configured labels in use: {}", used.len());
            for found in used {
                if let PlaceholderKind::Literal { label } = &found.kind {
                    println!("  slide {:>3}  {label}", found.slide_index + 1);
                }
            }

            let braced = find_braced_labels(&deck);
            if !braced.is_empty() {
                println!("Braced labels: {}", braced.join(", "));
            }
        }

        Commands::InitConfig { output } => {
            ServiceConfig::default().save(&output).await?;
            println!("Wrote default configuration → {}", output.display());
        }
    }

    Ok(())
}
