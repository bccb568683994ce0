use crate::mail::MailConfig;
use crate::types::*;
use deck_assemble::AssemblyOptions;
use deck_intake::{IntakeOptions, PlatformConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Everything the service needs except secrets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub assembly: AssemblyOptions,
    pub intake: IntakeOptions,
    pub platform: PlatformConfig,
    pub mail: MailConfig,

    // Persistence
    pub ledger_path: PathBuf,
    /// Finished decks are kept here; otherwise they live only until mailed
    pub output_dir: Option<PathBuf>,
    pub output_name: String,

    // HTTP
    pub webhook_path: String,
    pub bind: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            assembly: AssemblyOptions::default(),
            intake: IntakeOptions::default(),
            platform: PlatformConfig::default(),
            mail: MailConfig::default(),
            ledger_path: PathBuf::from("email_sent_log.txt"),
            output_dir: None,
            output_name: "output.pptx".to_string(),
            webhook_path: "/monday-webhook".to_string(),
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config = serde_json::from_slice(&bytes)
            .map_err(|e| RuntimeError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.assembly.validate()?;
        self.intake.validate()?;
        self.mail.validate()?;

        if self.platform.timeout_secs == 0 {
            return Err(RuntimeError::Config(
                "Platform timeout must be at least 1 second".to_string(),
            ));
        }

        if !self.webhook_path.starts_with('/') {
            return Err(RuntimeError::Config(format!(
                "Webhook path must start with '/', got {:?}",
                self.webhook_path
            )));
        }

        self.bind_addr()?;

        let name = Path::new(&self.output_name);
        if name.extension().is_none_or(|ext| ext != "pptx") || name.components().count() != 1 {
            return Err(RuntimeError::Config(format!(
                "Output name must be a bare .pptx file name, got {:?}",
                self.output_name
            )));
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| RuntimeError::Config(format!("Invalid bind address {:?}: {}", self.bind, e)))
    }
}
