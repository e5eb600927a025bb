use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::validation;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub operator: OperatorConfig,
    pub voice: VoiceConfig,
    pub identity: IdentityConfig,
    pub links: LinkConfig,
}

/// The signed-in operator shown in the HUD header and greeted at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorConfig {
    pub name: String,
    pub access: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Longest transcript accepted from the recognizer (bytes)
    pub max_utterance_len: usize,
    /// Last-command consumers drop anything older than this
    pub stale_command_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Components per face descriptor
    pub descriptor_len: usize,
    /// Euclidean distance below which a face counts as a match
    pub match_threshold: f32,
    /// Minimum gap between spoken missing-person alerts
    pub missing_alert_interval_ms: u64,
}

/// Deep-link targets opened by voice commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub home_route_url: String,
    pub maps_url: String,
    #[serde(default = "default_comms_channels")]
    pub comms: Vec<CommsChannel>,
}

/// One entry of the comms sub-menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommsChannel {
    /// Spoken keyword, lowercase
    pub keyword: String,
    /// Label used in the spoken acknowledgment
    pub label: String,
    pub url: String,
}

fn default_comms_channels() -> Vec<CommsChannel> {
    [
        ("whatsapp", "WhatsApp", "https://wa.me/"),
        ("messenger", "Messenger", "https://m.me/"),
        ("viber", "Viber", "viber://chat"),
        ("facebook", "Facebook", "https://facebook.com/"),
        ("instagram", "Instagram", "https://instagram.com/"),
    ]
    .into_iter()
    .map(|(keyword, label, url)| CommsChannel {
        keyword: keyword.to_string(),
        label: label.to_string(),
        url: url.to_string(),
    })
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            operator: OperatorConfig {
                name: "Jim".to_string(),
                access: "Admin".to_string(),
            },
            voice: VoiceConfig {
                max_utterance_len: 512,
                stale_command_ms: 2000,
            },
            identity: IdentityConfig {
                descriptor_len: 128,
                match_threshold: 0.6,
                missing_alert_interval_ms: 15_000,
            },
            links: LinkConfig {
                home_route_url: "https://www.google.com/maps/dir/?api=1&destination=Home"
                    .to_string(),
                maps_url: "https://www.google.com/maps".to_string(),
                comms: default_comms_channels(),
            },
        }
    }
}

impl AppConfig {
    /// Load config from file or create default
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            config.validate()?;
            log::info!("Config loaded from: {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            let toml_str = toml::to_string_pretty(&config)?;
            fs::write(path, toml_str)
                .with_context(|| format!("Failed to write config: {}", path.display()))?;
            log::info!("Default config created at: {}", path.display());
            Ok(config)
        }
    }

    /// Reject values the voice core cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_match_threshold(self.identity.match_threshold)?;
        validation::validate_link(&self.links.home_route_url)?;
        validation::validate_link(&self.links.maps_url)?;
        for channel in &self.links.comms {
            validation::validate_link(&channel.url)
                .with_context(|| format!("comms channel '{}'", channel.keyword))?;
        }
        if self.identity.descriptor_len == 0 {
            anyhow::bail!("identity.descriptor_len must be greater than zero");
        }
        Ok(())
    }
}
