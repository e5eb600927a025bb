//! Outbound side of the voice core.
//!
//! The interpreter and the interview never touch the UI, speech output or
//! storage directly. Every observable result goes through [`Effects`], which
//! the shell implements.

use url::Url;

use super::last_command::LastCommand;
use super::mode::Mode;
use crate::identity::IdentityRecord;

pub trait Effects {
    /// Speak `text`; resume listening afterwards when `listen_after` is set
    fn request_speech(&mut self, text: &str, listen_after: bool);

    /// Switch the displayed panel
    fn set_mode(&mut self, mode: Mode);

    /// Persist a newly enrolled identity
    fn commit_identity(&mut self, record: IdentityRecord) -> anyhow::Result<()>;

    /// Hand a deep link to the platform (maps, messaging apps)
    fn open_external_link(&mut self, url: &Url);

    /// Broadcast the utterance to independent listeners
    fn publish_last_command(&mut self, command: LastCommand);
}

/// Everything an [`Effects`] implementation can be asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Speak { text: String, listen_after: bool },
    SetMode(Mode),
    Commit(IdentityRecord),
    OpenLink(Url),
    Publish(LastCommand),
}

/// Records effects in order; used by tests and dry runs
#[derive(Debug, Default)]
pub struct EffectLog {
    pub effects: Vec<Effect>,
    /// When set, `commit_identity` fails with this message
    pub fail_commits: Option<String>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn spoken(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Speak { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn modes(&self) -> Vec<Mode> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::SetMode(m) => Some(*m),
                _ => None,
            })
            .collect()
    }

    pub fn commits(&self) -> Vec<&IdentityRecord> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Commit(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn links(&self) -> Vec<&Url> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::OpenLink(u) => Some(u),
                _ => None,
            })
            .collect()
    }

    pub fn published(&self) -> Vec<&LastCommand> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Publish(c) => Some(c),
                _ => None,
            })
            .collect()
    }
}

impl Effects for EffectLog {
    fn request_speech(&mut self, text: &str, listen_after: bool) {
        self.effects.push(Effect::Speak {
            text: text.to_string(),
            listen_after,
        });
    }

    fn set_mode(&mut self, mode: Mode) {
        self.effects.push(Effect::SetMode(mode));
    }

    fn commit_identity(&mut self, record: IdentityRecord) -> anyhow::Result<()> {
        if let Some(reason) = &self.fail_commits {
            anyhow::bail!("{}", reason);
        }
        self.effects.push(Effect::Commit(record));
        Ok(())
    }

    fn open_external_link(&mut self, url: &Url) {
        self.effects.push(Effect::OpenLink(url.clone()));
    }

    fn publish_last_command(&mut self, command: LastCommand) {
        self.effects.push(Effect::Publish(command));
    }
}
