//! Media control listener
//!
//! Reacts to the same utterances the interpreter sees, via the last-command
//! channel, without the interpreter knowing it exists. Stale commands and
//! repeats of one already handled are ignored.

use crate::voice::LastCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Play,
    Pause,
    Next,
    Previous,
    Stop,
}

/// Keywords in priority order
const ACTIONS: &[(&[&str], MediaAction)] = &[
    (&["pause"], MediaAction::Pause),
    (&["next", "skip"], MediaAction::Next),
    (&["previous", "back"], MediaAction::Previous),
    (&["stop"], MediaAction::Stop),
    (&["play", "resume"], MediaAction::Play),
];

pub fn parse_action(text: &str) -> Option<MediaAction> {
    ACTIONS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, action)| *action)
}

#[derive(Debug, Clone)]
pub struct MediaCommandListener {
    max_age_ms: u64,
    last_seen_ms: Option<u64>,
}

impl MediaCommandListener {
    pub fn new(max_age_ms: u64) -> Self {
        Self {
            max_age_ms,
            last_seen_ms: None,
        }
    }

    /// The action for `command`, if it is fresh, unseen and recognized
    pub fn observe(&mut self, command: &LastCommand, now_ms: u64) -> Option<MediaAction> {
        if !command.is_fresh(now_ms, self.max_age_ms) {
            log::debug!(
                "Ignoring stale command '{}' ({}ms old)",
                command.text,
                command.age_ms(now_ms)
            );
            return None;
        }

        if matches!(self.last_seen_ms, Some(seen) if command.timestamp_ms <= seen) {
            return None;
        }
        self.last_seen_ms = Some(command.timestamp_ms);

        let action = parse_action(&command.text)?;
        log::info!("Media control: {:?}", action);
        Some(action)
    }
}
