//! Enrollment interview
//!
//! Four spoken turns collect name, gender, age and access level for a face
//! the vision collaborator has just captured, then archive the identity.
//! The path is strictly forward:
//!
//! ```text
//! Idle ─start─▶ AskName ─▶ AskGender ─▶ AskAge ─▶ AskAccess ─commit─▶ Idle
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use super::effects::Effects;
use crate::identity::{parse_age, AccessLevel, Gender, IdentityRecord, DATE_FORMAT};

pub const PROMPT_NAME: &str = "Target captured. Who is this person?";
pub const PROMPT_NAME_RETRY: &str = "I didn't catch a name. Who is this person?";
pub const PROMPT_AGE: &str = "Age?";
pub const PROMPT_ACCESS: &str = "Access Level?";
pub const CONFIRM_ARCHIVED: &str = "Identity archived.";
pub const ARCHIVE_FAILED: &str = "Unable to archive identity.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AskName,
    AskGender,
    AskAge,
    AskAccess,
}

#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("An enrollment interview is already in progress ({0:?})")]
    AlreadyActive(ConversationState),

    #[error("No enrollment interview in progress")]
    NotActive,

    #[error("Failed to archive identity: {0:#}")]
    Commit(anyhow::Error),
}

/// Identity under construction; exists only while the interview runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftIdentity {
    pub descriptor: Vec<f32>,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<String>,
    pub access_level: Option<AccessLevel>,
}

impl DraftIdentity {
    fn new(descriptor: Vec<f32>) -> Self {
        Self {
            descriptor,
            ..Default::default()
        }
    }

    fn into_record(self, date_added: NaiveDate) -> IdentityRecord {
        IdentityRecord {
            name: self.name.unwrap_or_default(),
            gender: self.gender.unwrap_or(Gender::Male),
            age: self.age.unwrap_or_else(|| parse_age("")),
            access_level: self.access_level.unwrap_or_default(),
            descriptor: Some(self.descriptor),
            date_added: date_added.format(DATE_FORMAT).to_string(),
        }
    }
}

/// Strip every "." the recognizer inserted, then surrounding whitespace
pub fn clean_name(answer: &str) -> String {
    answer.replace('.', "").trim().to_string()
}

#[derive(Debug, Default)]
pub struct ConversationEngine {
    state: ConversationState,
    draft: Option<DraftIdentity>,
}

impl ConversationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != ConversationState::Idle
    }

    pub fn draft(&self) -> Option<&DraftIdentity> {
        self.draft.as_ref()
    }

    /// Begin an interview for a freshly captured face
    pub fn start(
        &mut self,
        descriptor: Vec<f32>,
        effects: &mut dyn Effects,
    ) -> Result<(), ConversationError> {
        if self.is_active() {
            return Err(ConversationError::AlreadyActive(self.state));
        }

        log::info!("Enrollment interview started");
        self.draft = Some(DraftIdentity::new(descriptor));
        self.transition(ConversationState::AskName);
        effects.request_speech(PROMPT_NAME, true);
        Ok(())
    }

    /// Feed one answer; returns the state after the turn
    pub fn respond(
        &mut self,
        answer: &str,
        today: NaiveDate,
        effects: &mut dyn Effects,
    ) -> Result<ConversationState, ConversationError> {
        let Some(draft) = self.draft.as_mut() else {
            return Err(ConversationError::NotActive);
        };

        match self.state {
            ConversationState::Idle => return Err(ConversationError::NotActive),

            ConversationState::AskName => {
                let name = clean_name(answer);
                if name.is_empty() {
                    log::info!("Empty name answer, asking again");
                    effects.request_speech(PROMPT_NAME_RETRY, true);
                    return Ok(self.state);
                }
                effects.request_speech(&format!("Registered {}. Male or Female?", name), true);
                draft.name = Some(name);
                self.transition(ConversationState::AskGender);
            }

            ConversationState::AskGender => {
                draft.gender = Some(Gender::from_answer(answer));
                self.transition(ConversationState::AskAge);
                effects.request_speech(PROMPT_AGE, true);
            }

            ConversationState::AskAge => {
                draft.age = Some(parse_age(answer));
                self.transition(ConversationState::AskAccess);
                effects.request_speech(PROMPT_ACCESS, true);
            }

            ConversationState::AskAccess => {
                draft.access_level = Some(AccessLevel::from_answer(answer));
                return self.commit(today, effects);
            }
        }

        Ok(self.state)
    }

    /// Abandon the interview; true if one was running
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        if was_active {
            log::info!("Enrollment interview cancelled at {:?}", self.state);
        }
        self.reset();
        was_active
    }

    fn commit(
        &mut self,
        today: NaiveDate,
        effects: &mut dyn Effects,
    ) -> Result<ConversationState, ConversationError> {
        let draft = self.draft.take().ok_or(ConversationError::NotActive)?;
        let record = draft.into_record(today);
        let name = record.name.clone();
        self.reset();

        match effects.commit_identity(record) {
            Ok(()) => {
                log::info!("Identity '{}' archived", name);
                effects.request_speech(CONFIRM_ARCHIVED, false);
                Ok(self.state)
            }
            Err(e) => {
                log::error!("Failed to archive identity '{}': {:#}", name, e);
                effects.request_speech(ARCHIVE_FAILED, false);
                Err(ConversationError::Commit(e))
            }
        }
    }

    fn reset(&mut self) {
        self.draft = None;
        self.transition(ConversationState::Idle);
    }

    fn transition(&mut self, next: ConversationState) {
        if self.state != next {
            log::debug!("Conversation: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }
}
