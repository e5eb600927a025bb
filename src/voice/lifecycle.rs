//! Recognizer lifecycle
//!
//! The speech recognizer runs in single-shot mode: it delivers one result and
//! must be restarted for the next. It is also stopped whenever speech output
//! begins, otherwise the assistant would transcribe its own voice. Those rules
//! live here as an explicit transition table instead of callback timing.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerState {
    #[default]
    Idle,
    Listening,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerEvent {
    /// Microphone armed by the operator or by a listen-after prompt
    Start,
    /// Recognizer delivered a finalized transcript
    Result,
    /// Transcript fully handled
    Done,
    /// Manual stop
    Stop,
    /// Recognizer ended on its own (silence, timeout)
    Ended,
    /// Speech output is starting; recognition must be off
    SpeechBegan,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid listener transition: {event:?} while {state:?}")]
    InvalidTransition {
        state: ListenerState,
        event: ListenerEvent,
    },

    #[error("Cannot start listening while speech output is active")]
    Speaking,
}

/// Pure transition table. `None` marks an invalid transition.
pub fn next_state(state: ListenerState, event: ListenerEvent) -> Option<ListenerState> {
    use ListenerEvent as E;
    use ListenerState as S;

    match (state, event) {
        (S::Idle, E::Start) => Some(S::Listening),
        (S::Idle, E::Stop | E::Ended | E::SpeechBegan) => Some(S::Idle),

        (S::Listening, E::Result) => Some(S::Processing),
        (S::Listening, E::Stop | E::Ended | E::SpeechBegan) => Some(S::Idle),

        // Recognition is already off while a transcript is handled
        (S::Processing, E::Done) => Some(S::Idle),
        (S::Processing, E::Stop | E::Ended | E::SpeechBegan) => Some(S::Processing),

        _ => None,
    }
}

/// Recognizer state plus the speaking guard
#[derive(Debug, Clone, Default)]
pub struct ListenerLifecycle {
    state: ListenerState,
    speaking: bool,
}

impl ListenerLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenerState::Listening
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Apply `event`, returning the new state
    pub fn apply(&mut self, event: ListenerEvent) -> Result<ListenerState, LifecycleError> {
        if event == ListenerEvent::Start && self.speaking {
            return Err(LifecycleError::Speaking);
        }

        let next = next_state(self.state, event).ok_or(LifecycleError::InvalidTransition {
            state: self.state,
            event,
        })?;

        if event == ListenerEvent::SpeechBegan {
            self.speaking = true;
        }

        if next != self.state {
            log::debug!("Listener: {:?} --{:?}--> {:?}", self.state, event, next);
        }
        self.state = next;
        Ok(next)
    }

    /// Speech output finished; listening may start again
    pub fn speech_ended(&mut self) {
        self.speaking = false;
    }
}
