//! Voice session controller
//!
//! Owns the displayed mode, the enrollment interview, the recognizer
//! lifecycle and the scan flag, and is the only entry point for transcripts
//! and captured faces. Everything runs to completion on the caller's thread;
//! the shell delivers utterances one at a time.

use thiserror::Error;
use url::Url;

use super::commands::{CommandInterpreter, Links};
use super::conversation::{ConversationEngine, ConversationError, ConversationState, DraftIdentity};
use super::effects::Effects;
use super::last_command::LastCommand;
use super::lifecycle::{LifecycleError, ListenerEvent, ListenerLifecycle, ListenerState};
use super::mode::Mode;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::identity::IdentityRecord;
use crate::validation::{self, ValidationError};

pub const CANCELLED: &str = "Cancelled.";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error("Enrollment requires an active face scan")]
    NotScanning,
}

/// Where a submitted utterance went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing left after normalization
    Empty,
    /// Consumed by the enrollment interview; state after the turn
    Conversation(ConversationState),
    /// Matched the named command rule
    Command(&'static str),
    /// Matched nothing
    Ignored,
}

/// Effects wrapper that keeps session state in step with what is requested
struct Tracked<'a, E: Effects> {
    mode: &'a mut Mode,
    lifecycle: &'a mut ListenerLifecycle,
    resume_after_speech: &'a mut bool,
    inner: &'a mut E,
}

impl<E: Effects> Effects for Tracked<'_, E> {
    fn request_speech(&mut self, text: &str, listen_after: bool) {
        // Valid from every state: recognition always yields to output
        let _ = self.lifecycle.apply(ListenerEvent::SpeechBegan);
        *self.resume_after_speech = listen_after;
        self.inner.request_speech(text, listen_after);
    }

    fn set_mode(&mut self, mode: Mode) {
        if *self.mode != mode {
            log::info!("Mode: {} -> {}", self.mode, mode);
        }
        *self.mode = mode;
        self.inner.set_mode(mode);
    }

    fn commit_identity(&mut self, record: IdentityRecord) -> anyhow::Result<()> {
        self.inner.commit_identity(record)
    }

    fn open_external_link(&mut self, url: &Url) {
        log::info!("Opening external link: {}", url);
        self.inner.open_external_link(url);
    }

    fn publish_last_command(&mut self, command: LastCommand) {
        self.inner.publish_last_command(command);
    }
}

pub struct VoiceSession<E: Effects, C: Clock> {
    mode: Mode,
    conversation: ConversationEngine,
    lifecycle: ListenerLifecycle,
    interpreter: CommandInterpreter,
    scanning: bool,
    resume_after_speech: bool,
    max_utterance_len: usize,
    descriptor_len: usize,
    effects: E,
    clock: C,
}

macro_rules! tracked {
    ($self:ident) => {
        Tracked {
            mode: &mut $self.mode,
            lifecycle: &mut $self.lifecycle,
            resume_after_speech: &mut $self.resume_after_speech,
            inner: &mut $self.effects,
        }
    };
}

impl<E: Effects, C: Clock> VoiceSession<E, C> {
    pub fn new(config: &AppConfig, effects: E, clock: C) -> Result<Self, SessionError> {
        let links = Links::from_config(&config.links)?;
        Ok(Self::with_interpreter(
            config,
            CommandInterpreter::new(links),
            effects,
            clock,
        ))
    }

    pub fn with_interpreter(
        config: &AppConfig,
        interpreter: CommandInterpreter,
        effects: E,
        clock: C,
    ) -> Self {
        Self {
            mode: Mode::Home,
            conversation: ConversationEngine::new(),
            lifecycle: ListenerLifecycle::new(),
            interpreter,
            scanning: false,
            resume_after_speech: false,
            max_utterance_len: config.voice.max_utterance_len,
            descriptor_len: config.identity.descriptor_len,
            effects,
            clock,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn conversation_state(&self) -> ConversationState {
        self.conversation.state()
    }

    pub fn draft(&self) -> Option<&DraftIdentity> {
        self.conversation.draft()
    }

    pub fn listener_state(&self) -> ListenerState {
        self.lifecycle.state()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn interpreter(&self) -> &CommandInterpreter {
        &self.interpreter
    }

    pub fn effects(&self) -> &E {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut E {
        &mut self.effects
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Handle one finalized transcript.
    ///
    /// The text is trimmed and lowercased first. A transcript arriving while
    /// the recognizer is idle is treated as push-to-talk and opens the
    /// microphone implicitly; one arriving while speech output is active is
    /// dropped with [`LifecycleError::Speaking`].
    pub fn submit_utterance(&mut self, raw: &str) -> Result<Dispatch, SessionError> {
        let text = raw.trim().to_lowercase();
        if let Err(e) = validation::validate_utterance(&text, self.max_utterance_len) {
            // The recognizer has already stopped after delivering this result
            self.lifecycle.apply(ListenerEvent::Ended)?;
            return Err(e.into());
        }

        if text.is_empty() {
            self.lifecycle.apply(ListenerEvent::Ended)?;
            return Ok(Dispatch::Empty);
        }

        if self.lifecycle.state() == ListenerState::Idle {
            self.lifecycle.apply(ListenerEvent::Start)?;
        }
        self.lifecycle.apply(ListenerEvent::Result)?;

        let result = self.dispatch(&text);

        self.lifecycle.apply(ListenerEvent::Done)?;
        result
    }

    fn dispatch(&mut self, text: &str) -> Result<Dispatch, SessionError> {
        let mode = self.mode;
        let now_ms = self.clock.now_ms();
        let today = self.clock.today();
        let mut fx = tracked!(self);

        fx.publish_last_command(LastCommand::new(text, now_ms));

        if self.conversation.is_active() {
            log::debug!(
                "Routing '{}' to enrollment interview ({:?})",
                text,
                self.conversation.state()
            );
            let state = self.conversation.respond(text, today, &mut fx)?;
            return Ok(Dispatch::Conversation(state));
        }

        Ok(match self.interpreter.interpret(text, mode, &mut fx) {
            Some(rule) => Dispatch::Command(rule),
            None => Dispatch::Ignored,
        })
    }

    /// Enter the vision scan that arms enrollment
    pub fn begin_scan(&mut self) {
        if !self.scanning {
            log::info!("Face scan started");
        }
        self.scanning = true;
        if self.mode != Mode::Vision {
            tracked!(self).set_mode(Mode::Vision);
        }
    }

    pub fn end_scan(&mut self) {
        if self.scanning {
            log::info!("Face scan ended");
        }
        self.scanning = false;
    }

    /// A scanned face held long enough: start the interview for it
    pub fn trigger_enrollment(&mut self, descriptor: Vec<f32>) -> Result<(), SessionError> {
        validation::validate_descriptor(&descriptor, self.descriptor_len)?;

        if !self.scanning {
            return Err(SessionError::NotScanning);
        }
        if self.conversation.is_active() {
            return Err(ConversationError::AlreadyActive(self.conversation.state()).into());
        }

        self.scanning = false;
        let mut fx = tracked!(self);
        self.conversation.start(descriptor, &mut fx)?;
        Ok(())
    }

    /// Abandon a running interview; true if one was running
    pub fn cancel_enrollment(&mut self) -> bool {
        self.scanning = false;
        let cancelled = self.conversation.cancel();
        if cancelled {
            tracked!(self).request_speech(CANCELLED, false);
        }
        cancelled
    }

    /// Microphone button: start listening, or stop and acknowledge.
    ///
    /// Stopping never rolls back interview progress.
    pub fn toggle_listening(&mut self) -> Result<ListenerState, SessionError> {
        if self.lifecycle.is_listening() {
            self.lifecycle.apply(ListenerEvent::Stop)?;
            tracked!(self).request_speech(CANCELLED, false);
        } else {
            self.lifecycle.apply(ListenerEvent::Start)?;
        }
        Ok(self.lifecycle.state())
    }

    /// The recognizer stopped without a result
    pub fn recognition_ended(&mut self) -> Result<ListenerState, SessionError> {
        Ok(self.lifecycle.apply(ListenerEvent::Ended)?)
    }

    /// Speech output completed; re-arms the microphone if the last prompt asked for it
    pub fn speech_finished(&mut self) -> ListenerState {
        self.lifecycle.speech_ended();
        if std::mem::take(&mut self.resume_after_speech)
            && self.lifecycle.state() == ListenerState::Idle
        {
            if let Err(e) = self.lifecycle.apply(ListenerEvent::Start) {
                log::warn!("Could not resume listening: {}", e);
            }
        }
        self.lifecycle.state()
    }

    /// Manual navigation from the shell (menu taps)
    pub fn set_mode(&mut self, mode: Mode) {
        tracked!(self).set_mode(mode);
    }

    /// Speak outside of any command (greetings, alerts)
    pub fn announce(&mut self, text: &str) {
        tracked!(self).request_speech(text, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::identity::AccessLevel;
    use crate::voice::commands::{GREETING, INTERFACE_MINIMIZED, MODULE_CLOSED};
    use crate::voice::effects::{Effect, EffectLog};
    use chrono::NaiveDate;

    const T0: u64 = 1_800_000_000_000;

    fn session() -> VoiceSession<EffectLog, FixedClock> {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        VoiceSession::new(&AppConfig::default(), EffectLog::new(), FixedClock::new(T0, today))
            .expect("session")
    }

    /// Submit and let the (instant) speech output finish
    fn say(s: &mut VoiceSession<EffectLog, FixedClock>, text: &str) -> Dispatch {
        let d = s.submit_utterance(text).expect("submit");
        s.speech_finished();
        d
    }

    fn descriptor() -> Vec<f32> {
        vec![0.1; 128]
    }

    fn enroll(s: &mut VoiceSession<EffectLog, FixedClock>) {
        s.begin_scan();
        s.trigger_enrollment(descriptor()).expect("trigger");
        s.speech_finished();
    }

    #[test]
    fn test_wake_opens_menu_with_one_speech() {
        let mut s = session();
        assert_eq!(say(&mut s, "  Hey JARVIS "), Dispatch::Command("wake"));
        assert_eq!(s.mode(), Mode::MenuOpen);
        assert_eq!(s.effects().spoken(), vec![GREETING]);
    }

    #[test]
    fn test_every_utterance_published_once() {
        let mut s = session();
        let inputs = ["jarvis", "mumble mumble", "open vision", "stop"];
        for (i, text) in inputs.iter().enumerate() {
            say(&mut s, text);
            s.clock().advance_ms(10);
            assert_eq!(s.effects().published().len(), i + 1);
        }

        let published = s.effects().published();
        assert_eq!(published[1], &LastCommand::new("mumble mumble", T0 + 10));
        assert_eq!(published[3].timestamp_ms, T0 + 30);
    }

    #[test]
    fn test_publish_comes_first() {
        let mut s = session();
        say(&mut s, "jarvis");
        assert!(matches!(s.effects().effects[0], Effect::Publish(_)));
    }

    #[test]
    fn test_unmatched_changes_nothing() {
        let mut s = session();
        s.set_mode(Mode::Media);
        s.effects_mut().clear();

        assert_eq!(say(&mut s, "what time is it"), Dispatch::Ignored);
        assert_eq!(s.mode(), Mode::Media);
        assert_eq!(s.conversation_state(), ConversationState::Idle);
        assert!(s.effects().spoken().is_empty());
        assert_eq!(s.effects().published().len(), 1);
    }

    #[test]
    fn test_close_then_decline() {
        let mut s = session();
        s.set_mode(Mode::Vision);
        s.effects_mut().clear();

        say(&mut s, "stop");
        assert_eq!(s.mode(), Mode::MenuOpen);
        assert_eq!(s.effects().spoken(), vec![MODULE_CLOSED]);
        // "Anything else?" re-arms the microphone
        assert_eq!(s.listener_state(), ListenerState::Listening);

        say(&mut s, "no");
        assert_eq!(s.mode(), Mode::Home);
        assert_eq!(s.effects().spoken().last(), Some(&INTERFACE_MINIMIZED));
    }

    #[test]
    fn test_enrollment_round_trip() {
        let mut s = session();
        enroll(&mut s);
        assert_eq!(s.conversation_state(), ConversationState::AskName);
        assert!(!s.is_scanning());

        assert_eq!(
            say(&mut s, "John Smith"),
            Dispatch::Conversation(ConversationState::AskGender)
        );
        say(&mut s, "male");
        say(&mut s, "34");
        assert_eq!(
            say(&mut s, "admin"),
            Dispatch::Conversation(ConversationState::Idle)
        );

        let commits = s.effects().commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].name, "john smith");
        assert_eq!(commits[0].age, "34");
        assert_eq!(commits[0].access_level, AccessLevel::Admin);
        assert!(s.draft().is_none());
        assert_eq!(s.conversation_state(), ConversationState::Idle);
    }

    #[test]
    fn test_dialogue_preempts_navigation() {
        let mut s = session();
        enroll(&mut s);
        let mode_before = s.mode();

        for answer in ["open the database", "jarvis stop", "close"] {
            let d = say(&mut s, answer);
            assert!(matches!(d, Dispatch::Conversation(_)), "{}", answer);
            assert_eq!(s.mode(), mode_before, "{}", answer);
        }
        assert_eq!(s.conversation_state(), ConversationState::AskAccess);
        assert_eq!(
            s.draft().and_then(|d| d.name.as_deref()),
            Some("open the database")
        );
    }

    #[test]
    fn test_trigger_requires_scan() {
        let mut s = session();
        assert!(matches!(
            s.trigger_enrollment(descriptor()),
            Err(SessionError::NotScanning)
        ));
        assert_eq!(s.conversation_state(), ConversationState::Idle);
    }

    #[test]
    fn test_trigger_rejects_bad_descriptor() {
        let mut s = session();
        s.begin_scan();
        assert!(matches!(
            s.trigger_enrollment(vec![0.1; 3]),
            Err(SessionError::Validation(_))
        ));
        assert!(s.is_scanning());
    }

    #[test]
    fn test_trigger_while_active() {
        let mut s = session();
        enroll(&mut s);
        s.begin_scan();
        assert!(matches!(
            s.trigger_enrollment(descriptor()),
            Err(SessionError::Conversation(ConversationError::AlreadyActive(
                ConversationState::AskName
            )))
        ));
    }

    #[test]
    fn test_begin_scan_switches_to_vision() {
        let mut s = session();
        s.begin_scan();
        assert_eq!(s.mode(), Mode::Vision);
        assert!(s.is_scanning());
        s.end_scan();
        assert!(!s.is_scanning());
    }

    #[test]
    fn test_cancel_enrollment() {
        let mut s = session();
        enroll(&mut s);
        say(&mut s, "pepper");
        assert!(s.cancel_enrollment());
        assert_eq!(s.conversation_state(), ConversationState::Idle);
        assert_eq!(s.effects().spoken().last(), Some(&CANCELLED));
        assert!(!s.cancel_enrollment());
        s.speech_finished();

        assert_eq!(say(&mut s, "jarvis"), Dispatch::Command("wake"));
    }

    #[test]
    fn test_toggle_listening_keeps_dialogue() {
        let mut s = session();
        enroll(&mut s);
        assert_eq!(s.listener_state(), ListenerState::Listening);

        assert_eq!(s.toggle_listening().expect("stop"), ListenerState::Idle);
        assert_eq!(s.conversation_state(), ConversationState::AskName);
        assert_eq!(s.effects().spoken().last(), Some(&CANCELLED));
        s.speech_finished();
        assert_eq!(s.listener_state(), ListenerState::Idle);

        assert_eq!(s.toggle_listening().expect("start"), ListenerState::Listening);
    }

    #[test]
    fn test_utterance_dropped_while_speaking() {
        let mut s = session();
        s.submit_utterance("jarvis").expect("wake");
        assert!(matches!(
            s.submit_utterance("open vision"),
            Err(SessionError::Lifecycle(LifecycleError::Speaking))
        ));
        assert_eq!(s.mode(), Mode::MenuOpen);
        assert_eq!(s.effects().published().len(), 1);
    }

    #[test]
    fn test_empty_utterance() {
        let mut s = session();
        s.toggle_listening().expect("start");
        assert_eq!(s.submit_utterance("   ").expect("empty"), Dispatch::Empty);
        assert_eq!(s.listener_state(), ListenerState::Idle);
        assert!(s.effects().published().is_empty());
    }

    #[test]
    fn test_invalid_utterance() {
        let mut s = session();
        assert!(matches!(
            s.submit_utterance(&"a".repeat(600)),
            Err(SessionError::Validation(_))
        ));
        assert_eq!(s.listener_state(), ListenerState::Idle);
    }

    #[test]
    fn test_rejected_transcript_stops_listener() {
        let mut s = session();
        assert_eq!(s.toggle_listening().expect("start"), ListenerState::Listening);

        assert!(matches!(
            s.submit_utterance("open\tvision"),
            Err(SessionError::Validation(_))
        ));
        assert_eq!(s.listener_state(), ListenerState::Idle);
        assert!(s.effects().published().is_empty());

        // The next press arms the microphone instead of cancelling
        assert_eq!(s.toggle_listening().expect("start"), ListenerState::Listening);
        assert!(s.effects().spoken().is_empty());
    }

    #[test]
    fn test_comms_deep_link() {
        let mut s = session();
        say(&mut s, "open comms");
        assert_eq!(s.mode(), Mode::CommsMenu);
        assert_eq!(say(&mut s, "instagram"), Dispatch::Command("comms_channel"));
        assert_eq!(
            s.effects().links()[0].as_str(),
            "https://instagram.com/"
        );
        assert_eq!(s.mode(), Mode::CommsMenu);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::voice::effects::EffectLog;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn session() -> VoiceSession<EffectLog, FixedClock> {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
        VoiceSession::new(&AppConfig::default(), EffectLog::new(), FixedClock::new(0, today))
            .expect("session")
    }

    proptest! {
        #[test]
        fn dialogue_answers_never_change_mode(
            answers in proptest::collection::vec(
                prop_oneof![
                    Just("open vision".to_string()),
                    Just("jarvis".to_string()),
                    Just("stop".to_string()),
                    Just("no".to_string()),
                    Just("drive home".to_string()),
                    "[a-z ]{1,24}",
                ],
                1..4,
            )
        ) {
            let mut s = session();
            s.begin_scan();
            s.trigger_enrollment(vec![0.2; 128]).expect("trigger");
            s.speech_finished();
            s.effects_mut().clear();

            for answer in &answers {
                let dispatch = s.submit_utterance(answer).expect("submit");
                s.speech_finished();
                prop_assert!(matches!(dispatch, Dispatch::Conversation(_) | Dispatch::Empty));
            }

            prop_assert_eq!(s.mode(), Mode::Vision);
            prop_assert!(s.effects().modes().is_empty());
            prop_assert!(s.effects().links().is_empty());
        }

        #[test]
        fn wake_phrase_opens_menu(
            prefix in "[a-z ]{0,12}",
            wake in prop_oneof![Just("jarvis"), Just("hey jarvis"), Just("hello")],
            suffix in "[a-z ]{0,12}",
        ) {
            let mut s = session();
            let text = format!("{}{}{}", prefix, wake, suffix);
            prop_assert_eq!(s.submit_utterance(&text).expect("submit"), Dispatch::Command("wake"));
            prop_assert_eq!(s.mode(), Mode::MenuOpen);
            prop_assert_eq!(s.effects().spoken().len(), 1);
            prop_assert_eq!(s.effects().published().len(), 1);
        }
    }
}
