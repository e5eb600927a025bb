//! Command interpreter
//!
//! Maps one normalized utterance to effects through an ordered table of
//! named rules. Rules are tried in priority order and the first whose
//! predicate matches runs its handler; nothing else fires. An utterance that
//! matches no rule is ignored.
//!
//! | Priority | Rule            | Trigger                                         |
//! |----------|-----------------|-------------------------------------------------|
//! | 1        | `wake`          | "jarvis", "hey jarvis", "hello"                 |
//! | 2        | `navigate`      | "open"/"start"/"let's" + a panel keyword        |
//! | 3        | `route_home`    | "drive home", "navigate home"                   |
//! | 4        | `open_maps`     | "open maps"                                     |
//! | 5        | `comms_channel` | a channel keyword while the comms menu is open  |
//! | 6        | `close`         | "close", "exit", "stop"                         |
//! | 7        | `confirm`       | "yes" while the menu is open                    |
//! | 8        | `decline`       | "no" while the menu is open                     |

use url::Url;

use super::effects::Effects;
use super::mode::Mode;
use crate::config::LinkConfig;
use crate::validation::{self, ValidationError};

const WAKE_PHRASES: &[&str] = &["jarvis", "hey jarvis", "hello"];
const NAVIGATION_VERBS: &[&str] = &["open", "start", "let's"];
const ROUTE_HOME_PHRASES: &[&str] = &["drive home", "navigate home"];
const CLOSE_PHRASES: &[&str] = &["close", "exit", "stop"];

/// Panel keywords, checked in order, with the spoken acknowledgment
const NAVIGATION_TARGETS: &[(&[&str], Mode, &str)] = &[
    (&["drive", "hud"], Mode::Hud, "Driving protocols initiated."),
    (&["vision", "camera"], Mode::Vision, "Visual sensors active."),
    (&["media", "music"], Mode::Media, "Media player ready."),
    (&["database"], Mode::Database, "Accessing records."),
    (&["ops", "incident"], Mode::Ops, "Operations center online."),
    (&["recon", "sales"], Mode::Recon, "Sales targeting engaged."),
    (&["guardian"], Mode::Guardian, "Guardian uplink established."),
    (&["comms"], Mode::CommsMenu, "Comms channels open."),
];

pub const GREETING: &str = "Sir?";
pub const MODULE_CLOSED: &str = "Module closed. Anything else?";
pub const STANDING_BY: &str = "Standing by.";
pub const AWAITING_COMMAND: &str = "Awaiting command.";
pub const INTERFACE_MINIMIZED: &str = "Interface minimized.";
pub const ROUTE_HOME_ACK: &str = "Setting coordinates for Home Base.";
pub const OPEN_MAPS_ACK: &str = "Opening global positioning.";

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn navigation_target(text: &str) -> Option<(Mode, &'static str)> {
    if !contains_any(text, NAVIGATION_VERBS) {
        return None;
    }
    NAVIGATION_TARGETS
        .iter()
        .find(|(keywords, _, _)| contains_any(text, keywords))
        .map(|(_, mode, ack)| (*mode, *ack))
}

/// Parsed deep-link targets
#[derive(Debug, Clone, PartialEq)]
pub struct Links {
    pub home_route: Url,
    pub maps: Url,
    pub comms: Vec<CommsLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommsLink {
    pub keyword: String,
    pub label: String,
    pub url: Url,
}

impl Links {
    pub fn from_config(config: &LinkConfig) -> Result<Self, ValidationError> {
        let comms = config
            .comms
            .iter()
            .map(|c| {
                Ok(CommsLink {
                    keyword: c.keyword.to_lowercase(),
                    label: c.label.clone(),
                    url: validation::validate_link(&c.url)?,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Self {
            home_route: validation::validate_link(&config.home_route_url)?,
            maps: validation::validate_link(&config.maps_url)?,
            comms,
        })
    }

    fn comms_channel(&self, text: &str) -> Option<&CommsLink> {
        self.comms.iter().find(|c| text.contains(c.keyword.as_str()))
    }
}

/// What a rule sees when it is evaluated
pub struct CommandContext<'a> {
    pub utterance: &'a str,
    pub mode: Mode,
    pub links: &'a Links,
}

/// A named (predicate, handler) pair
pub struct CommandRule {
    pub name: &'static str,
    pub matches: fn(&CommandContext<'_>) -> bool,
    pub run: fn(&CommandContext<'_>, &mut dyn Effects),
}

impl std::fmt::Debug for CommandRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRule").field("name", &self.name).finish()
    }
}

/// The built-in rule table in priority order
pub fn default_rules() -> Vec<CommandRule> {
    vec![
        CommandRule {
            name: "wake",
            matches: |ctx| contains_any(ctx.utterance, WAKE_PHRASES),
            run: |_, fx| {
                fx.set_mode(Mode::MenuOpen);
                fx.request_speech(GREETING, false);
            },
        },
        CommandRule {
            name: "navigate",
            matches: |ctx| navigation_target(ctx.utterance).is_some(),
            run: |ctx, fx| {
                if let Some((mode, ack)) = navigation_target(ctx.utterance) {
                    fx.set_mode(mode);
                    fx.request_speech(ack, false);
                }
            },
        },
        CommandRule {
            name: "route_home",
            matches: |ctx| contains_any(ctx.utterance, ROUTE_HOME_PHRASES),
            run: |ctx, fx| {
                fx.request_speech(ROUTE_HOME_ACK, false);
                fx.open_external_link(&ctx.links.home_route);
            },
        },
        CommandRule {
            name: "open_maps",
            matches: |ctx| ctx.utterance.contains("open maps"),
            run: |ctx, fx| {
                fx.request_speech(OPEN_MAPS_ACK, false);
                fx.open_external_link(&ctx.links.maps);
            },
        },
        CommandRule {
            name: "comms_channel",
            matches: |ctx| {
                ctx.mode == Mode::CommsMenu && ctx.links.comms_channel(ctx.utterance).is_some()
            },
            run: |ctx, fx| {
                if let Some(channel) = ctx.links.comms_channel(ctx.utterance) {
                    fx.request_speech(&format!("Opening {}.", channel.label), false);
                    fx.open_external_link(&channel.url);
                }
            },
        },
        CommandRule {
            name: "close",
            matches: |ctx| contains_any(ctx.utterance, CLOSE_PHRASES),
            run: |ctx, fx| {
                if ctx.mode != Mode::Home {
                    fx.set_mode(Mode::MenuOpen);
                    fx.request_speech(MODULE_CLOSED, true);
                } else {
                    fx.set_mode(Mode::Home);
                    fx.request_speech(STANDING_BY, false);
                }
            },
        },
        CommandRule {
            name: "confirm",
            matches: |ctx| ctx.mode == Mode::MenuOpen && ctx.utterance.contains("yes"),
            run: |_, fx| fx.request_speech(AWAITING_COMMAND, true),
        },
        CommandRule {
            name: "decline",
            matches: |ctx| ctx.mode == Mode::MenuOpen && ctx.utterance.contains("no"),
            run: |_, fx| {
                fx.set_mode(Mode::Home);
                fx.request_speech(INTERFACE_MINIMIZED, false);
            },
        },
    ]
}

#[derive(Debug)]
pub struct CommandInterpreter {
    rules: Vec<CommandRule>,
    links: Links,
}

impl CommandInterpreter {
    pub fn new(links: Links) -> Self {
        Self::with_rules(links, default_rules())
    }

    pub fn with_rules(links: Links, rules: Vec<CommandRule>) -> Self {
        Self { rules, links }
    }

    /// Rule names in evaluation order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    /// The first rule matching `utterance` in `mode`, without running it
    pub fn find(&self, utterance: &str, mode: Mode) -> Option<&CommandRule> {
        let ctx = CommandContext {
            utterance,
            mode,
            links: &self.links,
        };
        self.rules.iter().find(|rule| (rule.matches)(&ctx))
    }

    /// Run the first matching rule; returns its name, or None if ignored
    pub fn interpret(
        &self,
        utterance: &str,
        mode: Mode,
        effects: &mut dyn Effects,
    ) -> Option<&'static str> {
        let ctx = CommandContext {
            utterance,
            mode,
            links: &self.links,
        };

        match self.rules.iter().find(|rule| (rule.matches)(&ctx)) {
            Some(rule) => {
                log::debug!("Utterance '{}' matched rule '{}' in {}", utterance, rule.name, mode);
                (rule.run)(&ctx, effects);
                Some(rule.name)
            }
            None => {
                log::debug!("Utterance '{}' matched no rule in {}", utterance, mode);
                None
            }
        }
    }
}
