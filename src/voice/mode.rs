use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The top-level panel the HUD is displaying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    Home,
    MenuOpen,
    Vision,
    Database,
    /// Driving heads-up display
    Hud,
    Media,
    Ops,
    Recon,
    Guardian,
    CommsMenu,
}

impl Mode {
    pub const ALL: [Mode; 10] = [
        Mode::Home,
        Mode::MenuOpen,
        Mode::Vision,
        Mode::Database,
        Mode::Hud,
        Mode::Media,
        Mode::Ops,
        Mode::Recon,
        Mode::Guardian,
        Mode::CommsMenu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Home => "HOME",
            Mode::MenuOpen => "MENU_OPEN",
            Mode::Vision => "VISION",
            Mode::Database => "DATABASE",
            Mode::Hud => "HUD",
            Mode::Media => "MEDIA",
            Mode::Ops => "OPS",
            Mode::Recon => "RECON",
            Mode::Guardian => "GUARDIAN",
            Mode::CommsMenu => "COMMS_MENU",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| format!("Unknown mode: {}", s))
    }
}
