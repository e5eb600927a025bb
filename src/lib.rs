//! JARVIS voice core
//!
//! Command interpretation, the face enrollment interview and the identity
//! database behind the HUD. The `jarvis` binary drives it from a console.

pub mod clock;
pub mod config;
pub mod identity;
pub mod media;
pub mod paths;
pub mod validation;
pub mod voice;

pub use config::AppConfig;
pub use paths::AppPaths;
