//! Identity database
//!
//! Records enrolled through the voice interview, their JSON file store, and
//! descriptor matching used by the vision collaborator.

pub mod matcher;
pub mod record;
pub mod store;

pub use matcher::{best_match, AlertThrottle, Match, MISSING_PERSON_ALERT};
pub use record::{
    parse_age, AccessLevel, DATE_FORMAT, Gender, IdentityPatch, IdentityRecord, UNKNOWN_AGE,
};
pub use store::JsonIdentityStore;
