use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::ValidationError;

/// Age recorded when the spoken answer carries no digits
pub const UNKNOWN_AGE: &str = "Unknown";

/// `dateAdded` format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// "female" anywhere in the answer wins, everything else is Male
    pub fn from_answer(answer: &str) -> Self {
        if answer.contains("female") {
            Gender::Female
        } else {
            Gender::Male
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("Male"),
            Gender::Female => f.write_str("Female"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessLevel {
    #[default]
    #[serde(rename = "No Access")]
    NoAccess,
    Medium,
    Admin,
    Missing,
}

impl AccessLevel {
    /// Keyword priority: admin, then medium, then missing. First hit wins.
    pub fn from_answer(answer: &str) -> Self {
        const KEYWORDS: &[(&str, AccessLevel)] = &[
            ("admin", AccessLevel::Admin),
            ("medium", AccessLevel::Medium),
            ("missing", AccessLevel::Missing),
        ];

        KEYWORDS
            .iter()
            .find(|(keyword, _)| answer.contains(keyword))
            .map(|(_, level)| *level)
            .unwrap_or(AccessLevel::NoAccess)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::NoAccess => "No Access",
            AccessLevel::Medium => "Medium",
            AccessLevel::Admin => "Admin",
            AccessLevel::Missing => "Missing",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keep only ASCII digits; an answer without any becomes "Unknown"
pub fn parse_age(answer: &str) -> String {
    let digits: String = answer.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        UNKNOWN_AGE.to_string()
    } else {
        digits
    }
}

/// A committed entry in the identity database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub name: String,
    pub gender: Gender,
    pub age: String,
    pub access_level: AccessLevel,
    /// Absent for records entered by hand without a photo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<Vec<f32>>,
    pub date_added: String,
}

/// Partial update applied by [`crate::identity::JsonIdentityStore::update`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityPatch {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<String>,
    pub access_level: Option<AccessLevel>,
}

impl IdentityPatch {
    /// Parse comma-separated `field=value` pairs.
    ///
    /// Fields are `name`, `gender`, `age` and `access`; values go through the
    /// same keyword rules as the spoken interview answers.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let mut patch = Self::default();

        for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (field, value) = pair.split_once('=').ok_or_else(|| {
                ValidationError::InvalidFormat(format!("Expected field=value, got '{}'", pair))
            })?;
            let value = value.trim();

            match field.trim().to_lowercase().as_str() {
                "name" => {
                    if value.is_empty() {
                        return Err(ValidationError::InvalidFormat(
                            "Name cannot be empty".to_string(),
                        ));
                    }
                    patch.name = Some(value.to_string());
                }
                "gender" => patch.gender = Some(Gender::from_answer(&value.to_lowercase())),
                "age" => patch.age = Some(parse_age(value)),
                "access" => {
                    patch.access_level = Some(AccessLevel::from_answer(&value.to_lowercase()))
                }
                other => {
                    return Err(ValidationError::InvalidFormat(format!(
                        "Unknown field '{}'",
                        other
                    )))
                }
            }
        }

        if patch == Self::default() {
            return Err(ValidationError::InvalidFormat("No fields given".to_string()));
        }
        Ok(patch)
    }
}

impl IdentityRecord {
    /// A record entered by hand, without a face descriptor
    pub fn manual(patch: IdentityPatch, date_added: NaiveDate) -> Result<Self, ValidationError> {
        let Some(name) = patch.name else {
            return Err(ValidationError::InvalidFormat("A name is required".to_string()));
        };

        Ok(Self {
            name,
            gender: patch.gender.unwrap_or(Gender::Male),
            age: patch.age.unwrap_or_else(|| UNKNOWN_AGE.to_string()),
            access_level: patch.access_level.unwrap_or_default(),
            descriptor: None,
            date_added: date_added.format(DATE_FORMAT).to_string(),
        })
    }

    pub fn apply(&mut self, patch: IdentityPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(gender) = patch.gender {
            self.gender = gender;
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(level) = patch.access_level {
            self.access_level = level;
        }
    }
}
