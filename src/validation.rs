/*
 * Input Validation Module
 *
 * Centralized validation for everything that crosses into the voice core:
 * recognizer transcripts, face descriptors from the vision collaborator,
 * and deep-link targets read from configuration.
 */
use thiserror::Error;
use url::Url;

/// Schemes the shell is allowed to hand to the platform opener
pub const ALLOWED_LINK_SCHEMES: &[&str] = &["http", "https", "viber"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Value too long: max {max}, got {actual}")]
    ValueTooLong { max: usize, actual: usize },

    #[error("Descriptor length mismatch: expected {expected}, got {actual}")]
    DescriptorLength { expected: usize, actual: usize },
}

/// Validate a transcript (max `max_len` bytes, no control characters)
pub fn validate_utterance(text: &str, max_len: usize) -> Result<&str, ValidationError> {
    if text.len() > max_len {
        return Err(ValidationError::ValueTooLong {
            max: max_len,
            actual: text.len(),
        });
    }

    if text.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat(
            "Utterance contains control characters".to_string(),
        ));
    }

    Ok(text)
}

/// Validate a biometric descriptor (exact length, finite components)
pub fn validate_descriptor(descriptor: &[f32], expected_len: usize) -> Result<(), ValidationError> {
    if descriptor.len() != expected_len {
        return Err(ValidationError::DescriptorLength {
            expected: expected_len,
            actual: descriptor.len(),
        });
    }

    if let Some(pos) = descriptor.iter().position(|v| !v.is_finite()) {
        return Err(ValidationError::InvalidRange(format!(
            "Descriptor component {} is not finite",
            pos
        )));
    }

    Ok(())
}

/// Validate a deep-link target and parse it
pub fn validate_link(raw: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(raw)
        .map_err(|e| ValidationError::InvalidFormat(format!("Invalid link '{}': {}", raw, e)))?;

    if !ALLOWED_LINK_SCHEMES.contains(&url.scheme()) {
        return Err(ValidationError::InvalidFormat(format!(
            "Link scheme '{}' is not allowed",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Validate a distance threshold for descriptor matching (0.0 exclusive to 2.0)
pub fn validate_match_threshold(threshold: f32) -> Result<f32, ValidationError> {
    if !(threshold > 0.0 && threshold <= 2.0) {
        return Err(ValidationError::InvalidRange(format!(
            "Match threshold must be in (0.0, 2.0], got {}",
            threshold
        )));
    }
    Ok(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_valid() {
        assert!(validate_utterance("open vision", 64).is_ok());
        assert!(validate_utterance("", 64).is_ok());
    }

    #[test]
    fn test_utterance_invalid() {
        assert!(validate_utterance(&"a".repeat(65), 64).is_err());
        assert!(validate_utterance("open\nvision", 64).is_err());
        assert!(validate_utterance("jar\x00vis", 64).is_err());
    }

    #[test]
    fn test_descriptor_length() {
        assert!(validate_descriptor(&[0.1; 128], 128).is_ok());
        assert_eq!(
            validate_descriptor(&[0.1; 4], 128),
            Err(ValidationError::DescriptorLength {
                expected: 128,
                actual: 4
            })
        );
    }

    #[test]
    fn test_descriptor_not_finite() {
        let mut d = vec![0.0f32; 8];
        d[3] = f32::NAN;
        assert!(validate_descriptor(&d, 8).is_err());
        d[3] = f32::INFINITY;
        assert!(validate_descriptor(&d, 8).is_err());
    }

    #[test]
    fn test_links() {
        assert!(validate_link("https://www.google.com/maps").is_ok());
        assert!(validate_link("viber://chat").is_ok());
        assert!(validate_link("javascript:alert(1)").is_err());
        assert!(validate_link("file:///etc/passwd").is_err());
        assert!(validate_link("not a url").is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn utterance_rejects_controls(s in r"[a-z ]{0,8}[\x00-\x1F\x7F][a-z ]{0,8}") {
            assert!(validate_utterance(&s, 512).is_err());
        }

        #[test]
        fn utterance_accepts_plain_speech(s in r"[a-z0-9 ']{0,128}") {
            assert!(validate_utterance(&s, 512).is_ok());
        }

        #[test]
        fn threshold_in_range(x in 0.001f32..2.0) {
            assert!(validate_match_threshold(x).is_ok());
        }

        #[test]
        fn threshold_outside_range(x in any::<f32>().prop_filter("out of (0,2]", |v| !(*v > 0.0 && *v <= 2.0))) {
            assert!(validate_match_threshold(x).is_err());
        }
    }
}
