//! Descriptor matching against the identity database.

use super::record::{AccessLevel, IdentityRecord};

/// Spoken when a record flagged Missing is in view
pub const MISSING_PERSON_ALERT: &str = "Alert, Sir. Missing person detected in sector.";

/// A record whose descriptor is close enough to a probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    pub index: usize,
    pub record: &'a IdentityRecord,
    pub distance: f32,
}

impl Match<'_> {
    pub fn is_missing_person(&self) -> bool {
        self.record.access_level == AccessLevel::Missing
    }
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Closest record strictly below `threshold`.
///
/// Records without a descriptor, or with one of a different length, are
/// never candidates.
pub fn best_match<'a>(
    records: &'a [IdentityRecord],
    probe: &[f32],
    threshold: f32,
) -> Option<Match<'a>> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let stored = record.descriptor.as_deref()?;
            if stored.len() != probe.len() {
                return None;
            }
            let distance = euclidean_distance(stored, probe);
            (distance < threshold).then_some(Match {
                index,
                record,
                distance,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Rate limit for the spoken missing-person alert
#[derive(Debug, Clone)]
pub struct AlertThrottle {
    interval_ms: u64,
    last_fired_ms: Option<u64>,
}

impl AlertThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fired_ms: None,
        }
    }

    /// True when the alert may fire now; records the firing
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        match self.last_fired_ms {
            Some(last) if now_ms.saturating_sub(last) <= self.interval_ms => false,
            _ => {
                self.last_fired_ms = Some(now_ms);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::record::Gender;

    fn record(name: &str, level: AccessLevel, descriptor: Option<Vec<f32>>) -> IdentityRecord {
        IdentityRecord {
            name: name.to_string(),
            gender: Gender::Male,
            age: "40".to_string(),
            access_level: level,
            descriptor,
            date_added: "2026-10-16".to_string(),
        }
    }

    #[test]
    fn test_distance() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_best_match_picks_closest_under_threshold() {
        let records = vec![
            record("far", AccessLevel::Admin, Some(vec![0.5, 0.0])),
            record("near", AccessLevel::Medium, Some(vec![0.1, 0.0])),
            record("manual", AccessLevel::Admin, None),
            record("short", AccessLevel::Admin, Some(vec![0.0])),
        ];

        let hit = best_match(&records, &[0.0, 0.0], 0.6).expect("match");
        assert_eq!(hit.index, 1);
        assert_eq!(hit.record.name, "near");
        assert!(!hit.is_missing_person());
    }

    #[test]
    fn test_threshold_is_strict() {
        let records = vec![record("edge", AccessLevel::Admin, Some(vec![0.5, 0.0]))];
        assert!(best_match(&records, &[0.0, 0.0], 0.5).is_none());
        assert!(best_match(&records, &[0.25, 0.0], 0.5).is_some());
    }

    #[test]
    fn test_missing_person_flag() {
        let records = vec![record("lost", AccessLevel::Missing, Some(vec![0.0, 0.0]))];
        assert!(best_match(&records, &[0.0, 0.0], 0.6)
            .expect("match")
            .is_missing_person());
    }

    #[test]
    fn test_alert_throttle() {
        let mut throttle = AlertThrottle::new(15_000);
        assert!(throttle.try_fire(1_000));
        assert!(!throttle.try_fire(5_000));
        assert!(!throttle.try_fire(16_000));
        assert!(throttle.try_fire(16_001));
    }
}
