// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure statistics over message timing.

use replyscope_core::{FirstContactPair, ResponsePair};
use serde::Serialize;

/// Min/max/average reply delay in seconds over a set of samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResponseTimeStats {
    pub min_secs: i64,
    pub max_secs: i64,
    pub avg_secs: f64,
    pub samples: u64,
}

impl ResponseTimeStats {
    /// Build from raw second samples. No samples yields all zeros.
    pub fn from_samples(samples: &[i64]) -> Self {
        let (Some(&min), Some(&max)) = (samples.iter().min(), samples.iter().max()) else {
            return Self::default();
        };
        let total: i64 = samples.iter().sum();
        Self {
            min_secs: min,
            max_secs: max,
            avg_secs: total as f64 / samples.len() as f64,
            samples: samples.len() as u64,
        }
    }

    /// Samples from inbound/reply pairs; unanswered inbound messages are skipped.
    pub fn from_pairs(pairs: &[ResponsePair]) -> Self {
        let samples: Vec<i64> = pairs
            .iter()
            .filter_map(|p| p.reply_at.map(|reply| reply - p.inbound_at))
            .collect();
        Self::from_samples(&samples)
    }
}

/// Average gap between a contact's first message and the first staff message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FirstResponseStats {
    pub avg_secs: f64,
    /// Contacts that have received a first response.
    pub contacts: u64,
}

impl FirstResponseStats {
    /// Contacts never answered are left out. Contacts opened by staff count as zero.
    pub fn from_pairs(pairs: &[FirstContactPair]) -> Self {
        let gaps: Vec<i64> = pairs
            .iter()
            .filter_map(|p| p.first_outbound_at.map(|out| (out - p.first_at).max(0)))
            .collect();
        if gaps.is_empty() {
            return Self::default();
        }
        Self {
            avg_secs: gaps.iter().sum::<i64>() as f64 / gaps.len() as f64,
            contacts: gaps.len() as u64,
        }
    }
}

/// Render a duration as `"42s"`, `"5min"`, or `"2h 10min"`.
///
/// Fractions are rounded to the nearest second; negative or non-finite input is `"0s"`.
pub fn format_duration(seconds: f64) -> String {
    let secs = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}min", secs / 60)
    } else {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        if minutes == 0 {
            format!("{hours}h")
        } else {
            format!("{hours}h {minutes}min")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn format_duration_examples() {
        assert_eq!(format_duration(42.0), "42s");
        assert_eq!(format_duration(300.0), "5min");
        assert_eq!(format_duration(7800.0), "2h 10min");
        assert_eq!(format_duration(7200.0), "2h");
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(-5.0), "0s");
        assert_eq!(format_duration(59.6), "1min");
    }

    #[test]
    fn empty_samples_are_all_zero() {
        assert_eq!(ResponseTimeStats::from_samples(&[]), ResponseTimeStats::default());
        assert_eq!(FirstResponseStats::from_pairs(&[]), FirstResponseStats::default());
    }

    #[test]
    fn unanswered_inbound_is_not_a_sample() {
        let pairs = [
            ResponsePair {
                contact_id: 1,
                inbound_at: 100,
                reply_at: Some(130),
            },
            ResponsePair {
                contact_id: 1,
                inbound_at: 200,
                reply_at: None,
            },
            ResponsePair {
                contact_id: 2,
                inbound_at: 100,
                reply_at: Some(190),
            },
        ];
        let stats = ResponseTimeStats::from_pairs(&pairs);
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.min_secs, 30);
        assert_eq!(stats.max_secs, 90);
        assert!((stats.avg_secs - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn first_response_skips_unanswered_contacts() {
        let pairs = [
            FirstContactPair {
                contact_id: 1,
                first_at: 0,
                first_outbound_at: Some(60),
            },
            FirstContactPair {
                contact_id: 2,
                first_at: 0,
                first_outbound_at: None,
            },
            FirstContactPair {
                contact_id: 3,
                first_at: 50,
                first_outbound_at: Some(50),
            },
        ];
        let stats = FirstResponseStats::from_pairs(&pairs);
        assert_eq!(stats.contacts, 2);
        assert!((stats.avg_secs - 30.0).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn stats_bound_the_average(samples in prop::collection::vec(0i64..1_000_000, 1..50)) {
            let stats = ResponseTimeStats::from_samples(&samples);
            prop_assert_eq!(stats.samples, samples.len() as u64);
            prop_assert!(stats.min_secs as f64 <= stats.avg_secs + 1e-9);
            prop_assert!(stats.avg_secs <= stats.max_secs as f64 + 1e-9);
        }

        #[test]
        fn format_duration_uses_one_unit_family(secs in 0u32..200_000) {
            let text = format_duration(f64::from(secs));
            if secs < 60 {
                prop_assert!(text.ends_with('s') && !text.contains("min"));
            } else if secs < 3600 {
                prop_assert!(text.ends_with("min") && !text.contains('h'));
            } else {
                prop_assert!(text.contains('h'));
            }
        }
    }
}
