use serde::{Deserialize, Serialize};

/// Responsiveness buckets assigned to a single question/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApdexRating {
    Satisfactory,
    Tolerable,
    Frustrated,
    Unknown,
}

impl ApdexRating {
    /// All categories, in summary-sheet order.
    pub const ALL: [ApdexRating; 4] = [
        ApdexRating::Satisfactory,
        ApdexRating::Tolerable,
        ApdexRating::Frustrated,
        ApdexRating::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ApdexRating::Satisfactory => "Satisfactory",
            ApdexRating::Tolerable => "Tolerable",
            ApdexRating::Frustrated => "Frustrated",
            ApdexRating::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ApdexRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// First-response latencies below this are satisfactory.
pub const SATISFACTORY_UNDER_MS: i64 = 20_000;
/// Latencies below this (and not satisfactory) are tolerable.
pub const TOLERABLE_UNDER_MS: i64 = 26_000;
/// Latencies below this (and not tolerable) are frustrated; anything slower
/// is treated as never having responded.
pub const FRUSTRATED_UNDER_MS: i64 = 29_000;

/// Bucket a first-response latency in milliseconds.
///
/// Negative values (including the `-1` sentinel for "first stable content
/// never observed") classify as [`ApdexRating::Unknown`]. All bucket upper
/// bounds are exclusive.
pub fn classify(first_response_ms: i64) -> ApdexRating {
    if first_response_ms < 0 {
        return ApdexRating::Unknown;
    }
    match first_response_ms {
        ms if ms < SATISFACTORY_UNDER_MS => ApdexRating::Satisfactory,
        ms if ms < TOLERABLE_UNDER_MS => ApdexRating::Tolerable,
        ms if ms < FRUSTRATED_UNDER_MS => ApdexRating::Frustrated,
        _ => ApdexRating::Unknown,
    }
}

/// Classify a latency read back from a result file, where the field may be
/// absent or non-numeric.
pub fn classify_raw(first_response_ms: Option<i64>) -> ApdexRating {
    match first_response_ms {
        Some(ms) => classify(ms),
        None => ApdexRating::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_latency_is_unknown() {
        assert_eq!(classify(-1), ApdexRating::Unknown);
        assert_eq!(classify(-30_000), ApdexRating::Unknown);
        assert_eq!(classify(i64::MIN), ApdexRating::Unknown);
    }

    #[test]
    fn bucket_boundaries_are_exclusive() {
        assert_eq!(classify(0), ApdexRating::Satisfactory);
        assert_eq!(classify(19_999), ApdexRating::Satisfactory);
        assert_eq!(classify(20_000), ApdexRating::Tolerable);
        assert_eq!(classify(25_999), ApdexRating::Tolerable);
        assert_eq!(classify(26_000), ApdexRating::Frustrated);
        assert_eq!(classify(28_999), ApdexRating::Frustrated);
        assert_eq!(classify(29_000), ApdexRating::Unknown);
        assert_eq!(classify(i64::MAX), ApdexRating::Unknown);
    }

    #[test]
    fn badness_is_monotonic_within_defined_range() {
        fn badness(rating: ApdexRating) -> u8 {
            match rating {
                ApdexRating::Satisfactory => 0,
                ApdexRating::Tolerable => 1,
                ApdexRating::Frustrated => 2,
                ApdexRating::Unknown => 3,
            }
        }
        let mut previous = 0u8;
        for ms in (0..29_000).step_by(250) {
            let current = badness(classify(ms));
            assert!(current >= previous, "badness regressed at {ms}ms");
            previous = current;
        }
    }

    #[test]
    fn missing_value_is_unknown() {
        assert_eq!(classify_raw(None), ApdexRating::Unknown);
        assert_eq!(classify_raw(Some(-1)), ApdexRating::Unknown);
        assert_eq!(classify_raw(Some(5_000)), ApdexRating::Satisfactory);
    }

    #[test]
    fn serializes_as_plain_label() {
        let json = serde_json::to_string(&ApdexRating::Satisfactory).unwrap();
        assert_eq!(json, "\"Satisfactory\"");
    }
}
