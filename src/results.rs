use serde::{Deserialize, Serialize};

use crate::apdex::{self, ApdexRating};

/// Response text stamped on a record when no response element ever appeared.
pub const TIMEOUT_RESPONSE_TEXT: &str = "Timeout: No response received";
/// Wire sentinel for "first stable content never observed".
pub const NO_FIRST_RESPONSE_MS: i64 = -1;

/// Outcome of a single question/response exchange, before wire formatting.
///
/// Downstream code matches on this instead of inspecting sentinel values;
/// sentinels only exist in the serialized [`ResultRecord`].
#[derive(Debug, Clone)]
pub enum ExchangeOutcome {
    /// A new response element appeared and latencies were measured.
    Answered {
        text: String,
        full_response_ms: i64,
        /// `None` when the final/hold condition never held within the
        /// polling window.
        first_response_ms: Option<i64>,
        /// Host busy fraction over the exchange; `None` when unmeasurable.
        cpu_busy: Option<f64>,
        memory_rss: String,
    },
    /// No new response element appeared within the bounded wait.
    NoResponse { timeout_ms: i64, memory_rss: String },
}

/// One row of the persisted per-user result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub user: String,
    pub message: String,
    pub response: String,
    pub full_response_time: i64,
    pub first_response_time: i64,
    pub apdex_rating: ApdexRating,
    pub cpu_usage_percent: String,
    #[serde(rename = "memoryUsageRSS")]
    pub memory_usage_rss: String,
}

impl ResultRecord {
    /// Flatten an exchange outcome into the wire representation. The stamped
    /// rating is always [`apdex::classify`] of the stamped first-response
    /// value.
    pub fn from_outcome(user: &str, message: &str, outcome: ExchangeOutcome) -> Self {
        match outcome {
            ExchangeOutcome::Answered {
                text,
                full_response_ms,
                first_response_ms,
                cpu_busy,
                memory_rss,
            } => {
                let first = first_response_ms.unwrap_or(NO_FIRST_RESPONSE_MS);
                Self {
                    user: user.to_string(),
                    message: message.to_string(),
                    response: text,
                    full_response_time: full_response_ms,
                    first_response_time: first,
                    apdex_rating: apdex::classify(first),
                    cpu_usage_percent: cpu_busy
                        .map(|busy| format!("{:.2}%", busy * 100.0))
                        .unwrap_or_else(|| "N/A".to_string()),
                    memory_usage_rss: memory_rss,
                }
            }
            ExchangeOutcome::NoResponse {
                timeout_ms,
                memory_rss,
            } => Self {
                user: user.to_string(),
                message: message.to_string(),
                response: TIMEOUT_RESPONSE_TEXT.to_string(),
                full_response_time: timeout_ms,
                first_response_time: NO_FIRST_RESPONSE_MS,
                apdex_rating: ApdexRating::Unknown,
                cpu_usage_percent: "N/A".to_string(),
                memory_usage_rss: memory_rss,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered(first_response_ms: Option<i64>) -> ExchangeOutcome {
        ExchangeOutcome::Answered {
            text: "The SEG Portal is a single sign-on portal.".to_string(),
            full_response_ms: 12_400,
            first_response_ms,
            cpu_busy: Some(0.4273),
            memory_rss: "1.25%".to_string(),
        }
    }

    #[test]
    fn answered_outcome_stamps_measured_values() {
        let record = ResultRecord::from_outcome("User 3", "What is a SEG Portal?", answered(Some(9_800)));
        assert_eq!(record.user, "User 3");
        assert_eq!(record.first_response_time, 9_800);
        assert_eq!(record.full_response_time, 12_400);
        assert_eq!(record.apdex_rating, ApdexRating::Satisfactory);
        assert_eq!(record.cpu_usage_percent, "42.73%");
        assert_eq!(record.memory_usage_rss, "1.25%");
    }

    #[test]
    fn unobserved_first_response_stamps_sentinel_and_unknown() {
        let record = ResultRecord::from_outcome("User 1", "q", answered(None));
        assert_eq!(record.first_response_time, NO_FIRST_RESPONSE_MS);
        assert_eq!(record.apdex_rating, ApdexRating::Unknown);
    }

    #[test]
    fn no_response_outcome_stamps_sentinels() {
        let outcome = ExchangeOutcome::NoResponse {
            timeout_ms: 30_000,
            memory_rss: "0.80%".to_string(),
        };
        let record = ResultRecord::from_outcome("User 2", "q", outcome);
        assert_eq!(record.response, TIMEOUT_RESPONSE_TEXT);
        assert_eq!(record.full_response_time, 30_000);
        assert_eq!(record.first_response_time, NO_FIRST_RESPONSE_MS);
        assert_eq!(record.apdex_rating, ApdexRating::Unknown);
        assert_eq!(record.cpu_usage_percent, "N/A");
    }

    #[test]
    fn wire_field_names_are_exact() {
        let record = ResultRecord::from_outcome("User 1", "q", answered(Some(1_000)));
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "user",
            "message",
            "response",
            "fullResponseTime",
            "firstResponseTime",
            "apdexRating",
            "cpuUsagePercent",
            "memoryUsageRSS",
        ] {
            assert!(object.contains_key(key), "missing wire field {key}");
        }
        assert_eq!(object.len(), 8);
    }
}
