use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

/// Chat widget URL driven when none is supplied on the command line.
pub const DEFAULT_TARGET_URL: &str = "https://aivie-tnt.sains.com.my/dayang_azure";
/// Default workbook file written by the aggregator.
pub const DEFAULT_OUTPUT_FILE: &str = "chatbot-responses-combined.xlsx";
/// Default number of concurrent simulated users.
pub const DEFAULT_USERS: u32 = 30;
/// Default number of questions each user asks.
pub const DEFAULT_QUESTIONS_PER_USER: usize = 5;
/// Upper bound applied to every in-page wait.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(30);
/// Interval between DOM polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// CSS selectors describing the chat widget under test. Defaults target the
/// Dify bubble widget the harness was written against.
#[derive(Debug, Clone)]
pub struct ChatSelectors {
    /// Element clicked to expand the chat bubble; `None` when the widget
    /// starts open.
    pub launcher: Option<String>,
    /// Message input.
    pub textbox: String,
    /// Submit button next to the input.
    pub send_button: String,
    /// Container matched once per bot response.
    pub response: String,
    /// Marker present inside a response once stable content has rendered.
    pub final_marker: String,
    /// Marker present while a response is still streaming.
    pub hold_marker: String,
    /// Indicator appearing once per fully completed response.
    pub completion: String,
}

impl Default for ChatSelectors {
    fn default() -> Self {
        Self {
            launcher: Some("#dify-chatbot-bubble-button".to_string()),
            textbox: "textarea[placeholder=\"Talk to Bot\"]".to_string(),
            send_button: ".chat-input-area button".to_string(),
            response: ".chat-answer-container .markdown-body".to_string(),
            final_marker: "[data-response=\"final-response\"]".to_string(),
            hold_marker: "[data-response=\"hold-response\"]".to_string(),
            completion: "#check-circle".to_string(),
        }
    }
}

/// Configuration for one load-test run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target_url: String,
    pub users: u32,
    pub questions_per_user: usize,
    pub headless: bool,
    /// Directory receiving one `user-<N>.json` file per worker. Created by
    /// the driver when absent.
    pub results_dir: PathBuf,
    pub selectors: ChatSelectors,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            users: DEFAULT_USERS,
            questions_per_user: DEFAULT_QUESTIONS_PER_USER,
            headless: true,
            results_dir: default_results_dir(),
            selectors: ChatSelectors::default(),
            wait_timeout: WAIT_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Configuration for combining per-user result files into a workbook.
#[derive(Debug, Clone)]
pub struct CombineConfig {
    /// Directory scanned for `*.json` result files. Must already exist; the
    /// aggregator never creates it.
    pub results_dir: PathBuf,
    pub output: PathBuf,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
        }
    }
}

/// Platform data directory for result files, with a relative fallback.
pub fn default_results_dir() -> PathBuf {
    ProjectDirs::from("my", "sains", "chatbot-bench")
        .map(|dirs| dirs.data_dir().join("chatbot-temp"))
        .unwrap_or_else(|| PathBuf::from("./chatbot-temp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_match_documented_tunables() {
        let config = RunConfig::default();
        assert_eq!(config.users, 30);
        assert_eq!(config.questions_per_user, 5);
        assert!(config.headless);
        assert_eq!(config.wait_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(300));
    }

    #[test]
    fn combine_defaults_share_the_results_dir() {
        let run = RunConfig::default();
        let combine = CombineConfig::default();
        assert_eq!(run.results_dir, combine.results_dir);
        assert_eq!(combine.output, PathBuf::from(DEFAULT_OUTPUT_FILE));
    }
}
