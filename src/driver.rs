use std::fs;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::questions::QuestionPool;
use crate::resources::{self, CpuSnapshot};
use crate::results::{ExchangeOutcome, ResultRecord};

/// Run the full load test: one worker thread per simulated user, each owning
/// its own browser and its own output file. Workers never share state; a
/// failing worker is logged and does not abort the run.
pub fn run(config: &RunConfig, pool: &QuestionPool) -> Result<()> {
    fs::create_dir_all(&config.results_dir).with_context(|| {
        format!(
            "Failed to create results directory {}",
            config.results_dir.display()
        )
    })?;

    info!(
        users = config.users,
        questions_per_user = config.questions_per_user,
        url = %config.target_url,
        results_dir = %config.results_dir.display(),
        "Starting load test"
    );

    thread::scope(|scope| {
        let mut workers = Vec::with_capacity(config.users as usize);
        for user_id in 1..=config.users {
            workers.push((user_id, scope.spawn(move || run_user(config, pool, user_id))));
        }
        for (user_id, worker) in workers {
            match worker.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(user = user_id, error = %err, "Worker finished with error"),
                Err(_) => warn!(user = user_id, "Worker panicked"),
            }
        }
    });

    info!("All workers finished");
    Ok(())
}

/// One simulated user: open the widget, ask the configured number of random
/// questions, persist the per-user result file.
fn run_user(config: &RunConfig, pool: &QuestionPool, user_id: u32) -> Result<()> {
    let user = format!("User {user_id}");
    let options = LaunchOptions::default_builder()
        .headless(config.headless)
        .build()
        .map_err(|err| anyhow!("Failed to assemble browser launch options: {err}"))?;
    let browser = Browser::new(options).context("Failed to launch browser")?;
    let tab = browser.new_tab().context("Failed to open tab")?;
    tab.navigate_to(&config.target_url)
        .with_context(|| format!("Failed to navigate to {}", config.target_url))?;
    tab.wait_until_navigated()
        .context("Navigation did not settle")?;

    if let Some(selector) = &config.selectors.launcher {
        tab.wait_for_element_with_custom_timeout(selector, config.wait_timeout)
            .and_then(|launcher| launcher.click().map(|_| ()))
            .with_context(|| format!("Failed to open chat widget via {selector}"))?;
    }

    // The greeting is the first response element; its absence is survivable.
    if !wait_for_count(&tab, &config.selectors.response, 1, config) {
        warn!(user = %user, "Greeting not found within the wait window, proceeding");
    }

    let questions = pool.pick(config.questions_per_user);
    let mut records = Vec::with_capacity(questions.len());
    for question in &questions {
        let outcome = ask_question(&tab, config, &user, question);
        records.push(ResultRecord::from_outcome(&user, question, outcome));
    }

    let path = config.results_dir.join(format!("user-{user_id}.json"));
    let payload = serde_json::to_string_pretty(&records)?;
    fs::write(&path, payload).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        user = %user,
        path = %path.display(),
        records = records.len(),
        "Saved user results"
    );

    if records.len() != questions.len() {
        warn!(
            user = %user,
            expected = questions.len(),
            actual = records.len(),
            "Result count does not match questions asked"
        );
    }

    Ok(())
}

/// One question/response exchange. Always yields an outcome: every wait is
/// soft-bounded and a timeout degrades the record rather than failing the
/// worker.
fn ask_question(tab: &Tab, config: &RunConfig, user: &str, question: &str) -> ExchangeOutcome {
    let cpu_before = CpuSnapshot::capture();
    let initial_responses = count_matches(tab, &config.selectors.response);
    let initial_completions = count_matches(tab, &config.selectors.completion);
    let timeout_ms = config.wait_timeout.as_millis() as i64;

    if let Err(err) = submit_question(tab, config, question) {
        warn!(user = %user, question = %question, error = %err, "Failed to submit question");
        return ExchangeOutcome::NoResponse {
            timeout_ms,
            memory_rss: resources::rss_percent(),
        };
    }
    let start = Instant::now();

    if !wait_for_count(
        tab,
        &config.selectors.response,
        initial_responses + 1,
        config,
    ) {
        warn!(user = %user, question = %question, "No new response within the wait window");
        return ExchangeOutcome::NoResponse {
            timeout_ms,
            memory_rss: resources::rss_percent(),
        };
    }

    // The new response sits at the index of the previous count.
    let first_response_ms = poll_first_response(tab, config, initial_responses, start);
    if first_response_ms.is_none() {
        warn!(
            user = %user,
            question = %question,
            "First stable content not observed within the polling window"
        );
    }

    if !wait_for_count(
        tab,
        &config.selectors.completion,
        initial_completions + 1,
        config,
    ) {
        warn!(
            user = %user,
            question = %question,
            "Completion indicator not found within the wait window"
        );
    }
    let full_response_ms = start.elapsed().as_millis() as i64;

    let cpu_busy = match (cpu_before, CpuSnapshot::capture()) {
        (Some(before), Some(after)) => resources::busy_fraction(&before, &after),
        _ => None,
    };

    ExchangeOutcome::Answered {
        text: response_text(tab, &config.selectors.response, initial_responses),
        full_response_ms,
        first_response_ms,
        cpu_busy,
        memory_rss: resources::rss_percent(),
    }
}

fn submit_question(tab: &Tab, config: &RunConfig, question: &str) -> Result<()> {
    tab.wait_for_element_with_custom_timeout(&config.selectors.textbox, config.wait_timeout)?
        .click()?;
    tab.type_str(question)?;
    tab.wait_for_element_with_custom_timeout(&config.selectors.send_button, config.wait_timeout)?
        .click()?;
    Ok(())
}

/// Poll until at least `target` elements match `selector`, bounded by the
/// configured wait timeout.
fn wait_for_count(tab: &Tab, selector: &str, target: usize, config: &RunConfig) -> bool {
    let deadline = Instant::now() + config.wait_timeout;
    loop {
        if count_matches(tab, selector) >= target {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(config.poll_interval);
    }
}

/// Poll the new response element for "final content present AND hold content
/// absent"; the first observation fixes the first-response latency.
fn poll_first_response(
    tab: &Tab,
    config: &RunConfig,
    response_index: usize,
    start: Instant,
) -> Option<i64> {
    let deadline = Instant::now() + config.wait_timeout;
    while Instant::now() < deadline {
        let finals = scoped_count(
            tab,
            &config.selectors.response,
            response_index,
            &config.selectors.final_marker,
        );
        let holds = scoped_count(
            tab,
            &config.selectors.response,
            response_index,
            &config.selectors.hold_marker,
        );
        if finals > 0 && holds == 0 {
            return Some(start.elapsed().as_millis() as i64);
        }
        thread::sleep(config.poll_interval);
    }
    None
}

/// Quote a CSS selector as a JS string literal.
fn js_quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

fn eval_u64(tab: &Tab, expression: &str) -> Option<u64> {
    tab.evaluate(expression, false)
        .ok()
        .and_then(|object| object.value)
        .and_then(|value| value.as_u64())
}

/// Count elements matching `selector` in the page. DOM interrogation goes
/// through JS evaluation so that count polling never throws on zero matches.
fn count_matches(tab: &Tab, selector: &str) -> usize {
    let expression = format!(
        "document.querySelectorAll({}).length",
        js_quote(selector)
    );
    eval_u64(tab, &expression).unwrap_or(0) as usize
}

/// Count `marker` matches scoped to the `index`-th `container` element.
fn scoped_count(tab: &Tab, container: &str, index: usize, marker: &str) -> usize {
    let expression = format!(
        "(() => {{ const el = document.querySelectorAll({})[{}]; return el ? el.querySelectorAll({}).length : 0; }})()",
        js_quote(container),
        index,
        js_quote(marker)
    );
    eval_u64(tab, &expression).unwrap_or(0) as usize
}

/// Text content of the `index`-th `container` element, normalized.
fn response_text(tab: &Tab, container: &str, index: usize) -> String {
    let expression = format!(
        "(() => {{ const el = document.querySelectorAll({})[{}]; return el ? el.textContent : ''; }})()",
        js_quote(container),
        index
    );
    let raw = tab
        .evaluate(&expression, false)
        .ok()
        .and_then(|object| object.value)
        .and_then(|value| value.as_str().map(String::from))
        .unwrap_or_default();
    clean_text(&raw)
}

/// Collapse whitespace runs and trim; empty responses become "No response".
fn clean_text(raw: &str) -> String {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        "No response".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(
            clean_text("  SarawakID is a\n\n digital identity.\t "),
            "SarawakID is a digital identity."
        );
    }

    #[test]
    fn clean_text_substitutes_empty_responses() {
        assert_eq!(clean_text(""), "No response");
        assert_eq!(clean_text("   \n\t"), "No response");
    }

    #[test]
    fn js_quote_escapes_selector_literals() {
        assert_eq!(
            js_quote("[data-response=\"final-response\"]"),
            "\"[data-response=\\\"final-response\\\"]\""
        );
    }
}
