use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, value_parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatbot_bench::config::{
    ChatSelectors, CombineConfig, DEFAULT_OUTPUT_FILE, DEFAULT_QUESTIONS_PER_USER,
    DEFAULT_TARGET_URL, DEFAULT_USERS, RunConfig, default_results_dir,
};
use chatbot_bench::questions::QuestionPool;
use chatbot_bench::{driver, report};

#[derive(Parser, Debug)]
#[command(name = "chatbot-bench", author, version, about = "Chatbot widget load-test harness", long_about = None)]
struct BenchCli {
    /// Increase logging verbosity.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Directory holding per-user result files (defaults to the platform
    /// data directory).
    #[arg(long, value_parser = value_parser!(PathBuf))]
    results_dir: Option<PathBuf>,

    /// Command to execute.
    #[command(subcommand)]
    command: BenchCommand,
}

#[derive(Subcommand, Debug)]
enum BenchCommand {
    /// Drive concurrent simulated users against the chat widget.
    Run(RunCommand),
    /// Merge per-user result files into the combined workbook.
    Combine(CombineCommand),
}

#[derive(Args, Debug)]
struct RunCommand {
    /// Chat widget URL to drive.
    #[arg(long, default_value = DEFAULT_TARGET_URL)]
    url: String,

    /// Number of concurrent simulated users.
    #[arg(long, default_value_t = DEFAULT_USERS)]
    users: u32,

    /// Number of questions each user asks.
    #[arg(long, default_value_t = DEFAULT_QUESTIONS_PER_USER)]
    questions_per_user: usize,

    /// File with one question per line (defaults to the built-in list).
    #[arg(long, value_parser = value_parser!(PathBuf))]
    questions: Option<PathBuf>,

    /// Run browsers with a visible window.
    #[arg(long, action = ArgAction::SetTrue)]
    headful: bool,
}

#[derive(Args, Debug)]
struct CombineCommand {
    /// Workbook path to write.
    #[arg(long, default_value = DEFAULT_OUTPUT_FILE, value_parser = value_parser!(PathBuf))]
    output: PathBuf,
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        "chatbot_bench=debug"
    } else {
        "chatbot_bench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = BenchCli::parse();
    init_tracing(cli.verbose);

    let results_dir = cli.results_dir.unwrap_or_else(default_results_dir);

    match &cli.command {
        BenchCommand::Run(cmd) => {
            let pool = match &cmd.questions {
                Some(path) => QuestionPool::from_file(path)?,
                None => QuestionPool::builtin(),
            };
            info!(questions = pool.len(), "Loaded question pool");
            let config = RunConfig {
                target_url: cmd.url.clone(),
                users: cmd.users,
                questions_per_user: cmd.questions_per_user,
                headless: !cmd.headful,
                results_dir,
                selectors: ChatSelectors::default(),
                ..RunConfig::default()
            };
            driver::run(&config, &pool)
        }
        BenchCommand::Combine(cmd) => report::combine(&CombineConfig {
            results_dir,
            output: cmd.output.clone(),
        }),
    }
}
