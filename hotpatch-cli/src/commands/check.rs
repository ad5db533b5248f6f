//! `hotpatch check` - run one check and download every pending patch.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use clap::Args;
use console::style;
use hotpatch::config::ConfigFile;
use hotpatch::executor::TokioTaskExecutor;
use hotpatch::telemetry::MetricsSnapshot;
use hotpatch::transport::{HttpCheckTransport, HttpDownloadTransport};
use hotpatch::{
    Collaborators, DownloadTaskListener, InMemoryPatchRegistry, PatchRegistry, UpdateOrchestrator,
    UpdateState,
};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::CliError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Arguments for `hotpatch check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Check endpoint (overrides server.check_url)
    #[arg(long, value_name = "URL")]
    pub check_url: Option<String>,

    /// Locally installed patch, repeatable (added to the [patches] section).
    /// Businesses only known to the server get a progress bar once the
    /// check response is processed.
    #[arg(long = "patch", value_name = "ID=HASH", value_parser = parse_patch)]
    pub patches: Vec<(String, String)>,

    /// Download directory (overrides downloads.directory)
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (overrides downloads.max_concurrent)
    #[arg(long, value_name = "N")]
    pub max_concurrent: Option<usize>,
}

/// Parse an `ID=HASH` argument. The hash may be empty.
fn parse_patch(value: &str) -> Result<(String, String), String> {
    let (id, hash) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ID=HASH, got '{}'", value))?;
    let id = id.trim();
    if id.is_empty() {
        return Err("business id cannot be empty".to_string());
    }
    Ok((id.to_string(), hash.trim().to_string()))
}

/// Run the check command.
pub fn run(args: CheckArgs, mut config: ConfigFile) -> Result<(), CliError> {
    let check_url = args
        .check_url
        .or_else(|| config.server.check_url.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No check URL specified. Use --check-url or set check_url in config.ini [server] section."
                    .to_string(),
            )
        })?;

    config.patches.extend(args.patches);
    if let Some(dir) = args.download_dir {
        config.downloads.directory = dir;
    }
    if let Some(max) = args.max_concurrent {
        config.downloads.max_concurrent = max.max(1);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(check_and_download(&check_url, &config))
}

async fn check_and_download(check_url: &str, config: &ConfigFile) -> Result<(), CliError> {
    let timeout = config.server.timeout;
    let registry = Arc::new(config.patch_registry());
    let executor = Arc::new(TokioTaskExecutor::current(
        config.downloads.executor_config(),
    )?);

    let orchestrator = UpdateOrchestrator::new(Collaborators {
        check_transport: Arc::new(HttpCheckTransport::new(check_url, timeout)?),
        download_transport: Arc::new(HttpDownloadTransport::new(
            config.downloads.directory.clone(),
            timeout,
        )?),
        patch_registry: registry.clone(),
        executor: executor.clone(),
    });

    let progress = MultiProgress::new();
    for business_id in config.patches.keys() {
        add_console_listener(&orchestrator, business_id, &progress);
    }

    println!(
        "Checking {} for {} local business(es)...",
        style(check_url).cyan(),
        config.patches.len()
    );

    let outcome = orchestrator.check_for_update_async().await;
    if !outcome.success {
        return Err(CliError::CheckFailed(outcome.message));
    }

    let started = Instant::now();
    wait_until(
        &orchestrator,
        started,
        |_| timeout,
        |metrics| metrics.fanouts_completed >= 1,
    )
    .await?;

    for business_id in server_only_businesses(orchestrator.business_ids(), &config.patches) {
        add_console_listener(&orchestrator, &business_id, &progress);
    }

    let max_concurrent = config.downloads.max_concurrent.max(1) as u64;
    let waited = wait_until(
        &orchestrator,
        started,
        |metrics| download_time_limit(metrics, timeout, max_concurrent),
        |metrics| metrics.downloads_in_flight == 0,
    )
    .await;
    executor.shutdown();
    waited?;

    print_summary(&orchestrator, &registry)
}

/// Businesses the server returned that are not installed locally.
fn server_only_businesses(
    returned: Vec<String>,
    local: &BTreeMap<String, String>,
) -> Vec<String> {
    returned
        .into_iter()
        .filter(|id| !local.contains_key(id))
        .collect()
}

fn add_console_listener(
    orchestrator: &UpdateOrchestrator,
    business_id: &str,
    progress: &MultiProgress,
) {
    orchestrator.add_download_task_listener(
        business_id,
        Arc::new(ConsoleListener::new(business_id, progress.clone())),
    );
}

/// Upper bound for the whole run: one request timeout for the fan-out and
/// one per round of `max_concurrent` downloads.
fn download_time_limit(
    metrics: &MetricsSnapshot,
    timeout: Duration,
    max_concurrent: u64,
) -> Duration {
    let rounds = metrics.downloads_submitted.div_ceil(max_concurrent.max(1)) + 1;
    timeout.saturating_mul(u32::try_from(rounds).unwrap_or(u32::MAX))
}

/// Poll the orchestrator metrics until `done` holds.
///
/// Fails once the time since `started` exceeds `limit`, which is
/// re-evaluated on every poll.
async fn wait_until(
    orchestrator: &UpdateOrchestrator,
    started: Instant,
    limit: impl Fn(&MetricsSnapshot) -> Duration,
    done: impl Fn(&MetricsSnapshot) -> bool,
) -> Result<(), CliError> {
    loop {
        let metrics = orchestrator.metrics();
        if done(&metrics) {
            debug!(%metrics, "Wait condition met");
            return Ok(());
        }

        let limit = limit(&metrics);
        if started.elapsed() >= limit {
            warn!(%metrics, "Gave up waiting for downloads");
            return Err(CliError::Runtime(format!(
                "downloads did not finish within {}s ({} still in flight)",
                limit.as_secs(),
                metrics.downloads_in_flight
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn print_summary(
    orchestrator: &UpdateOrchestrator,
    registry: &InMemoryPatchRegistry,
) -> Result<(), CliError> {
    let ids = orchestrator.business_ids();
    println!();
    if ids.is_empty() {
        println!("Server returned no businesses.");
        return Ok(());
    }

    let mut failed = 0;
    for id in &ids {
        let Some(patch) = registry.get_patch(id) else {
            continue;
        };
        let state = match patch.update_state {
            UpdateState::UpdatedSuccess => style("updated").green().bold(),
            UpdateState::UpdatedFailed => {
                failed += 1;
                style("failed").red().bold()
            }
            UpdateState::Updating => style("updating").yellow(),
            UpdateState::Idle => style("up to date").dim(),
        };
        let hash = if patch.local_hash.is_empty() {
            "-"
        } else {
            patch.local_hash.as_str()
        };
        println!("  {:<24} {:<12} {}", id, state, hash);
    }

    let metrics = orchestrator.metrics();
    println!();
    println!(
        "{} download(s) succeeded, {} failed",
        metrics.downloads_succeeded,
        metrics.downloads_failed + metrics.downloads_submit_failed
    );

    if failed > 0 {
        return Err(CliError::DownloadsFailed(failed));
    }
    Ok(())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>24.cyan.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Renders one business's download as a progress bar.
///
/// The bar is created on the first event so businesses without a pending
/// patch leave no trace on the terminal.
struct ConsoleListener {
    business_id: String,
    progress: MultiProgress,
    bar: OnceLock<ProgressBar>,
}

impl ConsoleListener {
    fn new(business_id: &str, progress: MultiProgress) -> Self {
        Self {
            business_id: business_id.to_string(),
            progress,
            bar: OnceLock::new(),
        }
    }

    fn bar(&self) -> &ProgressBar {
        self.bar.get_or_init(|| {
            let bar = self.progress.add(ProgressBar::new(100));
            bar.set_style(bar_style());
            bar.set_prefix(self.business_id.clone());
            bar
        })
    }
}

impl DownloadTaskListener for ConsoleListener {
    fn on_progress(&self, percent: u8) {
        self.bar().set_position(u64::from(percent));
    }

    fn on_success(&self) {
        let bar = self.bar();
        bar.set_position(100);
        bar.finish_with_message(style("done").green().to_string());
    }

    fn on_error(&self, code: i32, message: &str) {
        self.bar()
            .abandon_with_message(format!("{} ({}): {}", style("failed").red(), code, message));
    }
}
