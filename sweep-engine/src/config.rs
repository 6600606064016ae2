//! Engine configuration
//!
//! Defines all configurable parameters for the engine: the scanner
//! command line, filesystem locations, subscriber poll interval, and
//! every delay in the cancellation protocol.

use std::path::PathBuf;
use std::time::Duration;

/// Timing of the scripted cancellation protocol.
///
/// The shutdown sequence assumes the scanner's interactive confirmation
/// prompt (terminate signal, then two `q` keystrokes). The prompt shape
/// is fixed by the external tool, but the delays are deployment-tunable.
#[derive(Debug, Clone)]
pub struct StopConfig {
    /// Wait after the terminate signal, before the first keystroke
    pub grace: Duration,

    /// Wait after each scripted keystroke
    pub settle: Duration,

    /// Maximum wait for process exit before the forced kill
    pub exit_timeout: Duration,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(1),
            settle: Duration::from_millis(500),
            exit_timeout: Duration::from_secs(5),
        }
    }
}

/// Engine configuration
///
/// All timeouts and intervals are configurable to allow tuning for
/// different deployment scenarios (dev vs prod, fast vs slow targets).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Program used to launch the scanner (e.g. "python3")
    pub scanner_program: String,

    /// Arguments placed before the per-scan flags (e.g. unbuffered
    /// interpreter mode and the scanner script path)
    pub scanner_base_args: Vec<String>,

    /// Directory where per-job structured reports are written
    pub reports_dir: PathBuf,

    /// Path of the JSON history snapshot
    pub history_path: PathBuf,

    /// Fallback wakeup interval for log subscribers
    pub stream_poll_interval: Duration,

    /// Cancellation protocol timing
    pub stop: StopConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scanner_program: "python3".to_string(),
            scanner_base_args: vec!["-u".to_string(), "dirsearch.py".to_string()],
            reports_dir: PathBuf::from("reports"),
            history_path: PathBuf::from("scan_history.json"),
            stream_poll_interval: Duration::from_millis(200),
            stop: StopConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - SWEEP_SCANNER_PROGRAM (default: "python3")
    /// - SWEEP_SCANNER_ARGS (space-separated, default: "-u dirsearch.py")
    /// - SWEEP_REPORTS_DIR (default: "reports")
    /// - SWEEP_HISTORY_PATH (default: "scan_history.json")
    /// - SWEEP_STOP_GRACE_MS (default: 1000)
    /// - SWEEP_STOP_SETTLE_MS (default: 500)
    /// - SWEEP_STOP_EXIT_TIMEOUT_MS (default: 5000)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(program) = std::env::var("SWEEP_SCANNER_PROGRAM") {
            config.scanner_program = program;
        }

        if let Ok(args) = std::env::var("SWEEP_SCANNER_ARGS") {
            config.scanner_base_args =
                args.split_whitespace().map(str::to_string).collect();
        }

        if let Ok(dir) = std::env::var("SWEEP_REPORTS_DIR") {
            config.reports_dir = PathBuf::from(dir);
        }

        if let Ok(path) = std::env::var("SWEEP_HISTORY_PATH") {
            config.history_path = PathBuf::from(path);
        }

        if let Some(grace) = duration_from_env("SWEEP_STOP_GRACE_MS") {
            config.stop.grace = grace;
        }

        if let Some(settle) = duration_from_env("SWEEP_STOP_SETTLE_MS") {
            config.stop.settle = settle;
        }

        if let Some(timeout) = duration_from_env("SWEEP_STOP_EXIT_TIMEOUT_MS") {
            config.stop.exit_timeout = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scanner_program.is_empty() {
            anyhow::bail!("scanner_program cannot be empty");
        }

        if self.stream_poll_interval.is_zero() {
            anyhow::bail!("stream_poll_interval must be greater than 0");
        }

        if self.stop.exit_timeout.is_zero() {
            anyhow::bail!("stop.exit_timeout must be greater than 0");
        }

        Ok(())
    }

    /// Path of the structured report for one job
    pub fn report_path(&self, id: uuid::Uuid) -> PathBuf {
        self.reports_dir.join(format!("{id}.json"))
    }
}

fn duration_from_env(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
