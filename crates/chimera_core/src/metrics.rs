//! Runtime counters and structured logging setup.

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Wall-clock timer for rule evaluations.
///
/// `std::time::Instant` is unavailable on `wasm32-unknown-unknown`, where the
/// host clock (`Date.now()`) is used instead.
pub(crate) struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    started: Instant,
    #[cfg(target_arch = "wasm32")]
    started_ms: f64,
}

impl Stopwatch {
    pub(crate) fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            started: Instant::now(),
            #[cfg(target_arch = "wasm32")]
            started_ms: js_sys::Date::now(),
        }
    }

    pub(crate) fn elapsed_ms(&self) -> f64 {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.started.elapsed().as_secs_f64() * 1000.0
        }
        #[cfg(target_arch = "wasm32")]
        {
            (js_sys::Date::now() - self.started_ms).max(0.0)
        }
    }
}

/// Counters kept by a host session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeMetrics {
    steps: u64,
    rule_applications: u64,
    rule_failures: u64,
    summary_every: u64,
}

impl RuntimeMetrics {
    /// Creates counters that log a summary every `summary_every` steps
    /// (0 disables the summary).
    #[must_use]
    pub fn new(summary_every: u64) -> Self {
        Self {
            summary_every,
            ..Self::default()
        }
    }

    /// Records a completed step.
    pub fn record_step(&mut self, age: u64, adaptation_score: f64) {
        self.steps += 1;
        if self.summary_every > 0 && self.steps % self.summary_every == 0 {
            tracing::info!(
                steps = self.steps,
                age,
                adaptation_score,
                rule_applications = self.rule_applications,
                rule_failures = self.rule_failures,
                "Simulation progress"
            );
        }
    }

    pub fn record_rule(&mut self, succeeded: bool) {
        self.rule_applications += 1;
        if !succeeded {
            self.rule_failures += 1;
        }
    }

    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[must_use]
    pub fn rule_applications(&self) -> u64 {
        self.rule_applications
    }

    #[must_use]
    pub fn rule_failures(&self) -> u64 {
        self.rule_failures
    }
}

/// Installs a global fmt subscriber filtered by `RUST_LOG` (default `info`).
/// Does nothing if a subscriber is already installed.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}
