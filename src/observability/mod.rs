// observability/mod.rs - Substrate Observability

//! Logging and metrics for the governance substrate.
//!
//! One call wires up both concerns:
//!
//! - **Logging**: a `tracing` subscriber filtered and formatted per
//!   [`ObservabilityConfig`]. Substrate modules log registrations,
//!   revocations, ledger appends, tier assignments and every rejection.
//! - **Metrics**: substrate counters and gauges emitted through the
//!   `metrics` facade; initialization registers their descriptions so
//!   whatever recorder the embedding host installs renders them with help
//!   text. No exporter is bundled - that, like transports, belongs to the
//!   host.
//!
//! # Example
//!
//! ```ignore
//! use trustmesh::observability::{init_observability, ObservabilityConfig};
//!
//! init_observability(ObservabilityConfig::production());
//! ```

mod metrics;

pub use metrics::{
    describe_metrics, record_action_rejected, record_action_validated, record_identity_registered,
    record_identity_revoked, record_ledger_append, record_proposal_rejected, record_trust_score,
};

use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output (default)
    #[default]
    Pretty,
    /// Single-line output for dense terminals
    Compact,
    /// JSON lines for log aggregation
    Json,
}

/// Observability configuration.
///
/// The filter defaults keep the substrate chatty (`trustmesh=debug`) while
/// holding dependencies at `info`; chain appends and validator rejections
/// log at debug, lifecycle transitions at info.
#[derive(Clone, Debug)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive string; `RUST_LOG` overrides it when set
    pub filter: String,

    pub format: LogFormat,

    /// Emit span open/close events (useful when timing ledger appends)
    pub span_lifecycles: bool,

    /// Include file and line numbers in log lines
    pub source_locations: bool,

    /// ANSI colors for terminal output
    pub ansi: bool,

    /// Register metric descriptions with the installed recorder
    pub describe_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: "info,trustmesh=debug".into(),
            format: LogFormat::Pretty,
            span_lifecycles: false,
            source_locations: false,
            ansi: true,
            describe_metrics: true,
        }
    }
}

impl ObservabilityConfig {
    /// Production preset: JSON lines, substrate at info, no colors
    pub fn production() -> Self {
        Self {
            filter: "info,trustmesh=info".into(),
            format: LogFormat::Json,
            ansi: false,
            ..Self::default()
        }
    }

    /// Development preset: verbose substrate tracing with source locations
    pub fn development() -> Self {
        Self {
            filter: "debug,trustmesh=trace".into(),
            span_lifecycles: true,
            source_locations: true,
            ..Self::default()
        }
    }
}

/// Initialize logging and metrics for the substrate.
///
/// Call once at startup, before constructing a hub. Panics if a global
/// tracing subscriber is already installed.
pub fn init_observability(config: ObservabilityConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let span_events = if config.span_lifecycles {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_span_events(span_events)
        .with_file(config.source_locations)
        .with_line_number(config.source_locations)
        .with_target(true);

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => base.with_ansi(config.ansi).boxed(),
        LogFormat::Compact => base.compact().with_ansi(config.ansi).boxed(),
        LogFormat::Json => base.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    if config.describe_metrics {
        describe_metrics();
    }

    tracing::info!(
        filter = %config.filter,
        format = ?config.format,
        metrics_described = config.describe_metrics,
        "Substrate observability initialized"
    );
}
