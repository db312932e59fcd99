//! Observability for Electro.
//!
//! - **Logging**: a global `tracing` subscriber with JSON or pretty output
//! - **Metrics**: dispatch counters and latency via the `metrics` crate,
//!   rendered in Prometheus text format
//! - **Observer**: [`TracingObserver`], a
//!   [`DispatchObserver`](electro_pipeline::DispatchObserver) that reports
//!   handler calls, route matches and unwinds through both
//!
//! # Example
//!
//! ```rust,ignore
//! use electro_telemetry::{init_telemetry, LogConfig, MetricsConfig};
//!
//! init_telemetry(&LogConfig::production(), &MetricsConfig::default())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;
pub mod observer;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use crate::metrics::{init_metrics, render_metrics, MetricsConfig};
pub use observer::TracingObserver;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem failure.
pub fn init_telemetry(logging: &LogConfig, metrics: &MetricsConfig) -> TelemetryResult<()> {
    init_logging(logging)?;
    init_metrics(metrics)?;
    Ok(())
}
