//! Logging and metrics setup for Volx
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("volx", LogFormat::Pretty)?;
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, OperationTimer, PlatformMetrics};
