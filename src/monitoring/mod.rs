pub mod metrics;
pub mod server;
pub mod telemetry;

pub use metrics::BotMetrics;
pub use server::{HealthResponse, MetricsServer};
pub use telemetry::{init_tracing, LogFormat};
