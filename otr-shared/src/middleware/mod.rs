mod session;
mod tracing_layer;
mod metrics_layer;

pub use session::*;
pub use tracing_layer::*;
pub use metrics_layer::*;
