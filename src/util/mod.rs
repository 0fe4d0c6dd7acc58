pub mod logging;
pub mod xml;

pub use logging::{init_logging, LoggingConfig};
