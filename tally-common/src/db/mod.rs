//! Database initialization, schema and transaction helpers

pub mod init;
pub mod monitor;
pub mod retry;

pub use init::*;
pub use monitor::{begin_monitored, MonitoredTransaction};
pub use retry::retry_on_lock;
