//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders lifecycle events through `tracing`.

mod log;

pub use log::LogWriter;
