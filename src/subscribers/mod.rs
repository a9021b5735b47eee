//! # Event subscribers for the supervisor.
//!
//! This module provides the [`Subscribe`] trait, the non-blocking
//! [`SubscriberSet`] fan-out and the built-in [`LogWriter`].
//!
//! The supervisor does not log directly: every lifecycle step is published as an
//! [`Event`](crate::Event) and rendered by whichever subscribers the embedder
//! installs. The logging sink is therefore an external collaborator.
//!
//! ```text
//! Bus ──► forwarder ──► SubscriberSet::emit(&Event)
//!                             │
//!                 ┌───────────┼───────────┐
//!                 ▼           ▼           ▼
//!             LogWriter    Metrics     Custom
//! ```

mod embedded;
mod set;
mod subscribe;

pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
