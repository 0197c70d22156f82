//! Long-running background processors.
//!
//! - `NotifySender`: receives `NotifyEvent`, delivers signed state-change
//!   notifications to the shop backend and retries with exponential
//!   backoff.

pub mod notify_sender;

pub use notify_sender::{NotifyError, NotifySender, calculate_retry_delay};
