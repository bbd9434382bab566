//! The daily reminder dispatch job.
//!
//! find due reminders → resolve contracts → claim → resolve tokens → send.
//! [`dispatch_for_date`] wraps the pipeline with credential loading, the
//! one-per-run OAuth exchange and `dispatch_runs` bookkeeping.

mod error;
mod notifier;
mod pipeline;
mod run;

pub use error::DispatchError;
pub use notifier::{build_push_message, Notifier};
pub use pipeline::{dispatch_due, preview_due, DispatchSummary, PreviewItem};
pub use run::{dispatch_for_date, dispatch_with_client, DispatchOutcome};
