//! Dispatching deployment workflows and following the runs they start.

pub mod dispatch;
pub mod locate;
pub mod logs;
pub mod poll;
#[cfg(test)]
mod testing;

pub use dispatch::{Dispatched, dispatch};
pub use locate::{find_latest_matching_runs, matching_runs};
pub use logs::{LogFile, LogOptions, RunLogs, extract_logs, fetch_logs};
pub use poll::{PollOptions, PollProgress, await_run, select_run};
