use pipeline_dispatch_core::{
    Result, api::ActionsApi, identity::WorkflowIdentity, models::WorkflowRun,
    retry::RetryPolicy,
};
use tokio_util::sync::CancellationToken;

use crate::locate::find_latest_matching_runs;

#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Pacing and limits, applied to each of the two wait phases separately.
    pub policy: RetryPolicy,
    pub per_page: u8,
    /// Branch the run was dispatched on. Preferred when several runs match.
    pub branch: Option<String>,
}

/// Observer for the wait loops of [`await_run`]. All methods default to no-ops.
pub trait PollProgress {
    /// No matching run exists yet.
    fn waiting_for_run(&mut self, _attempt: u32) {}

    /// A run was selected out of `matches` candidates.
    fn run_found(&mut self, _run: &WorkflowRun, _matches: usize) {}

    /// The selected run is still in progress.
    fn waiting_for_completion(&mut self, _run: &WorkflowRun, _attempt: u32) {}
}

impl PollProgress for () {}

/// Wait for a run of the workflow named by `identity` to show up, then wait for it
/// to finish. Returns the run as last fetched, no longer in progress.
pub async fn await_run<A: ActionsApi>(
    api: &A,
    identity: &WorkflowIdentity,
    options: &PollOptions,
    cancel: &CancellationToken,
    progress: &mut impl PollProgress,
) -> Result<WorkflowRun> {
    let run = wait_for_match(api, identity, options, cancel, progress).await?;
    let mut finished = wait_for_completion(api, &run, options, cancel, progress).await?;
    finished.workflow_name = run.workflow_name;
    finished.workflow_file = run.workflow_file;
    tracing::info!(
        "Workflow run {} finished with status {} ({})",
        finished.id,
        finished.status,
        finished.conclusion.map_or("no conclusion", |c| c.as_str())
    );
    Ok(finished)
}

pub async fn wait_for_match<A: ActionsApi>(
    api: &A,
    identity: &WorkflowIdentity,
    options: &PollOptions,
    cancel: &CancellationToken,
    progress: &mut impl PollProgress,
) -> Result<WorkflowRun> {
    let mut poller = options.policy.start(cancel);
    loop {
        let matches =
            poller.attempt(find_latest_matching_runs(api, identity, options.per_page)).await?;
        if let Some(run) = select_run(&matches, options.branch.as_deref()) {
            tracing::info!("Found workflow run {} ({})", run.id, run.html_url);
            progress.run_found(run, matches.len());
            return Ok(run.clone());
        }
        let attempt = poller.attempts() + 1;
        tracing::debug!("No run of {:?} yet (attempt {})", identity.run_name(), attempt);
        progress.waiting_for_run(attempt);
        poller.wait().await?;
    }
}

pub async fn wait_for_completion<A: ActionsApi>(
    api: &A,
    run: &WorkflowRun,
    options: &PollOptions,
    cancel: &CancellationToken,
    progress: &mut impl PollProgress,
) -> Result<WorkflowRun> {
    let mut poller = options.policy.start(cancel);
    loop {
        let current = poller.attempt(api.get_run(run.id)).await?;
        if !current.is_in_progress() {
            return Ok(current);
        }
        let attempt = poller.attempts() + 1;
        tracing::debug!("Workflow run {} in progress (attempt {})", run.id, attempt);
        progress.waiting_for_completion(&current, attempt);
        poller.wait().await?;
    }
}

/// Pick the run to follow out of the matching runs.
///
/// Concurrent dispatches of the same workflow can't be told apart reliably. The
/// first (newest) run on `branch` wins, falling back to the first run overall.
pub fn select_run<'a>(
    matches: &'a [WorkflowRun],
    branch: Option<&str>,
) -> Option<&'a WorkflowRun> {
    if matches.len() > 1 {
        tracing::warn!(
            "{} runs match ({}), the selected run may belong to another dispatch",
            matches.len(),
            matches.iter().map(|r| r.id.to_string()).collect::<Vec<_>>().join(", ")
        );
    }
    branch
        .and_then(|branch| matches.iter().find(|r| r.head_branch.as_deref() == Some(branch)))
        .or_else(|| matches.first())
}
