use std::collections::{HashMap, hash_map::Entry};

use pipeline_dispatch_core::{
    Result,
    api::{ActionsApi, RunQuery},
    identity::WorkflowIdentity,
    models::{RunStatus, WORKFLOW_DISPATCH_EVENT, WorkflowRun},
};

/// Fetch the dispatched, still running workflow runs whose workflow is named after
/// `identity`, in the order the API returns them (newest first).
///
/// Each run is enriched with its workflow's name and file. Workflows are looked up
/// once per call.
pub async fn find_latest_matching_runs<A: ActionsApi>(
    api: &A,
    identity: &WorkflowIdentity,
    per_page: u8,
) -> Result<Vec<WorkflowRun>> {
    let query = RunQuery {
        event: Some(WORKFLOW_DISPATCH_EVENT.to_string()),
        status: Some(RunStatus::InProgress),
        per_page: Some(per_page),
    };
    let list = api.list_runs(&query).await?;
    tracing::debug!("Fetched {} of {} workflow runs", list.workflow_runs.len(), list.total_count);

    let mut workflows = HashMap::new();
    let mut candidates = Vec::with_capacity(list.workflow_runs.len());
    for mut run in list.workflow_runs {
        // Only candidates need their workflow resolved
        if !run.is_dispatched() || !run.is_in_progress() {
            continue;
        }
        let workflow = match workflows.entry(run.workflow_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(api.get_workflow(run.workflow_id).await?),
        };
        run.enrich(workflow);
        candidates.push(run);
    }

    let expected = identity.run_name();
    let runs = matching_runs(candidates, &expected);
    tracing::debug!("Found {} runs matching {:?}", runs.len(), expected);
    Ok(runs)
}

/// Keep the runs that were started by a dispatch, are in progress and belong to the
/// workflow named `expected_name`. Relative order is preserved.
pub fn matching_runs(
    runs: impl IntoIterator<Item = WorkflowRun>,
    expected_name: &str,
) -> Vec<WorkflowRun> {
    runs.into_iter()
        .filter(WorkflowRun::is_dispatched)
        .filter(WorkflowRun::is_in_progress)
        .filter(|run| run.workflow_name.as_deref() == Some(expected_name))
        .collect()
}
