use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
};

use bytes::Bytes;
use pipeline_dispatch_core::{
    Error, Result,
    api::{ActionsApi, DispatchRequest, RunQuery},
    models::{RunStatus, Workflow, WorkflowRun, WorkflowRunList},
};

/// Scripted in-memory [`ActionsApi`].
///
/// List and run responses are consumed in order; the last one keeps being returned.
#[derive(Default)]
pub struct FakeApi {
    pub run_lists: RefCell<VecDeque<Vec<WorkflowRun>>>,
    pub run_states: RefCell<VecDeque<WorkflowRun>>,
    pub workflows: HashMap<u64, Workflow>,
    pub logs: RefCell<VecDeque<Result<Bytes>>>,
    pub dispatch_error: Cell<bool>,
    /// Make `get_run` hang forever, like a request the server never answers.
    pub stall_runs: Cell<bool>,
    pub dispatched: RefCell<Vec<(String, DispatchRequest)>>,
    pub list_calls: Cell<u32>,
    pub workflow_calls: Cell<u32>,
    pub run_calls: Cell<u32>,
    pub log_calls: Cell<u32>,
    pub last_query: RefCell<Option<RunQuery>>,
}

impl FakeApi {
    pub fn with_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        Self { workflows: workflows.into_iter().map(|w| (w.id, w)).collect(), ..Default::default() }
    }

    pub fn push_run_list(&self, runs: Vec<WorkflowRun>) {
        self.run_lists.borrow_mut().push_back(runs)
    }

    pub fn push_run_state(&self, run: WorkflowRun) { self.run_states.borrow_mut().push_back(run) }

    pub fn push_logs(&self, logs: Result<Bytes>) { self.logs.borrow_mut().push_back(logs) }
}

fn next_or_last<T: Clone>(queue: &RefCell<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.borrow_mut();
    if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
}

impl ActionsApi for FakeApi {
    async fn list_runs(&self, query: &RunQuery) -> Result<WorkflowRunList> {
        self.list_calls.set(self.list_calls.get() + 1);
        *self.last_query.borrow_mut() = Some(query.clone());
        let workflow_runs = next_or_last(&self.run_lists).unwrap_or_default();
        Ok(WorkflowRunList { total_count: workflow_runs.len() as u64, workflow_runs })
    }

    async fn get_workflow(&self, workflow_id: u64) -> Result<Workflow> {
        self.workflow_calls.set(self.workflow_calls.get() + 1);
        self.workflows
            .get(&workflow_id)
            .cloned()
            .ok_or_else(|| Error::remote(format!("workflow {workflow_id}"), "not found"))
    }

    async fn get_run(&self, run_id: u64) -> Result<WorkflowRun> {
        self.run_calls.set(self.run_calls.get() + 1);
        if self.stall_runs.get() {
            std::future::pending::<()>().await;
        }
        next_or_last(&self.run_states)
            .filter(|run| run.id == run_id)
            .ok_or_else(|| Error::remote(format!("workflow run {run_id}"), "not found"))
    }

    async fn download_logs(&self, run_id: u64) -> Result<Bytes> {
        self.log_calls.set(self.log_calls.get() + 1);
        self.logs.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(Error::remote(format!("logs for workflow run {run_id}"), "no logs scripted"))
        })
    }

    async fn dispatch_workflow(
        &self,
        workflow_file: &str,
        request: &DispatchRequest,
    ) -> Result<()> {
        if self.dispatch_error.get() {
            return Err(Error::remote(format!("dispatch {workflow_file}"), "422 Unprocessable"));
        }
        self.dispatched.borrow_mut().push((workflow_file.to_string(), request.clone()));
        Ok(())
    }
}

pub fn workflow(id: u64, name: &str) -> Workflow {
    Workflow {
        id,
        name: name.to_string(),
        path: format!(".github/workflows/{}.yaml", name.replace(' ', "-")),
    }
}

pub fn run(id: u64, workflow_id: u64, event: &str, status: RunStatus) -> WorkflowRun {
    WorkflowRun {
        id,
        workflow_id,
        name: None,
        event: event.to_string(),
        status,
        conclusion: None,
        head_branch: Some("master".to_string()),
        html_url: format!("https://github.com/acme/deploy/actions/runs/{id}"),
        logs_url: format!("https://api.github.com/repos/acme/deploy/actions/runs/{id}/logs"),
        created_at: None,
        workflow_name: None,
        workflow_file: None,
    }
}
