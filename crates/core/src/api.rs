use bytes::Bytes;
use serde::Serialize;

use crate::{
    error::Result,
    models::{RunStatus, Workflow, WorkflowRun, WorkflowRunList},
};

/// Query parameters for listing workflow runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u8>,
}

/// Body of a workflow dispatch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRequest {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub inputs: DispatchInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchInputs {
    pub region: String,
    pub environment: String,
    pub deployment: String,
}

/// The subset of the GitHub Actions API used to dispatch and observe runs, scoped
/// to one repository.
///
/// Implementations return [`crate::Error::Remote`] for failed requests and
/// [`crate::Error::Transient`] for failures worth retrying.
#[allow(async_fn_in_trait)]
pub trait ActionsApi {
    async fn list_runs(&self, query: &RunQuery) -> Result<WorkflowRunList>;

    async fn get_workflow(&self, workflow_id: u64) -> Result<Workflow>;

    async fn get_run(&self, run_id: u64) -> Result<WorkflowRun>;

    /// Download the zip archive holding the logs of every job in the run.
    async fn download_logs(&self, run_id: u64) -> Result<Bytes>;

    async fn dispatch_workflow(&self, workflow_file: &str, request: &DispatchRequest)
    -> Result<()>;
}
