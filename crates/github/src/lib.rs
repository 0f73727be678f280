use std::{process::Command, sync::OnceLock, time::Duration};

use bytes::Bytes;
use http::StatusCode;
use octocrab::{Octocrab, models::RunId};
use pipeline_dispatch_core::{
    Error, Result,
    api::{ActionsApi, DispatchRequest, RunQuery},
    config::{GitHubConfig, Repository},
    models::{Workflow, WorkflowRun, WorkflowRunList},
};
use regex::Regex;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Actions API client for a single repository.
#[derive(Clone)]
pub struct GitHub {
    pub client: Octocrab,
    pub repository: Repository,
}

impl GitHub {
    /// Build a client authenticated with the configured token. No request is made.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let mut builder = Octocrab::builder()
            .personal_token(config.token.clone())
            .set_connect_timeout(Some(CONNECT_TIMEOUT))
            .set_read_timeout(Some(READ_TIMEOUT));
        if let Some(api_url) = &config.api_url {
            builder = builder
                .base_uri(api_url.as_str())
                .map_err(|e| Error::configuration(format!("invalid API URL {api_url}: {e}")))?;
        }
        let client = builder
            .build()
            .map_err(|e| Error::configuration(format!("failed to create GitHub client: {e}")))?;
        tracing::debug!("Using repository {}", config.repository);
        Ok(Self { client, repository: config.repository.clone() })
    }

    fn route(&self, path: &str) -> String {
        format!("/repos/{}/{}/actions/{}", self.repository.owner, self.repository.name, path)
    }
}

// Runs and workflows are fetched through plain routes into our own models: the
// typed octocrab handlers return octocrab's models, which the locator and the
// poller would otherwise need to depend on.
impl ActionsApi for GitHub {
    async fn list_runs(&self, query: &RunQuery) -> Result<WorkflowRunList> {
        self.client
            .get(self.route("runs"), Some(query))
            .await
            .map_err(|e| Error::remote("Failed to fetch workflow runs", e))
    }

    async fn get_workflow(&self, workflow_id: u64) -> Result<Workflow> {
        self.client
            .get(self.route(&format!("workflows/{workflow_id}")), None::<&()>)
            .await
            .map_err(|e| Error::remote(format!("Failed to fetch workflow {workflow_id}"), e))
    }

    async fn get_run(&self, run_id: u64) -> Result<WorkflowRun> {
        self.client
            .get(self.route(&format!("runs/{run_id}")), None::<&()>)
            .await
            .map_err(|e| Error::remote(format!("Failed to fetch workflow run {run_id}"), e))
    }

    async fn download_logs(&self, run_id: u64) -> Result<Bytes> {
        self.client
            .actions()
            .download_workflow_run_logs(
                &self.repository.owner,
                &self.repository.name,
                RunId(run_id),
            )
            .await
            .map_err(|e| log_error(e, run_id))
    }

    async fn dispatch_workflow(
        &self,
        workflow_file: &str,
        request: &DispatchRequest,
    ) -> Result<()> {
        let inputs = serde_json::to_value(&request.inputs)
            .map_err(|e| Error::remote("Failed to encode dispatch inputs", e))?;
        self.client
            .actions()
            .create_workflow_dispatch(
                &self.repository.owner,
                &self.repository.name,
                workflow_file,
                &request.git_ref,
            )
            .inputs(inputs)
            .send()
            .await
            .map_err(|e| Error::remote(format!("Failed to dispatch workflow {workflow_file}"), e))
    }
}

/// Run logs are only published some time after a run completes; until then the API
/// answers 404. Server errors and failed connections are retried as well.
fn log_error(err: octocrab::Error, run_id: u64) -> Error {
    let context = format!("Failed to download logs for workflow run {run_id}");
    if is_transient_error(&err) {
        Error::transient(context, err)
    } else {
        Error::remote(context, err)
    }
}

fn is_transient_error(err: &octocrab::Error) -> bool {
    match err {
        octocrab::Error::GitHub { source, .. } => is_transient_status(source.status_code),
        octocrab::Error::Hyper { .. } | octocrab::Error::Service { .. } => true,
        _ => false,
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Find the repository of the `origin` remote of the git checkout in the current
/// directory.
pub fn detect_repository() -> Option<Repository> {
    let output = Command::new("git").args(["remote", "get-url", "origin"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let url = String::from_utf8(output.stdout).ok()?;
    let (owner, name) = extract_github_url(url.trim())?;
    tracing::debug!("Detected repository {}/{} from git remote", owner, name);
    Some(Repository { owner: owner.to_string(), name: name.to_string() })
}

pub fn extract_github_url(url: &str) -> Option<(&str, &str)> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let caps = REGEX
        .get_or_init(|| {
            Regex::new(
                r"^(?:https?://|ssh://git@|git@)github\.com[/:](?P<owner>[^/]+)/(?P<repo>[^/]+?)(?:\.git)?(?:/|$)",
            )
            .unwrap()
        })
        .captures(url)?;
    let owner = caps.name("owner").map(|m| m.as_str()).unwrap_or_default();
    let repo = caps.name("repo").map(|m| m.as_str()).unwrap_or_default();
    Some((owner, repo))
}
