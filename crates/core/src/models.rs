use std::fmt;

use serde::{Deserialize, Serialize};

pub const WORKFLOW_DISPATCH_EVENT: &str = "workflow_dispatch";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,
    #[serde(other)]
    Other,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Waiting => "waiting",
            Self::Requested => "requested",
            Self::Pending => "pending",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    Neutral,
    TimedOut,
    ActionRequired,
    Stale,
    StartupFailure,
    #[serde(other)]
    Unknown,
}

impl Conclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::Neutral => "neutral",
            Self::TimedOut => "timed_out",
            Self::ActionRequired => "action_required",
            Self::Stale => "stale",
            Self::StartupFailure => "startup_failure",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_success(self) -> bool { self == Self::Success }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A single execution of a workflow, as returned by the Actions API.
///
/// `workflow_name` and `workflow_file` are not part of the API response; they are
/// filled in from the parent [`Workflow`] by the run locator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub workflow_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub event: String,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub head_branch: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub logs_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(skip)]
    pub workflow_name: Option<String>,
    #[serde(skip)]
    pub workflow_file: Option<String>,
}

impl WorkflowRun {
    pub fn is_in_progress(&self) -> bool { self.status == RunStatus::InProgress }

    pub fn is_dispatched(&self) -> bool { self.event == WORKFLOW_DISPATCH_EVENT }

    /// Copy the parent workflow's name and file name onto this run.
    pub fn enrich(&mut self, workflow: &Workflow) {
        self.workflow_name = Some(workflow.name.clone());
        self.workflow_file = Some(workflow.file_name().to_string());
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkflowRunList {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub path: String,
}

impl Workflow {
    /// The file name of the workflow definition, without `.github/workflows/`.
    pub fn file_name(&self) -> &str { self.path.rsplit('/').next().unwrap_or(&self.path) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_file_name() {
        let cases: &[(&str, &str)] = &[
            (".github/workflows/infra-us-prod-blue-deploy.yaml", "infra-us-prod-blue-deploy.yaml"),
            ("k8s.yaml", "k8s.yaml"),
            ("a/b/", ""),
        ];
        for &(path, expected) in cases {
            let workflow = Workflow { id: 1, name: "x".to_string(), path: path.to_string() };
            assert_eq!(workflow.file_name(), expected);
        }
    }

    #[test]
    fn test_deserialize_run() {
        let json = r#"{
            "id": 42,
            "workflow_id": 7,
            "name": "deploy",
            "event": "workflow_dispatch",
            "status": "in_progress",
            "conclusion": null,
            "head_branch": "master",
            "html_url": "https://github.com/acme/infra/actions/runs/42",
            "logs_url": "https://api.github.com/repos/acme/infra/actions/runs/42/logs",
            "run_attempt": 1
        }"#;
        let run: WorkflowRun = serde_json::from_str(json).unwrap();
        assert_eq!(run.id, 42);
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(run.is_in_progress());
        assert!(run.is_dispatched());
        assert_eq!(run.conclusion, None);
        assert_eq!(run.workflow_name, None);
    }

    #[test]
    fn test_unknown_status_and_conclusion() {
        let run: WorkflowRun = serde_json::from_value(serde_json::json!({
            "id": 1,
            "workflow_id": 2,
            "event": "push",
            "status": "something_new",
            "conclusion": "brand_new",
            "html_url": "u",
        }))
        .unwrap();
        assert_eq!(run.status, RunStatus::Other);
        assert_eq!(run.conclusion, Some(Conclusion::Unknown));
        assert!(!run.conclusion.unwrap().is_success());
    }

    #[test]
    fn test_enrich() {
        let mut run: WorkflowRun = serde_json::from_value(serde_json::json!({
            "id": 1,
            "workflow_id": 2,
            "event": "workflow_dispatch",
            "status": "completed",
            "conclusion": "success",
            "html_url": "u",
        }))
        .unwrap();
        let workflow = Workflow {
            id: 2,
            name: "k8s us-prod-blue deploy".to_string(),
            path: ".github/workflows/k8s-us-prod-blue-deploy.yaml".to_string(),
        };
        run.enrich(&workflow);
        assert_eq!(run.workflow_name.as_deref(), Some("k8s us-prod-blue deploy"));
        assert_eq!(run.workflow_file.as_deref(), Some("k8s-us-prod-blue-deploy.yaml"));
        assert!(run.conclusion.unwrap().is_success());
    }
}
