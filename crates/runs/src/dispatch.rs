use pipeline_dispatch_core::{
    Error, Result,
    api::{ActionsApi, DispatchInputs, DispatchRequest},
    identity::WorkflowIdentity,
};

/// A workflow dispatch that was accepted by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub workflow_file: String,
    pub request: DispatchRequest,
}

pub fn dispatch_request(identity: &WorkflowIdentity, branch: &str) -> Result<DispatchRequest> {
    if branch.trim().is_empty() {
        return Err(Error::configuration("branch must not be empty"));
    }
    Ok(DispatchRequest {
        git_ref: branch.to_string(),
        inputs: DispatchInputs {
            region: identity.region.clone(),
            environment: identity.environment.clone(),
            deployment: identity.deployment.clone(),
        },
    })
}

/// Start a run of the workflow named by `identity` on `branch`.
///
/// Exactly one dispatch request is sent; failures are not retried.
pub async fn dispatch<A: ActionsApi>(
    api: &A,
    identity: &WorkflowIdentity,
    branch: &str,
) -> Result<Dispatched> {
    let request = dispatch_request(identity, branch)?;
    let workflow_file = identity.file_name();
    tracing::info!("Dispatching workflow {} for {} on {}", workflow_file, identity, branch);
    api.dispatch_workflow(&workflow_file, &request).await?;
    tracing::info!("Dispatched workflow {}", workflow_file);
    Ok(Dispatched { workflow_file, request })
}
