use std::path::PathBuf;

use anyhow::{Context, Result};
use argp::FromArgs;
use pipeline_dispatch_core::{
    config::Overrides,
    identity::{DispatchTarget, WorkflowIdentity},
};
use pipeline_dispatch_github::GitHub;
use pipeline_dispatch_runs::dispatch;

use crate::util::{load_config, path};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Trigger the deployment workflow for a region, environment and deployment.
pub struct Args {
    #[argp(option, short = 'r')]
    /// region to deploy to
    pub region: String,
    #[argp(option, short = 'e')]
    /// environment to deploy to
    pub environment: String,
    #[argp(option, short = 'd')]
    /// deployment name
    pub deployment: String,
    #[argp(option)]
    /// pipeline stage, e.g. plan or apply
    pub stage: String,
    #[argp(option)]
    /// targets to deploy (infra, k8s), separated by commas or newlines
    pub targets: String,
    #[argp(option)]
    /// git ref to run the workflow on
    pub branch: String,
    #[argp(option)]
    /// repository as owner/name (default: GITHUB_REPOSITORY or the origin remote)
    pub repo: Option<String>,
    #[argp(option, from_str_fn(path))]
    /// path to a YAML config file
    pub config: Option<PathBuf>,
}

pub async fn run(args: Args) -> Result<()> {
    let target = DispatchTarget::parse_list(&args.targets)?;
    let identity =
        WorkflowIdentity::new(target, args.region, args.environment, args.deployment, args.stage)?;
    let config = load_config(args.config.as_deref(), Overrides {
        repository: args.repo,
        ..Default::default()
    })?;
    let github = GitHub::new(&config.github)?;

    println!(
        "\n==> triggering workflow: {} ({}) [{}]\n",
        identity,
        identity.file_name(),
        args.branch
    );
    let dispatched = dispatch(&github, &identity, &args.branch)
        .await
        .with_context(|| format!("Failed to trigger workflow for {identity}"))?;
    tracing::debug!("Dispatched {} with {:?}", dispatched.workflow_file, dispatched.request);
    Ok(())
}
