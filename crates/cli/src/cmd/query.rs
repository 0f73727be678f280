use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use argp::FromArgs;
use pipeline_dispatch_core::{
    config::Overrides,
    identity::{DispatchTarget, WorkflowIdentity},
    models::{Conclusion, WorkflowRun},
};
use pipeline_dispatch_github::GitHub;
use pipeline_dispatch_runs::{LogOptions, PollOptions, PollProgress, await_run, fetch_logs};

use crate::util::{cancel_on_shutdown, load_config, path, run_exit_code};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Wait for the latest dispatched deployment workflow run to finish and report its
/// conclusion.
pub struct Args {
    #[argp(option, short = 'r')]
    /// region of the deployment
    pub region: String,
    #[argp(option, short = 'e')]
    /// environment of the deployment
    pub environment: String,
    #[argp(option, short = 'd')]
    /// deployment name
    pub deployment: String,
    #[argp(option)]
    /// pipeline stage, e.g. plan or apply
    pub stage: String,
    #[argp(option)]
    /// targets that were deployed (infra, k8s), separated by commas or newlines
    pub targets: String,
    #[argp(option)]
    /// git ref the workflow was dispatched on
    pub branch: String,
    #[argp(switch)]
    /// print the run's logs once it has finished
    pub logs: bool,
    #[argp(option)]
    /// seconds between polls (default 5)
    pub interval: Option<u64>,
    #[argp(option)]
    /// give up waiting after this many seconds (default: wait forever)
    pub timeout: Option<u64>,
    #[argp(option)]
    /// repository as owner/name (default: GITHUB_REPOSITORY or the origin remote)
    pub repo: Option<String>,
    #[argp(option, from_str_fn(path))]
    /// path to a YAML config file
    pub config: Option<PathBuf>,
}

pub async fn run(args: Args) -> Result<ExitCode> {
    let target = DispatchTarget::parse_list(&args.targets)?;
    let identity =
        WorkflowIdentity::new(target, args.region, args.environment, args.deployment, args.stage)?;
    let config = load_config(args.config.as_deref(), Overrides {
        repository: args.repo,
        poll_interval_secs: args.interval,
        poll_timeout_secs: args.timeout,
        ..Default::default()
    })?;
    let github = GitHub::new(&config.github)?;
    let cancel = cancel_on_shutdown();

    println!("==> fetching workflow\n");
    let options = PollOptions {
        policy: config.poll.retry_policy(),
        per_page: config.github.per_page,
        branch: Some(args.branch),
    };
    let mut progress = ConsoleProgress::new(io::stdout());
    let result = await_run(&github, &identity, &options, &cancel, &mut progress).await;
    progress.finish_line();
    let run = result
        .with_context(|| format!("Failed to wait for workflow {}", identity.run_name()))?;

    if args.logs {
        let options =
            LogOptions { policy: config.logs.retry_policy(), scratch_dir: config.logs.scratch_dir };
        let logs = fetch_logs(&github, run.id, &options, &cancel)
            .await
            .with_context(|| format!("Failed to fetch logs for workflow run {}", run.id))?;
        for file in &logs.files {
            println!("\n==> file: {}\n", file.name);
            print!("{}", file.contents);
        }
        println!();
    }

    write_conclusion(&mut io::stdout(), run.conclusion)?;
    Ok(ExitCode::from(run_exit_code(run.conclusion)))
}

fn write_conclusion(out: &mut impl Write, conclusion: Option<Conclusion>) -> io::Result<()> {
    let conclusion = conclusion.map_or("none", |c| c.as_str());
    writeln!(out, "\naction exit status: {conclusion}")
}

/// Prints the waiting messages and progress dots.
struct ConsoleProgress<W: Write> {
    out: W,
    dots: bool,
}

impl<W: Write> ConsoleProgress<W> {
    fn new(out: W) -> Self { Self { out, dots: false } }

    fn dot(&mut self, message: &str, attempt: u32) {
        if attempt == 1 {
            let _ = write!(self.out, "{message}..");
        }
        let _ = write!(self.out, ".");
        let _ = self.out.flush();
        self.dots = true;
    }

    fn finish_line(&mut self) {
        if std::mem::take(&mut self.dots) {
            let _ = writeln!(self.out);
        }
    }
}

impl<W: Write> PollProgress for ConsoleProgress<W> {
    fn waiting_for_run(&mut self, attempt: u32) {
        self.dot("waiting for run(s) to become available", attempt)
    }

    fn run_found(&mut self, run: &WorkflowRun, _matches: usize) {
        self.finish_line();
        let _ = writeln!(self.out, "workflow run url: {}\n", run.html_url);
    }

    fn waiting_for_completion(&mut self, _run: &WorkflowRun, attempt: u32) {
        self.dot("waiting for run to finish", attempt)
    }
}

#[cfg(test)]
mod tests {
    use pipeline_dispatch_core::models::RunStatus;

    use super::*;

    fn run() -> WorkflowRun {
        WorkflowRun {
            id: 42,
            workflow_id: 1,
            name: None,
            event: "workflow_dispatch".to_string(),
            status: RunStatus::InProgress,
            conclusion: None,
            head_branch: Some("master".to_string()),
            html_url: "https://github.com/acme/deploy/actions/runs/42".to_string(),
            logs_url: String::new(),
            created_at: None,
            workflow_name: None,
            workflow_file: None,
        }
    }

    #[test]
    fn test_console_progress() {
        let mut progress = ConsoleProgress::new(Vec::new());
        progress.waiting_for_run(1);
        progress.waiting_for_run(2);
        progress.run_found(&run(), 1);
        progress.waiting_for_completion(&run(), 1);
        progress.waiting_for_completion(&run(), 2);
        progress.waiting_for_completion(&run(), 3);
        progress.finish_line();
        progress.finish_line();

        let output = String::from_utf8(progress.out).unwrap();
        assert_eq!(
            output,
            "waiting for run(s) to become available....\n\
             workflow run url: https://github.com/acme/deploy/actions/runs/42\n\n\
             waiting for run to finish.....\n"
        );
    }

    #[test]
    fn test_run_found_without_waiting() {
        let mut progress = ConsoleProgress::new(Vec::new());
        progress.run_found(&run(), 2);
        progress.finish_line();
        let output = String::from_utf8(progress.out).unwrap();
        assert_eq!(output, "workflow run url: https://github.com/acme/deploy/actions/runs/42\n\n");
    }

    #[test]
    fn test_write_conclusion() {
        let cases: &[(Option<Conclusion>, &str)] = &[
            (Some(Conclusion::Success), "\naction exit status: success\n"),
            (Some(Conclusion::TimedOut), "\naction exit status: timed_out\n"),
            (None, "\naction exit status: none\n"),
        ];
        for &(conclusion, expected) in cases {
            let mut out = Vec::new();
            write_conclusion(&mut out, conclusion).unwrap();
            assert_eq!(String::from_utf8(out).unwrap(), expected, "{conclusion:?}");
        }
    }
}
