use std::process::ExitCode;

use pipeline_dispatch_cli::{cmd::trigger, util};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    util::init_logging();
    let args: trigger::Args = argp::parse_args_or_exit(argp::DEFAULT);
    match trigger::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => util::report_error(&e),
    }
}
