use std::process::ExitCode;

use pipeline_dispatch_cli::{cmd::query, util};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    util::init_logging();
    let args: query::Args = argp::parse_args_or_exit(argp::DEFAULT);
    match query::run(args).await {
        Ok(code) => code,
        Err(e) => util::report_error(&e),
    }
}
