use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use pipeline_dispatch_core::{Error, Result, api::ActionsApi, retry::RetryPolicy};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Retries for transient download failures.
    pub policy: RetryPolicy,
    /// Where to create the extraction directory. Defaults to the system temp dir.
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub name: String,
    pub contents: String,
}

/// The top-level log files of a run, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLogs {
    pub files: Vec<LogFile>,
}

/// Download the log archive of a run and extract its text.
pub async fn fetch_logs<A: ActionsApi>(
    api: &A,
    run_id: u64,
    options: &LogOptions,
    cancel: &CancellationToken,
) -> Result<RunLogs> {
    let archive = download_logs(api, run_id, &options.policy, cancel).await?;
    tracing::info!("Downloaded logs for workflow run {} ({} bytes)", run_id, archive.len());
    extract_logs(&archive, options.scratch_dir.as_deref())
}

async fn download_logs<A: ActionsApi>(
    api: &A,
    run_id: u64,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Bytes> {
    let mut poller = policy.start(cancel);
    loop {
        match poller.attempt(api.download_logs(run_id)).await {
            Ok(archive) => return Ok(archive),
            Err(e) if e.is_transient() => {
                tracing::warn!("{} (attempt {}), retrying", e, poller.attempts() + 1);
                poller.wait().await?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Extract a log archive into a scratch directory under `scratch_root` and read
/// back every regular file at its top level. The scratch directory is removed
/// before returning, whether extraction succeeded or not.
pub fn extract_logs(archive: &[u8], scratch_root: Option<&Path>) -> Result<RunLogs> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("run-logs-");
    let scratch = match scratch_root {
        Some(root) => builder.tempdir_in(root)?,
        None => builder.tempdir()?,
    };
    let logs = extract_into(archive, scratch.path())?;
    scratch.close()?;
    Ok(logs)
}

fn extract_into(archive: &[u8], dir: &Path) -> Result<RunLogs> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(archive)).map_err(|e| Error::Archive(e.into()))?;
    archive.extract(dir).map_err(|e| Error::Archive(e.into()))?;

    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    let mut logs = RunLogs::default();
    for entry in entries {
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        tracing::info!("Reading log file {}", name);
        let data = fs::read(entry.path())?;
        logs.files.push(LogFile { name, contents: String::from_utf8_lossy(&data).into_owned() });
    }
    Ok(logs)
}
