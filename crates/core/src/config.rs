use std::{
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{Error, Result},
    retry::RetryPolicy,
};

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

/// Fully resolved settings, built once at startup and passed to every component.
#[derive(Debug, Clone)]
pub struct Config {
    pub github: GitHubConfig,
    pub poll: PollConfig,
    pub logs: LogsConfig,
}

#[derive(Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub repository: Repository,
    pub api_url: Option<Url>,
    pub per_page: u8,
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[redacted]")
            .field("repository", &self.repository)
            .field("api_url", &self.api_url)
            .field("per_page", &self.per_page)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl FromStr for Repository {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self { owner: owner.to_string(), name: name.to_string() })
            }
            _ => Err(Error::configuration(format!("invalid repository {s:?}, expected owner/name"))),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self { Self { interval_secs: 5, timeout_secs: None, max_attempts: None } }
}

impl PollConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_secs(self.interval_secs))
            .with_max_attempts(self.max_attempts)
            .with_timeout(self.timeout_secs.map(Duration::from_secs))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogsConfig {
    pub retry_interval_secs: u64,
    pub max_interval_secs: u64,
    pub max_attempts: Option<u32>,
    /// Directory to extract log archives under. Defaults to the system temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: 2,
            max_interval_secs: 30,
            max_attempts: Some(30),
            scratch_dir: None,
        }
    }
}

impl LogsConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            Duration::from_secs(self.retry_interval_secs),
            Duration::from_secs(self.max_interval_secs),
        )
        .with_max_attempts(self.max_attempts)
    }
}

/// Optional YAML config file. Every field has a default; the token is never read
/// from the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub github: FileGitHubConfig,
    pub poll: PollConfig,
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileGitHubConfig {
    pub repository: Option<String>,
    pub api_url: Option<Url>,
    pub per_page: u8,
}

impl Default for FileGitHubConfig {
    fn default() -> Self { Self { repository: None, api_url: None, per_page: 100 } }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::configuration(format!("failed to open config file {}: {e}", path.display()))
        })?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| {
            Error::configuration(format!("failed to parse config file {}: {e}", path.display()))
        })
    }
}

/// Inputs to [`Config::resolve`] that come from outside the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--repo` flag.
    pub repository: Option<String>,
    /// Repository detected from the local git checkout, used as a last resort.
    pub detected_repository: Option<Repository>,
    pub poll_interval_secs: Option<u64>,
    pub poll_timeout_secs: Option<u64>,
}

impl Config {
    /// Combine the config file, command line overrides and environment into a
    /// [`Config`]. `env` looks up environment variables.
    ///
    /// Fails with [`Error::Configuration`] when no token or repository is available.
    pub fn resolve(
        file: FileConfig,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let token = env(TOKEN_ENV)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::configuration(format!("{TOKEN_ENV} is not set")))?;
        let repository = match overrides
            .repository
            .or(file.github.repository)
            .or_else(|| env(REPOSITORY_ENV).filter(|r| !r.is_empty()))
        {
            Some(repository) => repository.parse()?,
            None => overrides.detected_repository.ok_or_else(|| {
                Error::configuration(format!(
                    "no repository given (use --repo, {REPOSITORY_ENV} or run inside a \
                     GitHub checkout)"
                ))
            })?,
        };
        let mut poll = file.poll;
        if let Some(interval) = overrides.poll_interval_secs {
            poll.interval_secs = interval;
        }
        if let Some(timeout) = overrides.poll_timeout_secs {
            poll.timeout_secs = Some(timeout);
        }
        if file.github.per_page == 0 {
            return Err(Error::configuration("github.per_page must be at least 1"));
        }
        Ok(Self {
            github: GitHubConfig {
                token,
                repository,
                api_url: file.github.api_url,
                per_page: file.github.per_page.min(100),
            },
            poll,
            logs: file.logs,
        })
    }
}
