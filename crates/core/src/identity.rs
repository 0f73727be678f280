use std::fmt;

use crate::error::{Error, Result};

/// Which part of a deployment a workflow operates on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DispatchTarget {
    Infra,
    K8s,
    InfraAndK8s,
}

impl DispatchTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Infra => "infra",
            Self::K8s => "k8s",
            Self::InfraAndK8s => "infra_and_k8s",
        }
    }

    /// Parse a comma or newline separated target list, e.g. `"infra,k8s"`.
    pub fn parse_list(targets: &str) -> Result<Self> {
        Self::from_targets(targets.split([',', '\n']))
    }

    /// Reduce a set of targets to the workflow target that covers all of them.
    ///
    /// `k8s_and_infra` and `infra_and_k8s` are accepted as aliases for both targets.
    pub fn from_targets<I, S>(targets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut infra = false;
        let mut k8s = false;
        for target in targets {
            match target.as_ref().trim() {
                "" => {}
                "infra" => infra = true,
                "k8s" => k8s = true,
                "k8s_and_infra" | "infra_and_k8s" => {
                    infra = true;
                    k8s = true;
                }
                other => tracing::warn!("Ignoring unrecognized target {:?}", other),
            }
        }
        match (infra, k8s) {
            (true, true) => Ok(Self::InfraAndK8s),
            (true, false) => Ok(Self::Infra),
            (false, true) => Ok(Self::K8s),
            (false, false) => {
                Err(Error::configuration("no recognized target (expected infra and/or k8s)"))
            }
        }
    }
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Everything that names a deployment workflow.
///
/// The workflow file dispatched by the trigger and the workflow name matched by the
/// poller are both derived from this value, so a run started for an identity is
/// always found again with the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkflowIdentity {
    pub target: DispatchTarget,
    pub region: String,
    pub environment: String,
    pub deployment: String,
    pub stage: String,
}

impl WorkflowIdentity {
    pub fn new(
        target: DispatchTarget,
        region: impl Into<String>,
        environment: impl Into<String>,
        deployment: impl Into<String>,
        stage: impl Into<String>,
    ) -> Result<Self> {
        let identity = Self {
            target,
            region: region.into(),
            environment: environment.into(),
            deployment: deployment.into(),
            stage: stage.into(),
        };
        for (field, value) in [
            ("region", &identity.region),
            ("environment", &identity.environment),
            ("deployment", &identity.deployment),
            ("stage", &identity.stage),
        ] {
            if value.trim().is_empty() {
                return Err(Error::configuration(format!("{field} must not be empty")));
            }
        }
        Ok(identity)
    }

    /// File name of the workflow definition, e.g. `infra-us-prod-blue-deploy.yaml`.
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}.yaml",
            self.target, self.region, self.environment, self.deployment, self.stage
        )
    }

    /// Human name of the workflow, e.g. `infra us-prod-blue deploy`.
    pub fn run_name(&self) -> String {
        format!(
            "{} {}-{}-{} {}",
            self.target, self.region, self.environment, self.deployment, self.stage
        )
    }
}

impl fmt::Display for WorkflowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.environment, self.deployment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_list() {
        let cases: &[(&str, Option<DispatchTarget>)] = &[
            ("infra,k8s", Some(DispatchTarget::InfraAndK8s)),
            ("k8s,infra", Some(DispatchTarget::InfraAndK8s)),
            ("k8s\ninfra\n", Some(DispatchTarget::InfraAndK8s)),
            ("k8s_and_infra", Some(DispatchTarget::InfraAndK8s)),
            ("infra_and_k8s", Some(DispatchTarget::InfraAndK8s)),
            ("infra", Some(DispatchTarget::Infra)),
            (" k8s ", Some(DispatchTarget::K8s)),
            ("k8s,docs", Some(DispatchTarget::K8s)),
            ("", None),
            ("docs", None),
        ];
        for &(targets, expected) in cases {
            assert_eq!(DispatchTarget::parse_list(targets).ok(), expected, "{targets:?}");
        }
    }

    #[test]
    fn test_no_target_is_configuration_error() {
        let err = DispatchTarget::from_targets(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_identity_names() {
        let target = DispatchTarget::from_targets(["infra", "k8s"]).unwrap();
        let identity = WorkflowIdentity::new(target, "us", "prod", "blue", "deploy").unwrap();
        assert_eq!(identity.file_name(), "infra_and_k8s-us-prod-blue-deploy.yaml");
        assert_eq!(identity.run_name(), "infra_and_k8s us-prod-blue deploy");
        assert_eq!(identity.to_string(), "us/prod/blue");
    }

    #[test]
    fn test_identity_names_share_fields() {
        for target in [DispatchTarget::Infra, DispatchTarget::K8s, DispatchTarget::InfraAndK8s] {
            let identity = WorkflowIdentity::new(target, "eu", "stg", "green", "plan").unwrap();
            let file = identity.file_name();
            let stem = file.strip_suffix(".yaml").unwrap();
            assert_eq!(stem.replace('-', " "), identity.run_name().replace('-', " "));
        }
    }

    #[test]
    fn test_identity_rejects_empty_fields() {
        let err = WorkflowIdentity::new(DispatchTarget::Infra, "us", " ", "blue", "deploy")
            .unwrap_err();
        assert!(err.to_string().contains("environment"));
    }
}
