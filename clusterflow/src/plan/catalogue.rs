//! Static registry of the standard cluster provisioning stages.
//!
//! Each entry maps a stage id to the playbook it runs. Plans are resolved
//! from this table when they are built, never at dispatch time.

use super::{DeploymentPlan, StageSpec};
use crate::config::DeploymentConfig;
use crate::errors::PlanValidationError;
use std::collections::BTreeMap;

/// Program used to run every catalogue stage.
pub const ANSIBLE_PLAYBOOK: &str = "ansible-playbook";

const KUBECONFIG_PATH: &str = "/etc/kubernetes/admin.conf";

/// One stage of the standard catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueEntry {
    /// Stage id.
    pub id: &'static str,
    /// Playbook file name, relative to the playbooks directory.
    pub playbook: &'static str,
}

impl CatalogueEntry {
    /// Looks up an entry by stage id.
    #[must_use]
    pub fn lookup(id: &str) -> Option<&'static Self> {
        STANDARD_CATALOGUE.iter().find(|e| e.id == id)
    }
}

/// The standard provisioning order.
pub const STANDARD_CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry { id: "system-prep", playbook: "01_system_preparation.yml" },
    CatalogueEntry { id: "containerd", playbook: "02_containerd.yml" },
    CatalogueEntry { id: "kubernetes-install", playbook: "03_kubernetes_install.yml" },
    CatalogueEntry { id: "kubernetes-init", playbook: "04_kubernetes_init.yml" },
    CatalogueEntry { id: "calico", playbook: "05_calico_cni.yml" },
    CatalogueEntry { id: "worker-prep", playbook: "06_worker_preparation.yml" },
    CatalogueEntry { id: "worker-join", playbook: "07_worker_join.yml" },
    CatalogueEntry { id: "htcondor", playbook: "08_htcondor.yml" },
];

/// Returns the environment a playbook runs with.
///
/// `extra` wins over the defaults, and a default is also skipped when the
/// variable is inherited from this process. `KUBECONFIG` is always forced
/// for cluster-facing playbooks.
#[must_use]
pub fn playbook_env(playbook: &str, extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    resolve_env(playbook, extra, |key| std::env::var_os(key).is_some())
}

fn resolve_env(
    playbook: &str,
    extra: &BTreeMap<String, String>,
    inherited: impl Fn(&str) -> bool,
) -> BTreeMap<String, String> {
    let mut env = extra.clone();
    let mut default = |key: &str, value: &str| {
        if !env.contains_key(key) && !inherited(key) {
            env.insert(key.to_string(), value.to_string());
        }
    };
    default("ANSIBLE_HOST_KEY_CHECKING", "False");
    default("ANSIBLE_STDOUT_CALLBACK", "debug");

    let lower = playbook.to_lowercase();
    if lower.contains("htcondor") {
        default("CONDOR_LOG_LEVEL", "D_FULLDEBUG");
    }
    if ["kubernetes", "calico", "htcondor"].iter().any(|k| lower.contains(k)) {
        env.insert("KUBECONFIG".to_string(), KUBECONFIG_PATH.to_string());
    }
    env
}

/// Returns the catalogue entries selected by the configuration.
///
/// # Errors
///
/// Returns an error if the configuration names an unknown stage.
pub fn selected_entries(config: &DeploymentConfig) -> Result<Vec<&'static CatalogueEntry>, PlanValidationError> {
    match &config.stages {
        None => Ok(STANDARD_CATALOGUE.iter().collect()),
        Some(ids) => ids
            .iter()
            .map(|id| CatalogueEntry::lookup(id).ok_or_else(|| PlanValidationError::unknown_stage(id)))
            .collect(),
    }
}

/// Builds the deployment plan for a configuration.
///
/// # Errors
///
/// Returns an error if a stage id is unknown or repeated, or the selection
/// is empty.
pub fn build_plan(config: &DeploymentConfig) -> Result<DeploymentPlan, PlanValidationError> {
    let inventory = config.inventory_path.display().to_string();
    let stages = selected_entries(config)?
        .into_iter()
        .map(|entry| {
            let mut spec = StageSpec::new(entry.id, ANSIBLE_PLAYBOOK)
                .with_args(["-i", inventory.as_str(), entry.playbook])
                .with_working_dir(&config.playbooks_dir)
                .with_timeout(config.stage_timeout());
            spec.env = playbook_env(entry.playbook, &config.extra_env);
            spec
        })
        .collect();
    DeploymentPlan::new(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_catalogue_order() {
        let ids: Vec<&str> = STANDARD_CATALOGUE.iter().map(|e| e.id).collect();
        assert_eq!(
            ids,
            vec![
                "system-prep",
                "containerd",
                "kubernetes-install",
                "kubernetes-init",
                "calico",
                "worker-prep",
                "worker-join",
                "htcondor",
            ]
        );
    }

    #[test]
    fn test_env_defaults() {
        let env = resolve_env("02_containerd.yml", &BTreeMap::new(), |_| false);
        assert_eq!(env.get("ANSIBLE_HOST_KEY_CHECKING").map(String::as_str), Some("False"));
        assert_eq!(env.get("ANSIBLE_STDOUT_CALLBACK").map(String::as_str), Some("debug"));
        assert!(!env.contains_key("KUBECONFIG"));
    }

    #[test]
    fn test_env_cluster_playbooks() {
        let env = resolve_env("05_calico_cni.yml", &BTreeMap::new(), |_| false);
        assert_eq!(env.get("KUBECONFIG").map(String::as_str), Some(KUBECONFIG_PATH));

        let env = resolve_env("08_htcondor.yml", &BTreeMap::new(), |_| false);
        assert_eq!(env.get("CONDOR_LOG_LEVEL").map(String::as_str), Some("D_FULLDEBUG"));
    }

    #[test]
    fn test_env_extra_wins_except_kubeconfig() {
        let extra = BTreeMap::from([
            ("ANSIBLE_STDOUT_CALLBACK".to_string(), "yaml".to_string()),
            ("KUBECONFIG".to_string(), "/home/me/.kube/config".to_string()),
        ]);
        let env = resolve_env("04_kubernetes_init.yml", &extra, |_| false);
        assert_eq!(env.get("ANSIBLE_STDOUT_CALLBACK").map(String::as_str), Some("yaml"));
        assert_eq!(env.get("KUBECONFIG").map(String::as_str), Some(KUBECONFIG_PATH));
    }

    #[test]
    fn test_env_inherited_variables_are_kept() {
        let inherited = |key: &str| matches!(key, "ANSIBLE_STDOUT_CALLBACK" | "CONDOR_LOG_LEVEL" | "KUBECONFIG");
        let env = resolve_env("08_htcondor.yml", &BTreeMap::new(), inherited);

        assert!(!env.contains_key("ANSIBLE_STDOUT_CALLBACK"));
        assert!(!env.contains_key("CONDOR_LOG_LEVEL"));
        assert_eq!(env.get("ANSIBLE_HOST_KEY_CHECKING").map(String::as_str), Some("False"));
        assert_eq!(env.get("KUBECONFIG").map(String::as_str), Some(KUBECONFIG_PATH));
    }

    #[test]
    fn test_build_full_plan() {
        let config = DeploymentConfig::default()
            .with_inventory("hosts.ini")
            .with_playbooks_dir("/srv/playbooks")
            .with_timeout_minutes(15);
        let plan = build_plan(&config).unwrap();

        assert_eq!(plan.len(), STANDARD_CATALOGUE.len());
        let first = plan.get(0).unwrap();
        assert_eq!(first.command, ANSIBLE_PLAYBOOK);
        assert_eq!(first.args, vec!["-i", "hosts.ini", "01_system_preparation.yml"]);
        assert_eq!(first.timeout, Duration::from_secs(15 * 60));
        assert_eq!(first.working_dir, std::path::PathBuf::from("/srv/playbooks"));
    }

    #[test]
    fn test_build_selected_plan() {
        let config = DeploymentConfig::default().with_stages(["containerd", "calico"]);
        let plan = build_plan(&config).unwrap();
        let ids: Vec<String> = plan.stage_ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["containerd", "calico"]);
    }

    #[test]
    fn test_build_unknown_stage() {
        let config = DeploymentConfig::default().with_stages(["prometheus"]);
        let err = build_plan(&config).unwrap_err();
        assert_eq!(err.error_info.code, "PLAN-004-UNKNOWN");
    }

    #[test]
    fn test_build_duplicate_stage() {
        let config = DeploymentConfig::default().with_stages(["calico", "calico"]);
        assert!(build_plan(&config).is_err());
    }
}
