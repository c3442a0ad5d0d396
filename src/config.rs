use std::env;

use crate::store::DocumentRef;

/// Runtime configuration, loaded from the environment with Argo CD's
/// conventional document names as defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace holding the Argo CD installation documents.
    pub argocd_namespace: String,
    /// ConfigMap listing static accounts and their capabilities.
    pub identity_config_map: String,
    /// Secret holding hashed account passwords.
    pub credential_secret: String,
    /// ConfigMap holding the rbac policy document.
    pub rbac_config_map: String,
    /// Key of the newline-delimited grant lines inside the rbac ConfigMap.
    pub policy_key: String,
    /// bcrypt work factor for CI passwords.
    pub hash_cost: u32,
    /// Bound on re-fetch attempts when a version-guarded write loses.
    pub conflict_retries: u32,
    /// Periodic re-reconcile interval for converged teams.
    pub resync_interval_secs: u64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            argocd_namespace: env::var("TEAM_OPERATOR_ARGOCD_NAMESPACE")
                .unwrap_or_else(|_| "argocd".into()),
            identity_config_map: env::var("TEAM_OPERATOR_IDENTITY_CONFIG_MAP")
                .unwrap_or_else(|_| "argocd-cm".into()),
            credential_secret: env::var("TEAM_OPERATOR_CREDENTIAL_SECRET")
                .unwrap_or_else(|_| "argocd-secret".into()),
            rbac_config_map: env::var("TEAM_OPERATOR_RBAC_CONFIG_MAP")
                .unwrap_or_else(|_| "argocd-rbac-cm".into()),
            policy_key: env::var("TEAM_OPERATOR_POLICY_KEY")
                .unwrap_or_else(|_| "policy.csv".into()),
            hash_cost: env::var("TEAM_OPERATOR_HASH_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(14),
            conflict_retries: env::var("TEAM_OPERATOR_CONFLICT_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            resync_interval_secs: env::var("TEAM_OPERATOR_RESYNC_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }

    /// The account/capability document (`argocd-cm`).
    pub fn identity_store(&self) -> DocumentRef {
        DocumentRef::new(&self.argocd_namespace, &self.identity_config_map)
    }

    /// The hashed-password document (`argocd-secret`).
    pub fn credential_store(&self) -> DocumentRef {
        DocumentRef::new(&self.argocd_namespace, &self.credential_secret)
    }

    /// The rbac policy document (`argocd-rbac-cm`).
    pub fn rbac_store(&self) -> DocumentRef {
        DocumentRef::new(&self.argocd_namespace, &self.rbac_config_map)
    }
}
