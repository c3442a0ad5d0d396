use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declarative request for a team's Argo CD CI identities. The operator
/// only reads this resource; it is owned by whoever manages teams.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "team.snappcloud.io",
    version = "v1",
    kind = "Team",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct TeamSpec {
    /// Team owner contact; informational only.
    #[serde(default)]
    pub team_admin: String,
    pub argo: ArgoAccess,
}

/// Per-role Argo CD access blocks.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct ArgoAccess {
    pub admin: RoleAccess,
    pub view: RoleAccess,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleAccess {
    /// Plaintext CI password for this role's static account.
    #[serde(default)]
    pub ci_pass: String,
    /// Users granted this role through the matching cluster group.
    #[serde(default)]
    pub users: Vec<String>,
}
