pub mod kube;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::error::Error;

/// Reference to one external key/value document, e.g. `argocd/argocd-cm`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub namespace: String,
    pub name: String,
}

impl DocumentRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Snapshot of a key/value document plus the concurrency token it was read
/// at. A conditional write with a stale token fails with `Conflict`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueDocument {
    pub version: Option<String>,
    pub data: BTreeMap<String, String>,
}

/// Snapshot of a cluster user group and its concurrency token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGroup {
    pub name: String,
    pub version: Option<String>,
    pub users: Vec<String>,
}

/// External-store operations the reconciler needs. The production
/// implementation talks to the cluster API; tests inject an in-memory
/// store with the same conflict semantics.
///
/// The merge operations touch only the named keys and must be safe against
/// concurrent writers of unrelated keys. The fetch/replace pairs rewrite a
/// whole value and therefore carry the read version as a write precondition.
#[async_trait]
pub trait ArgoStore: Send + Sync {
    /// Merge `entries` into the ConfigMap's data, leaving other keys untouched.
    async fn merge_config_map_keys(
        &self,
        doc: &DocumentRef,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), Error>;

    /// Merge `entries` into the Secret's data. Values are already encoded
    /// for storage.
    async fn merge_secret_keys(
        &self,
        doc: &DocumentRef,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), Error>;

    /// Read a ConfigMap as a whole document with its version token.
    async fn fetch_config_map(&self, doc: &DocumentRef) -> Result<KeyValueDocument, Error>;

    /// Conditionally replace a ConfigMap's data; fails with `Conflict` when
    /// the document changed since `kv` was fetched.
    async fn replace_config_map(
        &self,
        doc: &DocumentRef,
        kv: &KeyValueDocument,
    ) -> Result<(), Error>;

    /// Read a cluster group and its member list.
    async fn fetch_group(&self, name: &str) -> Result<UserGroup, Error>;

    /// Conditionally replace a group's member list; fails with `Conflict`
    /// when the group changed since it was fetched.
    async fn replace_group(&self, group: &UserGroup) -> Result<(), Error>;
}
