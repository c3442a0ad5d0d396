use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::Api;
use kube::api::{DynamicObject, Patch, PatchParams};
use kube::discovery::ApiResource;

use super::{ArgoStore, DocumentRef, KeyValueDocument, UserGroup};
use crate::error::Error;

/// Cluster-backed store. Identity and credential writes go through
/// server-side strategic merge so concurrent writers of unrelated keys
/// never race; policy and group writes are whole-value rewrites guarded by
/// the document's `resourceVersion`.
pub struct KubeArgoStore {
    client: kube::Client,
}

impl KubeArgoStore {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn groups(&self) -> Api<DynamicObject> {
        Api::all_with(self.client.clone(), &group_resource())
    }
}

#[async_trait]
impl ArgoStore for KubeArgoStore {
    #[tracing::instrument(skip(self, entries), fields(%doc), err)]
    async fn merge_config_map_keys(
        &self,
        doc: &DocumentRef,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let patch = serde_json::json!({ "data": entries });
        self.config_maps(&doc.namespace)
            .patch(&doc.name, &PatchParams::default(), &Patch::Strategic(&patch))
            .await
            .map_err(|e| classify_write(e, &format!("config map {doc}")))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, entries), fields(%doc), err)]
    async fn merge_secret_keys(
        &self,
        doc: &DocumentRef,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let patch = serde_json::json!({ "data": entries });
        self.secrets(&doc.namespace)
            .patch(&doc.name, &PatchParams::default(), &Patch::Strategic(&patch))
            .await
            .map_err(|e| classify_write(e, &format!("secret {doc}")))?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(%doc), err)]
    async fn fetch_config_map(&self, doc: &DocumentRef) -> Result<KeyValueDocument, Error> {
        let cm = self
            .config_maps(&doc.namespace)
            .get(&doc.name)
            .await
            .map_err(|e| not_found_on_404(e, &format!("config map {doc}")))?;
        Ok(KeyValueDocument {
            version: cm.metadata.resource_version,
            data: cm.data.unwrap_or_default(),
        })
    }

    #[tracing::instrument(skip(self, kv), fields(%doc), err)]
    async fn replace_config_map(
        &self,
        doc: &DocumentRef,
        kv: &KeyValueDocument,
    ) -> Result<(), Error> {
        // The resourceVersion in the patch body is a write precondition: the
        // API server rejects the patch with 409 when the token is stale.
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": kv.version },
            "data": kv.data,
        });
        self.config_maps(&doc.namespace)
            .patch(&doc.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify_write(e, &format!("config map {doc}")))?;
        Ok(())
    }

    #[tracing::instrument(skip(self), err)]
    async fn fetch_group(&self, name: &str) -> Result<UserGroup, Error> {
        let obj = self
            .groups()
            .get(name)
            .await
            .map_err(|e| not_found_on_404(e, &format!("group {name}")))?;
        let users = parse_users(name, obj.data.get("users"))?;
        Ok(UserGroup {
            name: name.to_owned(),
            version: obj.metadata.resource_version,
            users,
        })
    }

    #[tracing::instrument(skip(self, group), fields(group = %group.name), err)]
    async fn replace_group(&self, group: &UserGroup) -> Result<(), Error> {
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": group.version },
            "users": group.users,
        });
        self.groups()
            .patch(&group.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify_write(e, &format!("group {}", group.name)))?;
        Ok(())
    }
}

/// `user.openshift.io/v1 Group` is an aggregated API with no k8s-openapi
/// bindings, so it is addressed dynamically. Groups are cluster-scoped.
fn group_resource() -> ApiResource {
    ApiResource {
        group: "user.openshift.io".to_owned(),
        version: "v1".to_owned(),
        api_version: "user.openshift.io/v1".to_owned(),
        kind: "Group".to_owned(),
        plural: "groups".to_owned(),
    }
}

fn parse_users(group: &str, users: Option<&serde_json::Value>) -> Result<Vec<String>, Error> {
    match users {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| Error::Malformed(format!("group {group}: non-string user entry")))
            })
            .collect(),
        Some(_) => Err(Error::Malformed(format!("group {group}: users is not a list"))),
    }
}

fn not_found_on_404(err: kube::Error, what: &str) -> Error {
    match err {
        kube::Error::Api(ref ae) if ae.code == 404 => Error::NotFound(what.to_owned()),
        e => e.into(),
    }
}

fn classify_write(err: kube::Error, what: &str) -> Error {
    match err {
        kube::Error::Api(ref ae) if ae.code == 404 => Error::NotFound(what.to_owned()),
        kube::Error::Api(ref ae) if ae.code == 409 => Error::Conflict(what.to_owned()),
        e => e.into(),
    }
}
