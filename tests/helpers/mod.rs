#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use team_operator::config::Config;
use team_operator::error::Error;
use team_operator::reconciler::Context;
use team_operator::store::{ArgoStore, DocumentRef, KeyValueDocument, UserGroup};
use team_operator::team::{ArgoAccess, RoleAccess, Team, TeamSpec};

#[derive(Default, Clone)]
pub struct VersionedDoc {
    pub version: u64,
    pub data: BTreeMap<String, String>,
}

#[derive(Default, Clone)]
pub struct VersionedGroup {
    pub version: u64,
    pub users: Vec<String>,
}

/// A one-shot racing write landed on a config map key right before the next
/// conditional replace, forcing that replace to lose.
pub struct Interloper {
    pub namespace: String,
    pub name: String,
    pub key: String,
    pub line: String,
}

/// In-memory store with the cluster's optimistic-concurrency semantics:
/// every write bumps a version counter, and a conditional write whose token
/// is stale fails with `Conflict`. Documents are never auto-created.
#[derive(Default)]
pub struct FakeStore {
    pub config_maps: Mutex<HashMap<(String, String), VersionedDoc>>,
    pub secrets: Mutex<HashMap<(String, String), VersionedDoc>>,
    pub groups: Mutex<HashMap<String, VersionedGroup>>,
    pub interloper: Mutex<Option<Interloper>>,
    /// Fail this many upcoming conditional replaces, bumping the stored
    /// version each time the way a racing writer would.
    pub fail_replaces: AtomicU32,
    pub replace_calls: AtomicU32,
}

impl FakeStore {
    pub fn seed_config_map(&self, namespace: &str, name: &str, entries: &[(&str, &str)]) {
        let data = entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        self.config_maps.lock().unwrap().insert(
            (namespace.to_owned(), name.to_owned()),
            VersionedDoc { version: 1, data },
        );
    }

    pub fn seed_secret(&self, namespace: &str, name: &str, entries: &[(&str, &str)]) {
        let data = entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        self.secrets.lock().unwrap().insert(
            (namespace.to_owned(), name.to_owned()),
            VersionedDoc { version: 1, data },
        );
    }

    pub fn seed_group(&self, name: &str, users: &[&str]) {
        self.groups.lock().unwrap().insert(
            name.to_owned(),
            VersionedGroup {
                version: 1,
                users: users.iter().map(|u| (*u).to_owned()).collect(),
            },
        );
    }

    pub fn config_map_data(&self, namespace: &str, name: &str) -> BTreeMap<String, String> {
        self.config_maps
            .lock()
            .unwrap()
            .get(&(namespace.to_owned(), name.to_owned()))
            .expect("config map not seeded")
            .data
            .clone()
    }

    pub fn secret_data(&self, namespace: &str, name: &str) -> BTreeMap<String, String> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_owned(), name.to_owned()))
            .expect("secret not seeded")
            .data
            .clone()
    }

    pub fn group_users(&self, name: &str) -> Vec<String> {
        self.groups
            .lock()
            .unwrap()
            .get(name)
            .expect("group not seeded")
            .users
            .clone()
    }

    pub fn policy_value(&self, namespace: &str, name: &str, key: &str) -> String {
        self.config_map_data(namespace, name)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ArgoStore for FakeStore {
    async fn merge_config_map_keys(
        &self,
        doc: &DocumentRef,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let mut maps = self.config_maps.lock().unwrap();
        let entry = maps
            .get_mut(&(doc.namespace.clone(), doc.name.clone()))
            .ok_or_else(|| Error::NotFound(format!("config map {doc}")))?;
        entry.data.extend(entries.clone());
        entry.version += 1;
        Ok(())
    }

    async fn merge_secret_keys(
        &self,
        doc: &DocumentRef,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        let mut maps = self.secrets.lock().unwrap();
        let entry = maps
            .get_mut(&(doc.namespace.clone(), doc.name.clone()))
            .ok_or_else(|| Error::NotFound(format!("secret {doc}")))?;
        entry.data.extend(entries.clone());
        entry.version += 1;
        Ok(())
    }

    async fn fetch_config_map(&self, doc: &DocumentRef) -> Result<KeyValueDocument, Error> {
        let maps = self.config_maps.lock().unwrap();
        let entry = maps
            .get(&(doc.namespace.clone(), doc.name.clone()))
            .ok_or_else(|| Error::NotFound(format!("config map {doc}")))?;
        Ok(KeyValueDocument {
            version: Some(entry.version.to_string()),
            data: entry.data.clone(),
        })
    }

    async fn replace_config_map(
        &self,
        doc: &DocumentRef,
        kv: &KeyValueDocument,
    ) -> Result<(), Error> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);

        let mut maps = self.config_maps.lock().unwrap();
        let entry = maps
            .get_mut(&(doc.namespace.clone(), doc.name.clone()))
            .ok_or_else(|| Error::NotFound(format!("config map {doc}")))?;

        // A racing writer lands between the caller's fetch and this write.
        let interloper = self.interloper.lock().unwrap().take();
        if let Some(i) = interloper
            && i.namespace == doc.namespace
            && i.name == doc.name
        {
            let csv = entry.data.entry(i.key).or_default();
            if csv.is_empty() {
                *csv = i.line;
            } else {
                csv.push('\n');
                csv.push_str(&i.line);
            }
            entry.version += 1;
        }

        if self.fail_replaces.load(Ordering::SeqCst) > 0 {
            self.fail_replaces.fetch_sub(1, Ordering::SeqCst);
            entry.version += 1;
            return Err(Error::Conflict(format!("config map {doc}")));
        }

        if kv.version != Some(entry.version.to_string()) {
            return Err(Error::Conflict(format!("config map {doc}")));
        }

        entry.data = kv.data.clone();
        entry.version += 1;
        Ok(())
    }

    async fn fetch_group(&self, name: &str) -> Result<UserGroup, Error> {
        let groups = self.groups.lock().unwrap();
        let entry = groups
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("group {name}")))?;
        Ok(UserGroup {
            name: name.to_owned(),
            version: Some(entry.version.to_string()),
            users: entry.users.clone(),
        })
    }

    async fn replace_group(&self, group: &UserGroup) -> Result<(), Error> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);

        let mut groups = self.groups.lock().unwrap();
        let entry = groups
            .get_mut(&group.name)
            .ok_or_else(|| Error::NotFound(format!("group {}", group.name)))?;

        if self.fail_replaces.load(Ordering::SeqCst) > 0 {
            self.fail_replaces.fetch_sub(1, Ordering::SeqCst);
            entry.version += 1;
            return Err(Error::Conflict(format!("group {}", group.name)));
        }

        if group.version != Some(entry.version.to_string()) {
            return Err(Error::Conflict(format!("group {}", group.name)));
        }

        entry.users = group.users.clone();
        entry.version += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Config with the production document names but a minimum bcrypt cost so
/// the suite stays fast.
pub fn test_config() -> Config {
    Config {
        argocd_namespace: "argocd".into(),
        identity_config_map: "argocd-cm".into(),
        credential_secret: "argocd-secret".into(),
        rbac_config_map: "argocd-rbac-cm".into(),
        policy_key: "policy.csv".into(),
        hash_cost: 4,
        conflict_retries: 3,
        resync_interval_secs: 3600,
    }
}

/// Store pre-provisioned with the three Argo CD documents, each carrying an
/// unrelated entry so merge isolation is observable.
pub fn seeded_store() -> FakeStore {
    let store = FakeStore::default();
    store.seed_config_map("argocd", "argocd-cm", &[("url", "https://argocd.example.com")]);
    store.seed_secret("argocd", "argocd-secret", &[("server.secretkey", "c2VjcmV0")]);
    store.seed_config_map(
        "argocd",
        "argocd-rbac-cm",
        &[
            ("policy.default", "role:readonly"),
            ("policy.csv", "g,org-admins,role:org-admin"),
        ],
    );
    store
}

pub fn context(store: std::sync::Arc<FakeStore>) -> Context {
    Context {
        store,
        config: test_config(),
    }
}

pub fn team_fixture(name: &str) -> Team {
    Team::new(
        name,
        TeamSpec {
            team_admin: "owner@example.com".into(),
            argo: ArgoAccess {
                admin: RoleAccess {
                    ci_pass: "s3cr3t".into(),
                    users: vec!["alice".into()],
                },
                view: RoleAccess {
                    ci_pass: "v1ewer".into(),
                    users: vec!["bob".into()],
                },
            },
        },
    )
}
