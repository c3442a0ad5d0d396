use crate::error::Error;
use crate::store::ArgoStore;

/// Outcome of one group membership synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    /// Members appended this pass; empty when everyone was already present.
    pub added: Vec<String>,
}

impl GroupOutcome {
    pub fn unchanged(&self) -> bool {
        self.added.is_empty()
    }
}

/// Ensure every entry of `members` is present in the named cluster group.
/// Existing members are never removed or reordered, and a member is never
/// added twice. The whole list is rewritten, so the update is version-guarded
/// with bounded retry; a losing writer re-fetches and re-checks membership.
#[tracing::instrument(skip(store, members), err)]
pub async fn sync_group_members(
    store: &dyn ArgoStore,
    group: &str,
    members: &[String],
    max_attempts: u32,
) -> Result<GroupOutcome, Error> {
    for attempt in 1..=max_attempts {
        let mut current = store.fetch_group(group).await?;

        let mut missing: Vec<String> = Vec::new();
        for member in members {
            if !current.users.contains(member) && !missing.contains(member) {
                missing.push(member.clone());
            }
        }

        if missing.is_empty() {
            return Ok(GroupOutcome { added: missing });
        }

        current.users.extend(missing.iter().cloned());
        match store.replace_group(&current).await {
            Ok(()) => {
                tracing::info!(group, added = missing.len(), "group members appended");
                return Ok(GroupOutcome { added: missing });
            }
            Err(Error::Conflict(_)) => {
                tracing::debug!(group, attempt, "group update lost a concurrent write, refetching");
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::ConflictsExhausted {
        resource: format!("group {group}"),
        attempts: max_attempts,
    })
}
