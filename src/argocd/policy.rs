use crate::error::Error;
use crate::store::{ArgoStore, DocumentRef};

/// Outcome of a policy line synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    Appended,
    AlreadyPresent,
}

/// Append `line` to the newline-delimited policy value under `key` unless an
/// identical line already exists. The whole value is rewritten, so the write
/// is version-guarded; a losing writer re-fetches and re-runs the duplicate
/// check before its next attempt.
#[tracing::instrument(skip(store), fields(%doc), err)]
pub async fn sync_policy_line(
    store: &dyn ArgoStore,
    doc: &DocumentRef,
    key: &str,
    line: &str,
    max_attempts: u32,
) -> Result<PolicyOutcome, Error> {
    for attempt in 1..=max_attempts {
        let mut current = store.fetch_config_map(doc).await?;
        let csv = current.data.get(key).map(String::as_str).unwrap_or_default();

        if contains_line(csv, line) {
            return Ok(PolicyOutcome::AlreadyPresent);
        }

        let appended = append_line(csv, line);
        current.data.insert(key.to_owned(), appended);
        match store.replace_config_map(doc, &current).await {
            Ok(()) => {
                tracing::info!(%doc, line, "policy line appended");
                return Ok(PolicyOutcome::Appended);
            }
            Err(Error::Conflict(_)) => {
                tracing::debug!(%doc, attempt, "policy update lost a concurrent write, refetching");
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::ConflictsExhausted {
        resource: doc.to_string(),
        attempts: max_attempts,
    })
}

/// Exact-line match; lines differing only in whitespace are distinct.
fn contains_line(csv: &str, line: &str) -> bool {
    csv.split('\n').any(|l| l == line)
}

fn append_line(csv: &str, line: &str) -> String {
    if csv.is_empty() {
        line.to_owned()
    } else {
        format!("{csv}\n{line}")
    }
}
