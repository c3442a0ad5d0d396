use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use kube::ResourceExt;
use kube::api::Api;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;

use crate::argocd::credentials;
use crate::argocd::groups;
use crate::argocd::identity::{CI_CAPABILITIES, CiIdentity, CiRole};
use crate::argocd::policy::{self, PolicyOutcome};
use crate::config::Config;
use crate::error::Error;
use crate::store::ArgoStore;
use crate::team::{RoleAccess, Team};

/// Shared reconciler dependencies, injected rather than global.
pub struct Context {
    pub store: Arc<dyn ArgoStore>,
    pub config: Config,
}

/// What one role branch did this invocation.
#[derive(Debug)]
pub struct BranchReport {
    pub role: CiRole,
    pub policy: PolicyOutcome,
    pub members_added: usize,
}

// ---------------------------------------------------------------------------
// Per-team reconciliation
// ---------------------------------------------------------------------------

/// Converge both CI identities for one Team snapshot. The admin and view
/// branches are independent: both run every invocation, and a failure in one
/// never stops the other. The first failure (admin preferred) is surfaced so
/// the caller requeues; retrying is safe because every step is idempotent.
pub async fn reconcile_team(team: &Team, ctx: &Context) -> Result<Vec<BranchReport>, Error> {
    let name = team.name_any();

    let (admin, view) = tokio::join!(
        reconcile_role(&name, &team.spec.argo.admin, CiRole::Admin, ctx),
        reconcile_role(&name, &team.spec.argo.view, CiRole::View, ctx),
    );

    let mut reports = Vec::new();
    let mut first_err = None;
    for outcome in [admin, view] {
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::warn!(team = %name, error = %e, "role branch failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(reports),
    }
}

/// One role branch: encode identity, hash credential, merge the identity and
/// credential documents, then converge the policy line and group membership.
/// Steps run strictly in order; the first failure aborts the branch with the
/// step recorded on the error.
#[tracing::instrument(skip(ctx, access), fields(%team, %role), err)]
async fn reconcile_role(
    team: &str,
    access: &RoleAccess,
    role: CiRole,
    ctx: &Context,
) -> Result<BranchReport, Error> {
    let cfg = &ctx.config;
    let store = ctx.store.as_ref();

    let identity = CiIdentity::new(team, role).map_err(|e| e.at_step("encode-identity"))?;

    let credential = credentials::hash_ci_password(&access.ci_pass, cfg.hash_cost)
        .map_err(|e| e.at_step("hash-credential"))?;

    let capability = BTreeMap::from([(identity.identity_key(), CI_CAPABILITIES.to_owned())]);
    store
        .merge_config_map_keys(&cfg.identity_store(), &capability)
        .await
        .map_err(|e| e.at_step("merge-identity-store"))?;

    let password = BTreeMap::from([(identity.credential_key(), credential)]);
    store
        .merge_secret_keys(&cfg.credential_store(), &password)
        .await
        .map_err(|e| e.at_step("merge-credential-store"))?;

    let policy = policy::sync_policy_line(
        store,
        &cfg.rbac_store(),
        &cfg.policy_key,
        &identity.policy_line(),
        cfg.conflict_retries,
    )
    .await
    .map_err(|e| e.at_step("sync-policy-line"))?;

    let membership = groups::sync_group_members(
        store,
        &identity.group_name(),
        &access.users,
        cfg.conflict_retries,
    )
    .await
    .map_err(|e| e.at_step("sync-group-members"))?;

    tracing::info!(
        account = %identity.account(),
        ?policy,
        members_added = membership.added.len(),
        "ci identity converged"
    );

    Ok(BranchReport {
        role,
        policy,
        members_added: membership.added.len(),
    })
}

// ---------------------------------------------------------------------------
// Controller wiring
// ---------------------------------------------------------------------------

async fn reconcile(team: Arc<Team>, ctx: Arc<Context>) -> Result<Action, Error> {
    let reports = reconcile_team(&team, &ctx).await?;
    for report in &reports {
        tracing::debug!(
            team = %team.name_any(),
            role = %report.role,
            outcome = ?report.policy,
            members_added = report.members_added,
            "branch reconciled"
        );
    }
    Ok(Action::requeue(Duration::from_secs(
        ctx.config.resync_interval_secs,
    )))
}

fn error_policy(team: Arc<Team>, err: &Error, _ctx: Arc<Context>) -> Action {
    // A missing document or a hashing failure repeats identically until
    // something changes externally; back off much further for those.
    let delay = if err.is_retryable() {
        Duration::from_secs(5)
    } else {
        Duration::from_secs(300)
    };
    tracing::warn!(team = %team.name_any(), error = %err, ?delay, "reconciliation failed, requeueing");
    Action::requeue(delay)
}

/// Watch Teams across all namespaces and drive reconciliation until a
/// shutdown signal arrives.
pub async fn run(client: kube::Client, ctx: Arc<Context>) {
    let teams: Api<Team> = Api::all(client);

    Controller::new(teams, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((team, _)) => tracing::debug!(team = %team.name, "reconciliation applied"),
                Err(e) => tracing::warn!(error = %e, "controller error"),
            }
        })
        .await;
}
