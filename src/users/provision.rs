use anyhow::Context;
use tracing::{info, instrument};

use super::repo::UserStore;
use super::repo_types::InsertOutcome;

/// Identity reported by an OAuth provider on sign-in.
#[derive(Debug, Clone)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    Existing,
}

/// Makes sure a user row exists for `identity`.
///
/// Existing rows are left as they are: the stored name is not synced and the
/// counters are not reset. Store failures propagate so the caller can refuse
/// the sign-in.
#[instrument(skip(store, identity), fields(email = %identity.email))]
pub async fn provision_user(
    store: &dyn UserStore,
    identity: &Identity,
) -> anyhow::Result<ProvisionOutcome> {
    let name = identity.name.as_deref().unwrap_or("");
    let outcome = store
        .insert_if_absent(&identity.email, name)
        .await
        .context("provision user")?;

    match outcome {
        InsertOutcome::Inserted => {
            info!("provisioned new user");
            Ok(ProvisionOutcome::Created)
        }
        InsertOutcome::AlreadyExists => Ok(ProvisionOutcome::Existing),
    }
}
