use farm_api::prelude::*;
use log::{info, warn};

use crate::store::{FieldValue, Patch, StoreError, UserStore};

/// Create the document for a new user. Refuses to overwrite an existing one.
/// When `referred_by` names another user, this user is added to their
/// referral list with a store-stamped join time.
pub async fn register_user<S: UserStore>(
    store: &S,
    user_id: &str,
    referred_by: Option<&str>,
) -> Result<UserDocument, StoreError> {
    let referred_by = referred_by.filter(|r| !r.is_empty() && *r != user_id);
    let code = generate_referral_code(&mut rand::thread_rng());

    let commit = store
        .atomic_update(user_id, |doc, server_now| match doc {
            Some(_) => None,
            None => Some(UserDocument::new_user(
                code.clone(),
                referred_by.map(str::to_string),
                server_now,
            )),
        })
        .await?;

    let doc = match commit.snapshot {
        Some(doc) if commit.committed => doc,
        _ => return Err(StoreError::UserExists(user_id.to_string())),
    };
    info!("registered {} with code {}", user_id, code);

    if let Some(referrer) = referred_by {
        let mut patch = Patch::new();
        patch.insert(
            format!("referrals/{}/joinedAt", user_id),
            FieldValue::ServerTimestamp,
        );
        if let Err(e) = store.update(referrer, patch).await {
            warn!("could not link {} to referrer {}: {}", user_id, referrer, e);
        }
    }

    Ok(doc)
}
