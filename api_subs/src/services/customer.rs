use common::error::Res;
use db::UserStore;

use super::billing::{BillingCustomer, BillingProvider};

/// Returns the billing customer of `user_id`, creating it on first use and
/// again when the stored one was deleted at the provider.
///
/// Two first-time calls racing each other may both create a remote
/// customer. Only the first id claimed is stored and every caller gets the
/// stored customer back.
pub async fn ensure_customer(
    billing: &dyn BillingProvider,
    store: &dyn UserStore,
    user_id: &str,
) -> Res<BillingCustomer> {
    let user = match store.get_user(user_id).await? {
        Some(user) => user,
        None => store.upsert_email(user_id, None).await?,
    };

    let stale = match user.stripe_customer_id.as_deref() {
        Some(customer_id) => {
            let customer = billing.retrieve_customer(customer_id).await?;
            if !customer.deleted {
                return Ok(customer);
            }
            log::warn!("Customer {} of user {} was deleted", customer_id, user_id);
            Some(customer.id)
        }
        None => None,
    };

    let created = billing.create_customer(user_id, user.email.as_deref()).await?;
    let stored = match stale.as_deref() {
        Some(stale_id) => store.replace_customer_id(user_id, stale_id, &created.id).await?,
        None => store.claim_customer_id(user_id, &created.id).await?,
    };
    if stored != created.id {
        log::warn!(
            "Customer {} for user {} lost to already stored {}",
            created.id,
            user_id,
            stored
        );
        return billing.retrieve_customer(&stored).await;
    }

    log::info!("Created billing customer {} for user {}", created.id, user_id);
    Ok(created)
}
