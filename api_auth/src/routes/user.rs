use actix_web::{Responder, get, web};
use common::{
    error::{AppError, Res},
    http::Success,
    session::IdentityClaims,
};
use db::UserStore;

/// Endpoint to retrieve the stored record of the signed-in user.
///
/// # Input
/// - `claims`: Identity attached by the session gate
/// - `store`: User store
///
/// # Output
/// - Success: the user record (`id`, `email`, `stripe_customer_id`, `active_plans`, timestamps)
/// - Error: 401 Unauthorized without a valid session, 404 Not Found if the user never signed in
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/user', { credentials: 'include' });
///
/// if (response.ok) {
///   const user = await response.json();
///   console.log('Active plans:', user.active_plans);
/// }
/// ```
#[get("")]
pub async fn get_user(
    claims: web::ReqData<IdentityClaims>,
    store: web::Data<dyn UserStore>,
) -> Res<impl Responder> {
    let user = store
        .get_user(claims.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Success::ok(user)
}
