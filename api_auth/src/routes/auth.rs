use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, get, http::header::AUTHORIZATION, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    session::{SESSION_COOKIE, bearer_token},
};
use db::UserStore;
use serde_json::json;

use crate::dtos::auth::SessionStatus;
use crate::services::{self, identity::IdentityProvider};

/// Exchanges an identity token for a session cookie.
///
/// # Input
/// - `Authorization` header: `Bearer <identity token>` obtained from the identity provider's client SDK
/// - `identity`: Identity provider used to verify the token and mint the session
/// - `store`: User store, the user's email is synced on every sign-in
///
/// # Output
/// - Success: 200 with an empty JSON object and a `session` cookie
///   (`HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=432000`)
/// - Error: 400 Bad Request when the header is missing or the token does not verify
///
/// # Frontend Example
/// ```javascript
/// const idToken = await firebase.auth().currentUser.getIdToken();
/// const response = await fetch('/api/auth', {
///   method: 'POST',
///   credentials: 'include',
///   headers: {
///     'Authorization': `Bearer ${idToken}`
///   }
/// });
///
/// if (response.ok) {
///   window.location.href = '/app';
/// }
/// ```
#[post("")]
pub async fn post_session(
    req: HttpRequest,
    identity: web::Data<dyn IdentityProvider>,
    store: web::Data<dyn UserStore>,
) -> Res<HttpResponse> {
    let id_token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::InvalidToken("No bearer token provided".to_string()))?;

    let (_, session) =
        services::session::sign_in(identity.get_ref(), store.get_ref(), id_token).await?;

    Ok(HttpResponse::Ok()
        .cookie(services::session::session_cookie(session))
        .json(json!({})))
}

/// Reports whether the request carries a valid session cookie.
///
/// # Output
/// - Success: `{ "uid": "...", "email": "..." }`
/// - Error: 401 Unauthorized when the cookie is missing, invalid, expired or revoked
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/auth', { credentials: 'include' });
/// const signedIn = response.ok;
/// ```
#[get("")]
pub async fn get_session(
    req: HttpRequest,
    identity: web::Data<dyn IdentityProvider>,
    config: web::Data<Arc<Config>>,
) -> Res<HttpResponse> {
    let cookie = req
        .cookie(SESSION_COOKIE)
        .filter(|c| !c.value().is_empty())
        .ok_or_else(|| AppError::Unauthorized("No session cookie".to_string()))?;

    let claims = identity
        .verify_session_cookie(cookie.value(), config.session_check_revoked)
        .await?;

    Ok(HttpResponse::Ok().json(SessionStatus {
        uid: claims.sub,
        email: claims.email,
    }))
}

/// Clears the session cookie.
///
/// The identity provider's client-side session is not touched; the browser
/// still has to sign out of the SDK itself.
///
/// # Frontend Example
/// ```javascript
/// await fetch('/api/auth/logout', { method: 'POST', credentials: 'include' });
/// await firebase.auth().signOut();
/// ```
#[post("/logout")]
pub async fn post_logout() -> Res<HttpResponse> {
    Ok(HttpResponse::Ok()
        .cookie(services::session::removal_cookie())
        .json(json!({})))
}
