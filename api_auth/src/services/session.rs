use actix_web::cookie::{Cookie, SameSite, time::Duration};
use common::{
    error::Res,
    session::{IdentityClaims, SESSION_COOKIE, SESSION_TTL_SECS},
};
use db::UserStore;

use super::identity::IdentityProvider;

/// Verifies the identity token, mints a session for it and syncs the
/// user's email into the store.
pub async fn sign_in(
    identity: &dyn IdentityProvider,
    store: &dyn UserStore,
    id_token: &str,
) -> Res<(IdentityClaims, String)> {
    let claims = identity.verify_id_token(id_token).await?;
    let session = identity
        .create_session_cookie(id_token, SESSION_TTL_SECS)
        .await?;
    store
        .upsert_email(claims.user_id(), claims.email.as_deref())
        .await?;
    log::info!("Session created for {}", claims.user_id());
    Ok((claims, session))
}

pub fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, value)
        .max_age(Duration::seconds(SESSION_TTL_SECS))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .finish()
}

/// Cookie that makes the browser drop the session.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_locked_down() {
        let cookie = session_cookie("value".to_string());
        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(432_000)));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.path(), Some("/"));
    }
}
