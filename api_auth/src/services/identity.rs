use std::{
    sync::{Arc, OnceLock},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use common::{
    env_config::FirebaseConfig,
    error::{AppError, Res},
    session::IdentityClaims,
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
    jwk::JwkSet,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

const ID_TOKEN_KEYS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const SESSION_COOKIE_KEYS_URL: &str =
    "https://www.googleapis.com/identitytoolkit/v1/sessionCookiePublicKeys";
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const OAUTH_SCOPES: &str =
    "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/identitytoolkit";

const KEYS_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
// an unknown key id refetches the set at most once per interval
const KEYS_MIN_REFETCH: Duration = Duration::from_secs(60);
// refresh the access token a minute before Google expires it
const ACCESS_TOKEN_LEEWAY: Duration = Duration::from_secs(60);

/// Verifies identity credentials and mints server sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies a client-obtained identity token. Fails with `InvalidToken`.
    async fn verify_id_token(&self, id_token: &str) -> Res<IdentityClaims>;

    /// Exchanges a verified identity token for a signed session cookie value.
    async fn create_session_cookie(&self, id_token: &str, valid_for_secs: i64) -> Res<String>;

    /// Verifies a session cookie value. Fails with `Unauthorized`.
    async fn verify_session_cookie(&self, cookie: &str, check_revoked: bool)
    -> Res<IdentityClaims>;
}

/// Firebase Authentication over its public REST endpoints.
pub struct FirebaseIdentity {
    project_id: String,
    client_email: String,
    signing_key: EncodingKey,
    http: reqwest::Client,
    id_token_keys: KeyCache,
    session_cookie_keys: KeyCache,
    access_token: RwLock<Option<AccessToken>>,
}

static SHARED: OnceLock<Arc<FirebaseIdentity>> = OnceLock::new();

struct KeyCache {
    url: &'static str,
    keys: RwLock<Option<CachedKeys>>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Serialize)]
struct ServiceAccountAssertion<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCookieResponse {
    session_cookie: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    #[serde(default)]
    disabled: bool,
    // seconds since epoch, encoded as a string
    valid_since: Option<String>,
}

impl KeyCache {
    fn new(url: &'static str) -> Self {
        KeyCache {
            url,
            keys: RwLock::new(None),
        }
    }
}

impl FirebaseIdentity {
    pub fn new(config: &FirebaseConfig) -> Res<Self> {
        let signing_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(FirebaseIdentity {
            project_id: config.project_id.clone(),
            client_email: config.client_email.clone(),
            signing_key,
            http,
            id_token_keys: KeyCache::new(ID_TOKEN_KEYS_URL),
            session_cookie_keys: KeyCache::new(SESSION_COOKIE_KEYS_URL),
            access_token: RwLock::new(None),
        })
    }

    /// Returns the process-wide instance, creating it on first use.
    pub fn shared(config: &FirebaseConfig) -> Res<Arc<Self>> {
        if let Some(identity) = SHARED.get() {
            return Ok(identity.clone());
        }
        let identity = Arc::new(Self::new(config)?);
        Ok(SHARED.get_or_init(|| identity).clone())
    }

    async fn fetch_keys(&self, cache: &KeyCache) -> Res<JwkSet> {
        log::debug!("Fetching signing keys from {}", cache.url);
        let response = self.http.get(cache.url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::IdentityProvider(format!(
                "{} returned {}",
                cache.url,
                response.status()
            )));
        }
        let keys: JwkSet = response.json().await?;
        *cache.keys.write().await = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        Ok(keys)
    }

    /// Looks up the key for `kid`. The set is refetched when the cache is
    /// stale, or when it does not know the key and is older than
    /// `KEYS_MIN_REFETCH`.
    async fn decoding_key(&self, cache: &KeyCache, kid: &str) -> Res<Option<DecodingKey>> {
        {
            let cached = cache.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < KEYS_CACHE_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return Ok(Some(DecodingKey::from_jwk(jwk)?));
                    }
                    if age < KEYS_MIN_REFETCH {
                        log::debug!("Key id {} unknown to a set fetched {:?} ago", kid, age);
                        return Ok(None);
                    }
                }
            }
        }

        let keys = self.fetch_keys(cache).await?;
        match keys.find(kid) {
            Some(jwk) => Ok(Some(DecodingKey::from_jwk(jwk)?)),
            None => Ok(None),
        }
    }

    async fn verify_jwt(
        &self,
        token: &str,
        cache: &KeyCache,
        issuer: &str,
        reject: fn(String) -> AppError,
    ) -> Res<IdentityClaims> {
        let header = decode_header(token).map_err(|e| reject(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(reject(format!("unexpected algorithm {:?}", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| reject("missing key id".to_string()))?;
        let key = self
            .decoding_key(cache, &kid)
            .await?
            .ok_or_else(|| reject(format!("unknown key id {}", kid)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[&self.project_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let claims = decode::<IdentityClaims>(token, &key, &validation)
            .map_err(|e| reject(e.to_string()))?
            .claims;

        if claims.sub.is_empty() {
            return Err(reject("empty subject".to_string()));
        }
        if claims.auth_time > unix_now() as i64 {
            return Err(reject("authentication time lies in the future".to_string()));
        }
        Ok(claims)
    }

    /// OAuth2 access token of the service account, cached until shortly
    /// before it expires.
    async fn access_token(&self) -> Res<String> {
        {
            let cached = self.access_token.read().await;
            if let Some(token) = cached.as_ref() {
                if Instant::now() < token.expires_at {
                    return Ok(token.value.clone());
                }
            }
        }

        let iat = unix_now();
        let assertion = encode(
            &Header::new(Algorithm::RS256),
            &ServiceAccountAssertion {
                iss: &self.client_email,
                scope: OAUTH_SCOPES,
                aud: OAUTH_TOKEN_URL,
                iat,
                exp: iat + 3600,
            },
            &self.signing_key,
        )?;

        let response = self
            .http
            .post(OAUTH_TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "Service account token request failed ({}): {}",
                status, body
            )));
        }
        let token: TokenResponse = response.json().await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(ACCESS_TOKEN_LEEWAY);
        *self.access_token.write().await = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn ensure_not_revoked(&self, claims: &IdentityClaims) -> Res<()> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!(
                "{}/projects/{}/accounts:lookup",
                IDENTITY_TOOLKIT_URL, self.project_id
            ))
            .bearer_auth(token)
            .json(&json!({ "localId": [claims.sub] }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::IdentityProvider(format!(
                "Account lookup failed with {}",
                response.status()
            )));
        }

        let lookup: LookupResponse = response.json().await?;
        check_account(lookup.users.into_iter().next(), claims.auth_time)
    }
}

/// Rejects sessions of missing or disabled accounts, and sessions whose
/// sign-in predates the account's last token revocation.
fn check_account(account: Option<AccountInfo>, auth_time: i64) -> Res<()> {
    let account =
        account.ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;
    if account.disabled {
        return Err(AppError::Unauthorized("Account is disabled".to_string()));
    }
    let valid_since = account
        .valid_since
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0);
    if auth_time < valid_since {
        return Err(AppError::Unauthorized("Session has been revoked".to_string()));
    }
    Ok(())
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify_id_token(&self, id_token: &str) -> Res<IdentityClaims> {
        let issuer = format!("https://securetoken.google.com/{}", self.project_id);
        self.verify_jwt(id_token, &self.id_token_keys, &issuer, AppError::InvalidToken)
            .await
    }

    async fn create_session_cookie(&self, id_token: &str, valid_for_secs: i64) -> Res<String> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!(
                "{}/projects/{}:createSessionCookie",
                IDENTITY_TOOLKIT_URL, self.project_id
            ))
            .bearer_auth(token)
            .json(&json!({ "idToken": id_token, "validDuration": valid_for_secs }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::InvalidToken(format!(
                "Session cookie refused: {}",
                body
            )));
        }
        if !status.is_success() {
            return Err(AppError::IdentityProvider(format!(
                "createSessionCookie returned {}",
                status
            )));
        }

        let created: SessionCookieResponse = response.json().await?;
        Ok(created.session_cookie)
    }

    async fn verify_session_cookie(
        &self,
        cookie: &str,
        check_revoked: bool,
    ) -> Res<IdentityClaims> {
        let issuer = format!("https://session.firebase.google.com/{}", self.project_id);
        let claims = self
            .verify_jwt(cookie, &self.session_cookie_keys, &issuer, AppError::Unauthorized)
            .await?;
        if check_revoked {
            self.ensure_not_revoked(&claims).await?;
        }
        Ok(claims)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
