use std::{env, sync::Arc};

use thiserror::Error;

/// Reasons the server refuses to start with the given environment.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server: database connection,
/// bind address, CORS and logging preferences, identity provider
/// service-account credentials and payments provider keys.
pub struct Config {
    // development or production
    pub environment: String,
    /// The URL of the database to connect to.
    pub database_url: String,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Public URL of the web application, used to build checkout return URLs.
    pub web_app_url: String,
    /// Where unauthenticated page requests are redirected.
    pub sign_in_path: String,
    /// Whether session cookies are checked against the revocation state of the account.
    pub session_check_revoked: bool,
    /// Service-account credentials for the identity provider.
    pub firebase: FirebaseConfig,
    /// Payments provider keys and plan catalogue.
    pub stripe: StripeConfig,
}

#[derive(Clone, Debug)]
/// Service-account credentials used to verify identity tokens and mint session cookies.
pub struct FirebaseConfig {
    pub project_id: String,
    pub client_email: String,
    /// PEM encoded RSA private key of the service account.
    pub private_key: String,
}

#[derive(Clone, Debug)]
pub struct StripeConfig {
    /// Stripe secret key
    pub secret_key: String,
    /// Stripe publishable key, handed to the browser SDK
    pub publishable_key: String,
    /// Stripe webhook secret
    pub webhook_secret: String,
    /// Price identifiers users are allowed to subscribe to
    pub plan_price_ids: Vec<String>,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `DATABASE_URL`: Connection string for the database
    /// - `FIREBASE_PROJECT_ID`, `FIREBASE_CLIENT_EMAIL`, `FIREBASE_PRIVATE_KEY`
    /// - `STRIPE_SECRET_KEY`, `STRIPE_PUBLISHABLE_KEY`, `STRIPE_WEBHOOK_SECRET`
    /// - `STRIPE_PLAN_PRICE_IDS`: comma separated list of recurring price ids
    ///
    /// Optional (with defaults):
    /// - `ENVIRONMENT`: "development" or "production" (default: "development")
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `WEB_APP_URL`: Public web application URL (default: "http://localhost:3000")
    /// - `SIGN_IN_PATH`: Sign-in page for unauthenticated visitors (default: "/auth")
    /// - `SESSION_CHECK_REVOKED`: Check session revocation on each request (default: true)
    pub fn from_env() -> Result<Arc<Self>, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok()).map(Arc::new)
    }

    /// Builds and validates the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let environment = vars.or("ENVIRONMENT", "development");
        if environment != "development" && environment != "production" {
            return Err(ConfigError::Invalid {
                name: "ENVIRONMENT",
                reason: format!("expected development or production, got {}", environment),
            });
        }

        let plan_price_ids: Vec<String> = vars
            .required("STRIPE_PLAN_PRICE_IDS")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if plan_price_ids.is_empty() {
            return Err(ConfigError::Invalid {
                name: "STRIPE_PLAN_PRICE_IDS",
                reason: "at least one price id is required".to_string(),
            });
        }
        if let Some(bad) = plan_price_ids.iter().find(|id| !id.starts_with("price_")) {
            return Err(ConfigError::Invalid {
                name: "STRIPE_PLAN_PRICE_IDS",
                reason: format!("{} is not a price id", bad),
            });
        }

        let sign_in_path = vars.or("SIGN_IN_PATH", "/auth");
        if !sign_in_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                name: "SIGN_IN_PATH",
                reason: "must be an absolute path".to_string(),
            });
        }

        Ok(Config {
            environment,
            database_url: vars.required("DATABASE_URL")?,
            server_host: vars.or("IP", "127.0.0.1"),
            server_port: vars.parsed("PORT", 8080)?,
            num_workers: vars.parsed("WORKERS", 4)?,
            cors_allowed_origin: vars.or("CORS_ALLOWED_ORIGIN", "http://localhost:3000"),
            console_logging_enabled: vars.flag("ENABLE_CONSOLE_LOGGING", true)?,
            web_app_url: vars
                .or("WEB_APP_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            sign_in_path,
            session_check_revoked: vars.flag("SESSION_CHECK_REVOKED", true)?,
            firebase: FirebaseConfig {
                project_id: vars.required("FIREBASE_PROJECT_ID")?,
                client_email: vars.required("FIREBASE_CLIENT_EMAIL")?,
                private_key: parse_private_key(&vars.required("FIREBASE_PRIVATE_KEY")?)?,
            },
            stripe: StripeConfig {
                secret_key: vars.prefixed("STRIPE_SECRET_KEY", "sk_")?,
                publishable_key: vars.prefixed("STRIPE_PUBLISHABLE_KEY", "pk_")?,
                webhook_secret: vars.prefixed("STRIPE_WEBHOOK_SECRET", "whsec_")?,
                plan_price_ids,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name,
                reason: format!("{} is not a valid number", raw),
            }),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(name).map(|v| v.to_lowercase()) {
            Some(v) if v == "true" || v == "1" => Ok(true),
            Some(v) if v == "false" || v == "0" => Ok(false),
            Some(v) => Err(ConfigError::Invalid {
                name,
                reason: format!("{} is not a boolean", v),
            }),
            None => Ok(default),
        }
    }

    fn prefixed(&self, name: &'static str, prefix: &str) -> Result<String, ConfigError> {
        let value = self.required(name)?;
        if value.starts_with(prefix) {
            Ok(value)
        } else {
            Err(ConfigError::Invalid {
                name,
                reason: format!("expected a value starting with {}", prefix),
            })
        }
    }
}

/// Keys pasted into a single-line env var usually carry escaped newlines.
fn parse_private_key(raw: &str) -> Result<String, ConfigError> {
    let key = raw.trim_matches('"').replace("\\n", "\n");
    if key.contains("-----BEGIN") && key.contains("PRIVATE KEY-----") {
        Ok(key)
    } else {
        Err(ConfigError::Invalid {
            name: "FIREBASE_PRIVATE_KEY",
            reason: "expected a PEM encoded private key".to_string(),
        })
    }
}
