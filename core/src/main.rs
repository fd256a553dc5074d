mod cors;
mod pages;

use std::{io, sync::Arc};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_auth::{FirebaseIdentity, IdentityProvider, SessionGate};
use api_subs::{BillingProvider, StripeBilling};
use common::env_config::Config;
use db::{PgUserStore, UserStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // get env vars
    let config = Config::from_env().map_err(|e| io::Error::other(e.to_string()))?;

    // init logger
    if config.console_logging_enabled {
        logger::setup(config.is_production())
            .map_err(|e| io::Error::other(format!("Failed to set up logger: {}", e)))?;
    }

    // init db connection
    let pool = db::setup(&config.database_url, config.is_production())
        .await
        .map_err(|e| io::Error::other(format!("Failed to set up database: {}", e)))?;

    // external providers
    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool));
    let identity: Arc<dyn IdentityProvider> = FirebaseIdentity::shared(&config.firebase)
        .map_err(|e| io::Error::other(format!("Failed to set up identity provider: {}", e)))?;
    let billing: Arc<dyn BillingProvider> = Arc::new(StripeBilling::new(&config.stripe));

    log::info!(
        "Starting server on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    let config_data = config.clone();
    HttpServer::new(move || {
        let check_revoked = config_data.session_check_revoked;
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::from(store.clone()))
            .app_data(web::Data::from(identity.clone()))
            .app_data(web::Data::from(billing.clone()))
            .app_data(web::JsonConfig::default().error_handler(common::http::json_error_handler))
            .wrap(logger::middleware()) // 2nd
            .wrap(cors::middleware(&config_data.cors_allowed_origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_auth::mount_auth())
                    .service(api_subs::mount_webhook())
                    .service(
                        web::scope("/dashboard")
                            .wrap(SessionGate::deny(identity.clone(), check_revoked))
                            .service(api_auth::mount_user())
                            .service(api_subs::mount_billing()),
                    ),
            )
            .service(
                pages::mount_pages().wrap(SessionGate::redirect(
                    identity.clone(),
                    check_revoked,
                    &config_data.sign_in_path,
                )),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
