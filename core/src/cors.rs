use actix_cors::Cors;
use actix_web::http::{Method, header};

/// CORS policy for the web app. `CORS_ALLOWED_ORIGIN` may list several
/// origins separated by commas.
pub fn middleware(allowed_origins: &str) -> Cors {
    allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        // session cookies travel with credentialed requests only
        .supports_credentials()
        .max_age(3600)
}
