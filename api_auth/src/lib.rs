use actix_web::web;

pub mod middleware {
    pub mod session;
}

pub mod routes {
    pub mod auth;
    pub mod user;
}

pub mod services {
    pub mod identity;
    pub mod session;
}

mod dtos {
    pub(crate) mod auth;
}

pub use middleware::session::{Rejection, SessionGate};
pub use services::identity::{FirebaseIdentity, IdentityProvider};

pub fn mount_auth() -> actix_web::Scope {
    web::scope("/auth")
        .service(routes::auth::post_session)
        .service(routes::auth::get_session)
        .service(routes::auth::post_logout)
}

pub fn mount_user() -> actix_web::Scope {
    web::scope("/user").service(routes::user::get_user)
}
