use actix_web::web::{self};

pub mod routes {
    pub mod pay;
    pub mod sub;
    pub mod webhook;
}

pub mod services {
    pub mod billing;
    pub mod customer;
    pub mod pay;
    pub mod sub;
    pub mod webhook;
}

pub mod dtos {
    pub mod pay;
    pub mod sub;
}

pub use services::billing::{BillingProvider, StripeBilling};

pub fn mount_billing() -> actix_web::Scope {
    web::scope("/billing")
        .service(routes::pay::get_config)
        .service(routes::pay::post_checkout)
        .service(routes::pay::post_payment_intent)
        .service(routes::pay::post_setup_intent)
        .service(routes::pay::get_payment_methods)
        .service(routes::sub::get_subscriptions)
        .service(routes::sub::post_subscription)
        .service(routes::sub::delete_subscription)
}

pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/stripe").service(routes::webhook::post_webhook)
}
