use actix_web::{HttpResponse, http::StatusCode};
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === PROVIDER ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Stripe error: {0}")]
    Stripe(#[from] stripe::StripeError),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    // === APPLICATION ERRORS ===
    #[error("Invalid identity token: {0}")]
    InvalidToken(String),

    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Ownership mismatch: {0}")]
    OwnershipMismatch(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_)
            | AppError::Jwt(_)
            | AppError::Reqwest(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Stripe(error) => match stripe_request_status(error) {
                Some(status) if (400..500).contains(&status) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::IdentityProvider(_) => StatusCode::BAD_GATEWAY,

            AppError::InvalidToken(_)
            | AppError::Validation(_)
            | AppError::InvalidSignature(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::OwnershipMismatch(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "error": err_msg })
            } else {
                serde_json::json!({ "error": "Internal server error" })
            }
        };

        let status = self.status_code();
        match self {
            // === PROVIDER ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::build(status).json(to_internal_json(&error.to_string()))
            }
            AppError::Jwt(error) => {
                log::error!("JWT error: {}", error);
                HttpResponse::build(status).json(to_internal_json(&error.to_string()))
            }
            AppError::Reqwest(error) => {
                log::error!("Reqwest error: {}", error);
                HttpResponse::build(status).json(to_internal_json(&error.to_string()))
            }
            AppError::Stripe(error) => {
                log::error!("Stripe error: {}", error);
                // card declines and similar request errors are meant for the user
                match stripe_request_message(error) {
                    Some(message) if status == StatusCode::BAD_REQUEST => {
                        HttpResponse::build(status).json(serde_json::json!({ "error": message }))
                    }
                    _ => HttpResponse::build(status).json(to_internal_json(&error.to_string())),
                }
            }
            AppError::IdentityProvider(error) => {
                log::error!("Identity provider error: {}", error);
                HttpResponse::build(status).json(to_internal_json(error))
            }
            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::build(status).json(to_internal_json(error))
            }

            // === APPLICATION ERRORS ===
            _ => HttpResponse::build(status).json(serde_json::json!({ "error": self.to_string() })),
        }
    }
}

fn stripe_request_status(error: &stripe::StripeError) -> Option<u16> {
    match error {
        stripe::StripeError::Stripe(request_error) => Some(request_error.http_status),
        _ => None,
    }
}

fn stripe_request_message(error: &stripe::StripeError) -> Option<String> {
    match error {
        stripe::StripeError::Stripe(request_error) => request_error.message.clone(),
        _ => None,
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}
