use actix_web::{HttpResponse, Responder, get, web};
use common::session::IdentityClaims;
use serde::Deserialize;

pub fn mount_pages() -> actix_web::Scope {
    web::scope("/app").service(home).service(checkout_result)
}

/// Landing page of the signed-in area.
#[get("")]
async fn home(claims: web::ReqData<IdentityClaims>) -> impl Responder {
    let account = account_label(&claims);
    page(
        "Account",
        &format!(
            "<h1>Signed in</h1><p>You are signed in as <strong>{}</strong>.</p>\
             <form method=\"post\" action=\"/api/auth/logout\"><button>Sign out</button></form>",
            escape(&account)
        ),
    )
}

#[derive(Debug, Deserialize)]
struct CheckoutQuery {
    session_id: Option<String>,
    success: Option<bool>,
}

/// Return page for hosted checkout.
#[get("/checkout")]
async fn checkout_result(
    claims: web::ReqData<IdentityClaims>,
    query: web::Query<CheckoutQuery>,
) -> impl Responder {
    let outcome = if query.success.unwrap_or(false) {
        "Payment received, thank you."
    } else {
        "Checkout was cancelled."
    };
    let reference = query
        .session_id
        .as_deref()
        .map(|id| format!("<p>Reference: <code>{}</code></p>", escape(id)))
        .unwrap_or_default();
    page(
        "Checkout",
        &format!(
            "<h1>{}</h1>{}<p>Account: {}</p>",
            outcome,
            reference,
            escape(&account_label(&claims))
        ),
    )
}

fn account_label(claims: &IdentityClaims) -> String {
    claims
        .email
        .clone()
        .unwrap_or_else(|| claims.user_id().to_string())
}

fn page(title: &str, body: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(format!(
            "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head>\
             <body>{}</body></html>",
            title, body
        ))
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
