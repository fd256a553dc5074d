mod support;

use std::sync::Arc;

use actix_web::{
    App, HttpMessage,
    dev::Service,
    http::StatusCode,
    test::{self, TestRequest},
    web,
};
use api_subs::{BillingProvider, services::customer::ensure_customer};
use db::{InMemoryUserStore, UserStore};
use serde_json::{Value, json};
use support::{FakeBilling, claims, config, user};

macro_rules! app {
    ($billing:expr, $store:expr, $user_id:expr) => {{
        let billing: Arc<dyn BillingProvider> = $billing;
        let store: Arc<dyn UserStore> = $store;
        let signed_in = claims($user_id);
        test::init_service(
            App::new()
                .app_data(web::Data::new(config()))
                .app_data(web::Data::from(billing))
                .app_data(web::Data::from(store))
                .app_data(
                    web::JsonConfig::default().error_handler(common::http::json_error_handler),
                )
                .service(
                    web::scope("/api/dashboard")
                        .wrap_fn(move |req, srv| {
                            req.extensions_mut().insert(signed_in.clone());
                            srv.call(req)
                        })
                        .service(api_subs::mount_billing()),
                ),
        )
        .await
    }};
}

#[tokio::test]
async fn ensure_customer_creates_once_and_then_reuses() {
    let billing = FakeBilling::new();
    let store = InMemoryUserStore::with_users(vec![user("uid-1", None)]);

    let first = ensure_customer(&billing, &store, "uid-1").await.unwrap();
    let second = ensure_customer(&billing, &store, "uid-1").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.owner_user_id.as_deref(), Some("uid-1"));
    assert_eq!(
        billing.calls(),
        vec![
            "create_customer:uid-1".to_string(),
            format!("retrieve_customer:{}", first.id),
        ]
    );
    let stored = store.get_user("uid-1").await.unwrap().unwrap();
    assert_eq!(stored.stripe_customer_id, Some(first.id));
}

#[tokio::test]
async fn ensure_customer_keeps_the_customer_stored_first() {
    let billing = FakeBilling::new().with_customer("cus_existing", Some("uid-1"));
    let store = InMemoryUserStore::with_users(vec![user("uid-1", None)]);
    // another request stores its customer between our read and our claim
    store.claim_customer_id("uid-1", "cus_existing").await.unwrap();

    let customer = ensure_customer(&billing, &store, "uid-1").await.unwrap();
    assert_eq!(customer.id, "cus_existing");
    assert!(!billing.called("create_customer"));
}

#[tokio::test]
async fn ensure_customer_replaces_a_deleted_customer() {
    let billing = FakeBilling::new().with_deleted_customer("cus_gone", Some("uid-1"));
    let store = InMemoryUserStore::with_users(vec![user("uid-1", Some("cus_gone"))]);

    let customer = ensure_customer(&billing, &store, "uid-1").await.unwrap();
    assert_ne!(customer.id, "cus_gone");
    assert!(!customer.deleted);
    assert_eq!(
        billing.calls(),
        vec![
            "retrieve_customer:cus_gone".to_string(),
            "create_customer:uid-1".to_string(),
        ]
    );
    let stored = store.get_user("uid-1").await.unwrap().unwrap();
    assert_eq!(stored.stripe_customer_id, Some(customer.id));
}

#[actix_web::test]
async fn payment_intent_amount_bounds() {
    let billing = Arc::new(FakeBilling::new());
    let app = app!(billing.clone(), Arc::new(InMemoryUserStore::new()), "uid-1");

    let cases = [
        (json!({ "amount": 49 }), StatusCode::BAD_REQUEST),
        (json!({ "amount": 50 }), StatusCode::CREATED),
        (json!({ "amount": 9_999_999 }), StatusCode::CREATED),
        (json!({ "amount": 10_000_000 }), StatusCode::BAD_REQUEST),
        (json!({ "amount": "2500" }), StatusCode::CREATED),
        (json!({ "amount": "lots" }), StatusCode::BAD_REQUEST),
    ];
    for (body, expected) in cases {
        let req = TestRequest::post()
            .uri("/api/dashboard/billing/payment-intents")
            .set_json(&body)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), expected, "{}", body);
    }

    assert_eq!(
        billing.calls(),
        vec![
            "create_payment_intent:50".to_string(),
            "create_payment_intent:9999999".to_string(),
            "create_payment_intent:2500".to_string(),
        ]
    );
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let app = app!(
        Arc::new(FakeBilling::new()),
        Arc::new(InMemoryUserStore::new()),
        "uid-1"
    );

    let req = TestRequest::post()
        .uri("/api/dashboard/billing/payment-intents")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"amount\": ")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert!(body["error"].as_str().unwrap().starts_with("Bad request"));
}

#[actix_web::test]
async fn checkout_defaults_return_urls_to_the_web_app() {
    let billing = Arc::new(FakeBilling::new());
    let app = app!(billing.clone(), Arc::new(InMemoryUserStore::new()), "uid-1");

    let req = TestRequest::post()
        .uri("/api/dashboard/billing/checkout")
        .set_json(json!({
            "line_items": [{
                "price_data": {
                    "currency": "usd",
                    "unit_amount": 2000,
                    "product_data": { "name": "T-shirt" }
                },
                "quantity": 1
            }]
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["id"], "cs_test_1");

    assert_eq!(
        billing.calls(),
        vec![
            "create_checkout_session:1:\
             http://localhost:3000/app/checkout?session_id={CHECKOUT_SESSION_ID}&success=true:\
             http://localhost:3000/app/checkout?session_id={CHECKOUT_SESSION_ID}&success=false"
                .to_string()
        ]
    );

    let req = TestRequest::post()
        .uri("/api/dashboard/billing/checkout")
        .set_json(json!({ "line_items": [] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn subscribing_records_the_plan_once_paid() {
    let billing = Arc::new(FakeBilling::new().with_customer("cus_1", Some("uid-1")));
    let store = Arc::new(InMemoryUserStore::with_users(vec![user("uid-1", Some("cus_1"))]));
    let app = app!(billing.clone(), store.clone(), "uid-1");

    let req = TestRequest::post()
        .uri("/api/dashboard/billing/subscriptions")
        .set_json(json!({ "plan": "price_gold", "payment_method": "pm_card_visa" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    assert!(billing.calls().is_empty());

    let req = TestRequest::post()
        .uri("/api/dashboard/billing/subscriptions")
        .set_json(json!({ "plan": "price_monthly", "payment_method": "pm_card_visa" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    let subscription_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["payment_intent_status"], "succeeded");

    assert_eq!(
        billing.calls(),
        vec![
            "retrieve_customer:cus_1".to_string(),
            "attach_default_payment_method:cus_1:pm_card_visa".to_string(),
            "create_subscription:cus_1:price_monthly".to_string(),
        ]
    );
    let stored = store.get_user("uid-1").await.unwrap().unwrap();
    assert_eq!(stored.active_plans, vec![subscription_id.clone()]);

    let req = TestRequest::get()
        .uri("/api/dashboard/billing/subscriptions")
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed[0]["id"], subscription_id.as_str());
}

#[actix_web::test]
async fn cancel_by_a_user_who_does_not_own_the_customer_is_refused() {
    let billing = Arc::new(
        FakeBilling::new()
            .with_customer("cus_shared", Some("uid-other"))
            .with_subscription("sub_1", "cus_shared"),
    );
    let store = Arc::new(InMemoryUserStore::with_users(vec![user(
        "uid-1",
        Some("cus_shared"),
    )]));
    let app = app!(billing.clone(), store, "uid-1");

    let req = TestRequest::delete()
        .uri("/api/dashboard/billing/subscriptions/sub_1")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(!billing.called("cancel_subscription"));
    assert!(!billing.called("retrieve_subscription"));
}

#[actix_web::test]
async fn cancel_of_another_customers_subscription_is_refused() {
    let billing = Arc::new(
        FakeBilling::new()
            .with_customer("cus_1", Some("uid-1"))
            .with_customer("cus_2", Some("uid-2"))
            .with_subscription("sub_2", "cus_2"),
    );
    let store = Arc::new(InMemoryUserStore::with_users(vec![user("uid-1", Some("cus_1"))]));
    let app = app!(billing.clone(), store, "uid-1");

    let req = TestRequest::delete()
        .uri("/api/dashboard/billing/subscriptions/sub_2")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(!billing.called("cancel_subscription"));
}

#[actix_web::test]
async fn cancel_of_own_subscription_clears_the_plan() {
    let billing = Arc::new(
        FakeBilling::new()
            .with_customer("cus_1", Some("uid-1"))
            .with_subscription("sub_1", "cus_1"),
    );
    let store = Arc::new(InMemoryUserStore::with_users(vec![user("uid-1", Some("cus_1"))]));
    store.add_active_plan("uid-1", "sub_1").await.unwrap();
    let app = app!(billing.clone(), store.clone(), "uid-1");

    let req = TestRequest::delete()
        .uri("/api/dashboard/billing/subscriptions/sub_1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "canceled");
    assert!(billing.called("cancel_subscription"));

    let stored = store.get_user("uid-1").await.unwrap().unwrap();
    assert!(stored.active_plans.is_empty());
}

#[actix_web::test]
async fn setup_intents_and_cards_use_the_mapped_customer() {
    let billing = Arc::new(FakeBilling::new());
    let store = Arc::new(InMemoryUserStore::with_users(vec![user("uid-1", None)]));
    let app = app!(billing.clone(), store.clone(), "uid-1");

    let req = TestRequest::post()
        .uri("/api/dashboard/billing/setup-intents")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let req = TestRequest::get()
        .uri("/api/dashboard/billing/payment-methods")
        .to_request();
    let cards: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cards[0]["last4"], "4242");

    let customer_id = store
        .get_user("uid-1")
        .await
        .unwrap()
        .unwrap()
        .stripe_customer_id
        .unwrap();
    assert!(billing.calls().contains(&format!("create_setup_intent:{}", customer_id)));
    assert!(billing.calls().contains(&format!("list_card_payment_methods:{}", customer_id)));
    assert_eq!(
        billing
            .calls()
            .iter()
            .filter(|call| call.starts_with("create_customer"))
            .count(),
        1
    );
}

#[actix_web::test]
async fn config_exposes_publishable_key_and_plans() {
    let app = app!(
        Arc::new(FakeBilling::new()),
        Arc::new(InMemoryUserStore::new()),
        "uid-1"
    );

    let req = TestRequest::get().uri("/api/dashboard/billing/config").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["publishable_key"], "pk_test_123");
    assert_eq!(body["plans"], json!(["price_monthly", "price_yearly"]));
}
