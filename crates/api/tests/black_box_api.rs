use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use serde_json::{Value, json};

use giftmarket_api::app::routes;
use giftmarket_api::config::ApiConfig;
use giftmarket_api::middleware::{self, AuthState, SESSION_EXPIRES_IN_HEADER};
use giftmarket_auth::{
    AuthorizationPipeline, InMemoryPrincipalStore, RoleAssignment, RoleTag, RouteDescriptor, RouteTable, Verb,
};
use giftmarket_core::UserId;
use giftmarket_marketplace::RecordingNotifier;

const ADMIN_EMAIL: &str = "ops@giftmarket.test";
const ADMIN_PASSWORD: &str = "correct-horse-battery";
const PASSWORD: &str = "hunter2hunter2";

struct TestServer {
    base_url: String,
    notifier: Arc<RecordingNotifier>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let config = ApiConfig::from_lookup(|name| match name {
            "BIND_ADDR" => Some("127.0.0.1:0".to_string()),
            "BOOTSTRAP_ADMIN_EMAIL" => Some(ADMIN_EMAIL.to_string()),
            "BOOTSTRAP_ADMIN_PASSWORD" => Some(ADMIN_PASSWORD.to_string()),
            _ => None,
        })
        .expect("test config is valid");

        // Same router as prod, with a notifier the test can inspect.
        let notifier = Arc::new(RecordingNotifier::new());
        let app = giftmarket_api::app::build_app_with_notifier(&config, notifier.clone())
            .await
            .expect("app builds");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            notifier,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, email: &str) -> Value {
        let res = self
            .client
            .post(self.url("/users"))
            .json(&json!({ "email": email, "display_name": email, "password": PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/sessions"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn signup(&self, email: &str) -> String {
        self.register(email).await;
        self.login(email, PASSWORD).await
    }

    async fn admin(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    /// Owner signs up, registers a business and a platform admin approves it.
    async fn approved_business(&self, owner_email: &str) -> (String, String) {
        let owner = self.signup(owner_email).await;
        let res = self
            .post(
                &owner,
                "/businesses",
                json!({ "name": format!("{owner_email} shop"), "address": "1 Main St" }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let business: Value = res.json().await.unwrap();
        let business_id = business["id"].as_str().unwrap().to_string();

        let admin = self.admin().await;
        let res = self
            .post(&admin, &format!("/admin/businesses/{business_id}/approve"), json!({}))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        (owner, business_id)
    }

    async fn offer(&self, token: &str, starts_in: ChronoDuration) -> String {
        let now = Utc::now();
        let res = self
            .post(
                token,
                "/offers",
                json!({
                    "title": "Lunch voucher",
                    "price_cents": 4000,
                    "value_cents": 5000,
                    "starts_at": now + starts_in,
                    "ends_at": now + starts_in + ChronoDuration::days(7),
                }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let offer: Value = res.json().await.unwrap();
        offer["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/me")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn unknown_token_fails_authentication_even_on_public_routes() {
    let srv = TestServer::spawn().await;

    let res = srv.get(&"ab".repeat(32), "/offers").await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "authentication_failed");
}

#[tokio::test]
async fn anonymous_public_route_has_no_session_header() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SESSION_EXPIRES_IN_HEADER).is_none());
}

#[tokio::test]
async fn register_login_whoami_reports_session_lifetime() {
    let srv = TestServer::spawn().await;
    let user = srv.register("ana@example.com").await;
    let token = srv.login("ana@example.com", PASSWORD).await;

    let res = srv.get(&token, "/me").await;

    assert_eq!(res.status(), StatusCode::OK);
    let remaining: i64 = res
        .headers()
        .get(SESSION_EXPIRES_IN_HEADER)
        .expect("session header present")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(remaining > 0);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["id"], user["id"]);
    assert_eq!(body["user"]["roles"][0]["role"], "user");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let srv = TestServer::spawn().await;
    srv.register("ana@example.com").await;

    for (email, password) in [("ana@example.com", "not-the-password"), ("nobody@example.com", PASSWORD)] {
        let res = srv
            .client
            .post(srv.url("/sessions"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "invalid_credentials");
    }
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    let srv = TestServer::spawn().await;
    let token = srv.signup("ana@example.com").await;

    let res = srv
        .client
        .delete(srv.url("/sessions"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get(&token, "/me").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "authentication_failed");
}

#[tokio::test]
async fn moderation_routes_reject_plain_users() {
    let srv = TestServer::spawn().await;
    let token = srv.signup("ana@example.com").await;

    let res = srv.get(&token, "/admin/businesses").await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn pending_business_cannot_publish_offers() {
    let srv = TestServer::spawn().await;
    let owner = srv.signup("owner@example.com").await;
    let res = srv
        .post(&owner, "/businesses", json!({ "name": "Bakery", "address": "1 Main St" }))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let now = Utc::now();
    let res = srv
        .post(
            &owner,
            "/offers",
            json!({
                "title": "Bread",
                "price_cents": 800,
                "value_cents": 1000,
                "starts_at": now,
                "ends_at": now + ChronoDuration::days(1),
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn business_creator_scope_drives_offer_ownership() {
    let srv = TestServer::spawn().await;
    let (owner, business_id) = srv.approved_business("owner@example.com").await;

    let res = srv.get(&owner, "/me").await;
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["business_id"], business_id.as_str());

    let offer_id = srv.offer(&owner, ChronoDuration::minutes(-1)).await;

    let res = srv
        .client
        .get(srv.url(&format!("/offers?business_id={business_id}")))
        .send()
        .await
        .unwrap();
    let listed: Value = res.json().await.unwrap();
    assert_eq!(listed["items"][0]["id"], offer_id.as_str());

    // Another business's admin passes the role check but not the ownership check.
    let (rival, _) = srv.approved_business("rival@example.com").await;
    let res = srv
        .client
        .delete(srv.url(&format!("/offers/{offer_id}")))
        .bearer_auth(&rival)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .delete(srv.url(&format!("/offers/{offer_id}")))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn employees_publish_but_cannot_withdraw() {
    let srv = TestServer::spawn().await;
    let (owner, business_id) = srv.approved_business("owner@example.com").await;
    let clerk = srv.signup("clerk@example.com").await;

    let res = srv
        .post(
            &owner,
            &format!("/businesses/{business_id}/employees"),
            json!({ "email": "clerk@example.com" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let offer_id = srv.offer(&clerk, ChronoDuration::minutes(-1)).await;
    let res = srv
        .client
        .delete(srv.url(&format!("/offers/{offer_id}")))
        .bearer_auth(&clerk)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn purchase_before_the_offer_starts_is_rejected() {
    let srv = TestServer::spawn().await;
    let (owner, _) = srv.approved_business("owner@example.com").await;
    let offer_id = srv.offer(&owner, ChronoDuration::days(1)).await;
    let buyer = srv.signup("buyer@example.com").await;

    let res = srv.post(&buyer, &format!("/offers/{offer_id}/purchase"), json!({})).await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn gift_claim_and_redeem_flow() {
    let srv = TestServer::spawn().await;
    let (owner, _) = srv.approved_business("owner@example.com").await;
    let offer_id = srv.offer(&owner, ChronoDuration::minutes(-1)).await;
    let buyer = srv.signup("buyer@example.com").await;
    let friend = srv.signup("friend@example.com").await;

    let res = srv.post(&buyer, &format!("/offers/{offer_id}/purchase"), json!({})).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let card: Value = res.json().await.unwrap();
    let card_id = card["id"].as_str().unwrap().to_string();
    assert_eq!(card["balance_cents"], 5000);

    let res = srv
        .post(
            &buyer,
            &format!("/gift-cards/{card_id}/gift"),
            json!({
                "recipient": { "channel": "email", "address": "friend@example.com" },
                "message": "happy birthday",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let gifted: Value = res.json().await.unwrap();
    assert_eq!(gifted["status"], "pending");
    assert!(gifted["pending_gift"].get("claim_code").is_none());

    let sent = srv.notifier.last().expect("recipient was notified");
    let res = srv
        .post(&friend, "/gift-cards/claim", json!({ "code": sent.claim_code.as_str() }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    // Ownership moved: the buyer can no longer see the card.
    let res = srv.get(&buyer, &format!("/gift-cards/{card_id}")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = srv.get(&friend, "/gift-cards").await;
    let mine: Value = res.json().await.unwrap();
    assert_eq!(mine["items"][0]["id"], card_id.as_str());

    let redeem = format!("/gift-cards/{card_id}/redeem");
    let res = srv.post(&owner, &redeem, json!({ "amount_cents": 6000 })).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = srv.post(&owner, &redeem, json!({ "amount_cents": 5000 })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let spent: Value = res.json().await.unwrap();
    assert_eq!(spent["status"], "redeemed");
    assert_eq!(spent["balance_cents"], 0);
}

#[tokio::test]
async fn suspended_user_session_stops_working() {
    let srv = TestServer::spawn().await;
    let user = srv.register("ana@example.com").await;
    let token = srv.login("ana@example.com", PASSWORD).await;
    let admin = srv.admin().await;

    let user_id = user["id"].as_str().unwrap();
    let res = srv.post(&admin, &format!("/admin/users/{user_id}/suspend"), json!({})).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get(&token, "/me").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "authentication_failed");
}

#[tokio::test]
async fn every_protected_route_rejects_anonymous_callers() {
    let srv = TestServer::spawn().await;
    let table = routes::route_table().unwrap();
    let some_id = UserId::new().to_string();

    let mut checked = 0;
    for (verb, path, descriptor) in table.entries() {
        if descriptor.is_public() {
            continue;
        }
        let method = reqwest::Method::from_bytes(verb.as_str().as_bytes()).unwrap();
        let url = srv.url(&path.replace(":id", &some_id));
        let res = srv.client.request(method, url).send().await.unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{verb} {path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthorized", "{verb} {path}");
        checked += 1;
    }
    assert_eq!(checked, 17);

    // Nothing reached a handler: no business was created, no gift was sent.
    let admin = srv.admin().await;
    let res = srv.get(&admin, "/admin/businesses").await;
    let all: Value = res.json().await.unwrap();
    assert_eq!(all["items"].as_array().unwrap().len(), 0);
    assert!(srv.notifier.sent().is_empty());
}

#[tokio::test]
async fn head_follows_the_get_rules() {
    let srv = TestServer::spawn().await;

    let res = srv.client.head(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.head(srv.url("/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = srv.signup("ana@example.com").await;
    let res = srv.client.head(srv.url("/me")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SESSION_EXPIRES_IN_HEADER).is_some());
}

#[tokio::test]
async fn auth_scheme_is_case_insensitive() {
    let srv = TestServer::spawn().await;
    let token = srv.signup("ana@example.com").await;

    let res = srv
        .client
        .get(srv.url("/me"))
        .header(reqwest::header::AUTHORIZATION, format!("bearer {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // A presented but unknown token is an authentication failure, whatever the casing.
    let res = srv
        .client
        .get(srv.url("/me"))
        .header(reqwest::header::AUTHORIZATION, format!("BEARER {}", "cd".repeat(32)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "authentication_failed");
}

#[tokio::test]
async fn rejected_requests_never_reach_the_handler() {
    let store = Arc::new(InMemoryPrincipalStore::new(ChronoDuration::hours(1)));
    store.register("user@example.com", "User", PASSWORD).unwrap();
    store
        .register_with_roles(
            "ops@example.com",
            "Ops",
            PASSWORD,
            vec![RoleAssignment::global(RoleTag::PlatformEmployee)],
        )
        .unwrap();
    let user = store.login("user@example.com", PASSWORD).unwrap();
    let ops = store.login("ops@example.com", PASSWORD).unwrap();

    let table = RouteTable::from_entries([(
        Verb::Get,
        "/reports",
        RouteDescriptor::new("reports.get").roles([RoleTag::PlatformEmployee]),
    )])
    .unwrap();
    let state = AuthState {
        pipeline: AuthorizationPipeline::new(store.clone(), Arc::new(table)),
    };

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = axum::Router::new()
        .route(
            "/reports",
            axum::routing::get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "report"
                }
            }),
        )
        .route_layer(axum::middleware::from_fn_with_state(state, middleware::auth_middleware));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/reports", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let client = reqwest::Client::new();

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(&url).bearer_auth("ef".repeat(32)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(&url).bearer_auth(user.token.as_str()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let res = client.get(&url).bearer_auth(ops.token.as_str()).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    handle.abort();
}
