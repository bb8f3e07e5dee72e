use actix_web::{http::StatusCode, test, web, App};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tvm_auth::{
    http, packaging::unpackage, signature::sign_timestamp, HttpCredentialAuthority, SignedPayload,
};
use tvm_tests::{fixed_service, local_service, query_encode, setup_test_logging};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UID: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2";
const KEY: &str = "k9J2mQ7xW4pL8vR3tY6nB1cZ5s";
const TIMESTAMP: &str = "2024-01-01T00:00:00Z";

fn token_uri(uid: &str, timestamp: &str, signature: &str) -> String {
    format!(
        "/gettoken?uid={}&timestamp={}&signature={}",
        uid,
        query_encode(timestamp),
        query_encode(signature)
    )
}

fn register_uri(uid: &str, key: &str) -> String {
    format!("/registerdevice?uid={}&key={}", uid, key)
}

#[actix_web::test]
async fn gateway_issues_tokens_from_federation_endpoint() {
    setup_test_logging();

    let federation = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/federation"))
        .and(body_json(json!({
            "name": "a1b2c3d4e5f6a1b2c3d4e5f6a1b2",
            "durationSeconds": 3600
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessKeyId": "ASIAFEDERATED0000001",
            "secretAccessKey": "federated-secret-access-key",
            "sessionToken": "federated-session-token",
            "expiration": "2024-01-01T01:00:00Z"
        })))
        .expect(1)
        .mount(&federation)
        .await;

    let authority = HttpCredentialAuthority::new(
        format!("{}/federation", federation.uri()),
        Duration::from_secs(3600),
        Duration::from_secs(5),
    )
    .unwrap();
    let (_registry, service) = fixed_service(Arc::new(authority));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(service))
            .configure(http::configure),
    )
    .await;

    let req = test::TestRequest::get().uri(&register_uri(UID, KEY)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&token_uri(UID, TIMESTAMP, &sign_timestamp(KEY, TIMESTAMP)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let payload: SignedPayload = test::read_body_json(resp).await;
    assert_eq!(payload.access_key_id, "ASIAFEDERATED0000001");

    let credentials = unpackage(&payload, KEY).unwrap();
    assert_eq!(credentials.secret_access_key, "federated-secret-access-key");
    assert_eq!(credentials.session_token, "federated-session-token");
}

#[actix_web::test]
async fn federation_outage_is_internal_error() {
    let federation = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/federation"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&federation)
        .await;

    let authority = HttpCredentialAuthority::new(
        format!("{}/federation", federation.uri()),
        Duration::from_secs(3600),
        Duration::from_secs(5),
    )
    .unwrap();
    let (_registry, service) = fixed_service(Arc::new(authority));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(service))
            .configure(http::configure),
    )
    .await;

    let req = test::TestRequest::get().uri(&register_uri(UID, KEY)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&token_uri(UID, TIMESTAMP, &sign_timestamp(KEY, TIMESTAMP)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "credential_unavailable");
    assert_eq!(body["message"], "Internal server error");
}

#[actix_web::test]
async fn unknown_device_and_bad_signature_are_indistinguishable() {
    let (_registry, service) = local_service();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(service))
            .configure(http::configure),
    )
    .await;

    let req = test::TestRequest::get().uri(&register_uri(UID, KEY)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let wrong_signature = sign_timestamp("not-the-device-key-at-all", TIMESTAMP);
    let req = test::TestRequest::get()
        .uri(&token_uri(UID, TIMESTAMP, &wrong_signature))
        .to_request();
    let mismatch = test::call_service(&app, req).await;
    assert_eq!(mismatch.status(), StatusCode::UNAUTHORIZED);
    let mismatch: serde_json::Value = test::read_body_json(mismatch).await;

    let req = test::TestRequest::get()
        .uri(&token_uri(
            "ffffffffffffffffffffffffffff",
            TIMESTAMP,
            &sign_timestamp(KEY, TIMESTAMP),
        ))
        .to_request();
    let unknown = test::call_service(&app, req).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown: serde_json::Value = test::read_body_json(unknown).await;

    assert_eq!(mismatch, unknown);
}

#[actix_web::test]
async fn conflict_and_stale_statuses() {
    let (_registry, service) = local_service();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(service))
            .configure(http::configure),
    )
    .await;

    let req = test::TestRequest::get().uri(&register_uri(UID, KEY)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&register_uri(UID, "another-key-that-is-long-enough"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );

    let stale = "2023-12-31T23:44:59Z";
    let req = test::TestRequest::get()
        .uri(&token_uri(UID, stale, &sign_timestamp(KEY, stale)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::REQUEST_TIMEOUT
    );

    let req = test::TestRequest::get()
        .uri(&token_uri(UID, "garbage", "AAAA"))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::REQUEST_TIMEOUT
    );
}
