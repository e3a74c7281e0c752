//! Shared fixtures: a config pointing both the token authority and the CRM at
//! one wiremock server, plus mocks for the happy paths.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use crm_account_gateway::config::Config;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "token-123";
pub const TOKEN_PATH: &str = "/test-tenant/oauth2/v2.0/token";
pub const CONTACTS_PATH: &str = "/api/data/v9.0/contacts";

pub const STUDENT_GUID: &str = "11111111-2222-3333-4444-555555555555";
pub const FATHER_GUID: &str = "aaaaaaaa-0000-0000-0000-000000000001";
pub const MOTHER_GUID: &str = "bbbbbbbb-0000-0000-0000-000000000002";
pub const ACADEMIC_YEAR_ID: &str = "cccccccc-0000-0000-0000-000000000003";

pub fn test_config(server: &MockServer) -> Config {
    Config {
        tenant_id: "test-tenant".to_string(),
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        crm_url: server.uri(),
        port: 8080,
        authority_host: server.uri(),
        crm_api_version: "v9.0".to_string(),
        crm_timeout_secs: 5,
        parent_link_ttl_secs: 3600,
        rollback_on_link_failure: true,
        rate_limit_per_second: 10,
        rate_limit_burst: 20,
    }
}

pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": TOKEN
        })))
        .mount(server)
        .await;
}

/// Answers contact creations whose body contains `matching` with `guid`.
pub async fn mount_create_contact(server: &MockServer, matching: Value, guid: &str) {
    Mock::given(method("POST"))
        .and(path(CONTACTS_PATH))
        .and(body_partial_json(matching))
        .respond_with(created(server, guid))
        .mount(server)
        .await;
}

pub fn created(server: &MockServer, guid: &str) -> ResponseTemplate {
    ResponseTemplate::new(204).insert_header(
        "Location",
        format!("{}/api/data/v9.0/contacts({})", server.uri(), guid).as_str(),
    )
}

pub async fn mount_patch_ok(server: &MockServer) {
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

pub fn teacher_body() -> Value {
    json!({
        "firstName": "Lina",
        "lastName": "Khoury",
        "email": "lina@example.com",
        "new_graduationuniversity": "AUB"
    })
}

pub fn student_body() -> Value {
    json!({
        "firstName": "Adam",
        "lastName": "Khoury",
        "new_type": "100000000",
        "gendercode": "1",
        "new_chronicdiseases": "None",
        "birthdate": "2015-04-02",
        "new_nationalid": "9988776655",
        "new_assignedinanoherschool": "No",
        "new_previousassignedschool": "Green Hills",
        "new_transferreason": "Relocation",
        "new_ageatnexteducationalyear": "10",
        "academicYearId": ACADEMIC_YEAR_ID
    })
}

pub fn parent_body(gendercode: &str) -> Value {
    json!({
        "firstName": "Karim",
        "lastName": "Khoury",
        "email": "karim@example.com",
        "telephone1": "+96170000000",
        "gendercode": gendercode,
        "familystatuscode": "2",
        "new_academicqualification": "Bachelor",
        "jobtitle": "Engineer",
        "new_jobplace": "Beirut"
    })
}

pub fn post_json(uri: &str, body: &Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(session) = session {
        builder = builder.header("x-session-id", session);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// PATCH requests the CRM received, as (path, body) pairs in arrival order.
pub async fn patches(server: &MockServer) -> Vec<(String, Value)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .map(|r| {
            (
                r.url.path().to_string(),
                serde_json::from_slice(&r.body).unwrap_or(Value::Null),
            )
        })
        .collect()
}

pub async fn count_requests(server: &MockServer, verb: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == request_path)
        .count()
}
