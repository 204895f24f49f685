use axum::body::Bytes;
use serde_json::json;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobtracker::api::v1::extractors::{BearerToken, CallerIdentity};
use jobtracker::config::AuthzStrategy;
use jobtracker::repos::error::RepoError;
use jobtracker::services::downstream::{
    Authority, DownstreamGateway, RestClient, RestGateway, SessionError,
};

const SERVICE_KEY: &str = "service-key";
const CALLER_TOKEN: &str = "caller.jwt.token";

fn gateway(server: &MockServer, strategy: AuthzStrategy) -> RestGateway {
    RestGateway::new(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        SERVICE_KEY,
        strategy,
    )
}

fn caller(subject: Uuid) -> CallerIdentity {
    CallerIdentity::new(subject, BearerToken::new(CALLER_TOKEN))
}

fn row(id: Uuid, owner: Uuid) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": owner,
        "title": "Platform engineer",
        "description": "k8s",
        "job_link": null,
        "cv_file_url": "",
        "application_status": "applied",
        "created_at": "2025-03-01T10:00:00Z",
        "company": "ignored column"
    })
}

async fn mount_session_user(server: &MockServer, user: Uuid) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", SERVICE_KEY))
        .and(header("authorization", format!("Bearer {CALLER_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": user, "aud": "authenticated" })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn service_key_list_sends_key_and_owner_predicate() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/job_applications"))
        .and(query_param("user_id", format!("eq.{owner}").as_str()))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", SERVICE_KEY))
        .and(header("authorization", format!("Bearer {SERVICE_KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(id, owner)])))
        .expect(1)
        .mount(&server)
        .await;

    let handle = gateway(&server, AuthzStrategy::ServiceKey)
        .open(&caller(owner))
        .await
        .unwrap();
    let rows = handle.jobs.list_owned(owner).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);
    assert_eq!(rows[0].owner_id, owner);
    assert_eq!(rows[0].status.as_deref(), Some("applied"));
}

#[tokio::test]
async fn impersonation_binds_then_forwards_caller_token() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();

    mount_session_user(&server, owner).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/job_applications"))
        .and(query_param("user_id", format!("eq.{owner}").as_str()))
        .and(header("apikey", SERVICE_KEY))
        .and(header("authorization", format!("Bearer {CALLER_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let handle = gateway(&server, AuthzStrategy::Impersonate)
        .open(&caller(owner))
        .await
        .unwrap();

    assert!(handle.jobs.list_owned(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn impersonation_rejects_session_of_another_user() {
    let server = MockServer::start().await;
    mount_session_user(&server, Uuid::new_v4()).await;

    let err = gateway(&server, AuthzStrategy::Impersonate)
        .open(&caller(Uuid::new_v4()))
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        RepoError::Session(SessionError::SubjectMismatch)
    ));
}

#[tokio::test]
async fn impersonation_bind_refused_by_downstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .mount(&server)
        .await;

    let err = gateway(&server, AuthzStrategy::Impersonate)
        .open(&caller(Uuid::new_v4()))
        .await
        .err()
        .unwrap();

    assert!(matches!(err, RepoError::Session(SessionError::Rejected)));
}

#[tokio::test]
async fn bound_handle_rejected_mid_request_is_session_expired() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();

    mount_session_user(&server, owner).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/job_applications"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "JWT expired" })))
        .mount(&server)
        .await;

    let handle = gateway(&server, AuthzStrategy::Impersonate)
        .open(&caller(owner))
        .await
        .unwrap();
    let err = handle.jobs.list_owned(owner).await.unwrap_err();

    assert!(matches!(err, RepoError::SessionExpired));
}

#[tokio::test]
async fn binding_is_idempotent_for_one_token_and_refuses_another() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();
    mount_session_user(&server, owner).await;

    let mut client = RestClient::new(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        SERVICE_KEY.into(),
    );

    client.bind_session(&caller(owner)).await.unwrap();
    client.bind_session(&caller(owner)).await.unwrap();
    assert_eq!(client.authority(), Authority::Caller);
    assert_eq!(client.session().unwrap().subject_id(), owner);

    let other = CallerIdentity::new(owner, BearerToken::new("another.token"));
    let err = client.bind_session(&other).await.unwrap_err();
    assert!(matches!(err, RepoError::Session(SessionError::AlreadyBound)));
}

#[tokio::test]
async fn delete_is_one_scoped_call() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();
    let mine = Uuid::new_v4();
    let theirs = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/job_applications"))
        .and(query_param("id", format!("eq.{mine}").as_str()))
        .and(query_param("user_id", format!("eq.{owner}").as_str()))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(mine, owner)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/job_applications"))
        .and(query_param("id", format!("eq.{theirs}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let handle = gateway(&server, AuthzStrategy::ServiceKey)
        .open(&caller(owner))
        .await
        .unwrap();

    assert!(handle.jobs.delete_owned(mine, owner).await.unwrap());
    assert!(!handle.jobs.delete_owned(theirs, owner).await.unwrap());
}

#[tokio::test]
async fn downstream_errors_keep_status_for_logging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/job_applications"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let owner = Uuid::new_v4();
    let handle = gateway(&server, AuthzStrategy::ServiceKey)
        .open(&caller(owner))
        .await
        .unwrap();
    let err = handle.jobs.list_owned(owner).await.unwrap_err();

    match err {
        RepoError::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn storage_upload_and_remove() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();
    let object = format!("{owner}/cv/{}.pdf", Uuid::new_v4());

    Mock::given(method("POST"))
        .and(path(format!("/storage/v1/object/job-files/{object}").as_str()))
        .and(header("x-upsert", "false"))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": format!("job-files/{object}") })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/storage/v1/object/job-files"))
        .and(body_json(json!({ "prefixes": [object] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let handle = gateway(&server, AuthzStrategy::ServiceKey)
        .open(&caller(owner))
        .await
        .unwrap();

    let stored = handle
        .files
        .upload("job-files", &object, Bytes::from_static(b"%PDF"), "application/pdf")
        .await
        .unwrap();

    assert_eq!(stored.path, object);
    assert_eq!(
        stored.public_url,
        format!("{}/storage/v1/object/public/job-files/{object}", server.uri())
    );

    handle.files.remove("job-files", &object).await.unwrap();
}
