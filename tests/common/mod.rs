#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, header};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

use jobtracker::api::v1::extractors::CallerIdentity;
use jobtracker::app::build_router;
use jobtracker::config::{AppEnv, AuthzStrategy, Config};
use jobtracker::repos::error::{RepoError, RepoResult};
use jobtracker::repos::file_repo::{FileStore, StoredFile};
use jobtracker::repos::job_repo::{JobRepo, JobRow, NewJobRow};
use jobtracker::services::auth::build_token_verifier;
use jobtracker::services::downstream::{DownstreamGateway, DownstreamHandle};
use jobtracker::state::AppState;

pub const SECRET: &str = "integration-test-secret";
pub const ISSUER: &str = "https://identity.test/auth/v1";
pub const AUDIENCE: &str = "authenticated";
pub const BUCKET: &str = "job-files";

pub fn test_config() -> Config {
    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        app_env: AppEnv::Development,
        cors_allowed_origins: Vec::new(),
        downstream_url: Url::parse("http://downstream.invalid").unwrap(),
        downstream_service_key: "service-key".into(),
        downstream_timeout: Duration::from_secs(5),
        authz_strategy: AuthzStrategy::ServiceKey,
        storage_bucket: BUCKET.into(),
        auth_jwt_secret: SECRET.into(),
        auth_issuer: ISSUER.into(),
        auth_audience: AUDIENCE.into(),
        request_timeout: Duration::from_secs(10),
        max_upload_bytes: 1024 * 1024,
    }
}

pub fn mint(claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn token_for(user: Uuid) -> String {
    mint(json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": user.to_string(),
        "exp": Utc::now().timestamp() + 300,
    }))
}

/// In-memory stand-in for the downstream table and storage bucket.
#[derive(Default)]
pub struct MemoryBackend {
    pub rows: Mutex<Vec<JobRow>>,
    pub objects: Mutex<Vec<String>>,
    pub opens: AtomicUsize,
    pub inserts: AtomicUsize,
    pub uploads: AtomicUsize,
    pub removes: AtomicUsize,
    pub fail_insert: AtomicBool,
    /// 1-based upload number that fails; 0 never fails.
    pub fail_upload_at: AtomicUsize,
    /// Make `list_owned` ignore the owner predicate, like a misconfigured downstream.
    pub ignore_owner_on_list: AtomicBool,
}

impl MemoryBackend {
    pub fn calls(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
            + self.inserts.load(Ordering::SeqCst)
            + self.uploads.load(Ordering::SeqCst)
            + self.removes.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.inserts.load(Ordering::SeqCst) + self.uploads.load(Ordering::SeqCst)
    }

    pub fn seed(&self, owner_id: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.rows.lock().unwrap().push(JobRow {
            id,
            owner_id,
            title: title.into(),
            description: format!("{title} description"),
            job_link: None,
            cv_file_url: None,
            app_file_url: None,
            status: Some("applied".into()),
            created_at: Utc::now(),
        });
        id
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

struct MemoryJobs(Arc<MemoryBackend>);

#[async_trait]
impl JobRepo for MemoryJobs {
    async fn list_owned(&self, owner_id: Uuid) -> RepoResult<Vec<JobRow>> {
        let ignore_owner = self.0.ignore_owner_on_list.load(Ordering::SeqCst);
        let rows = self.0.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| ignore_owner || r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, new_job: &NewJobRow) -> RepoResult<JobRow> {
        self.0.inserts.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_insert.load(Ordering::SeqCst) {
            return Err(RepoError::Decode("insert refused".into()));
        }

        let row = JobRow {
            id: Uuid::new_v4(),
            owner_id: new_job.owner_id,
            title: new_job.title.clone(),
            description: new_job.description.clone(),
            job_link: new_job.job_link.clone(),
            cv_file_url: new_job.cv_file_url.clone(),
            app_file_url: new_job.app_file_url.clone(),
            status: new_job.status.clone(),
            created_at: Utc::now(),
        };
        self.0.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn delete_owned(&self, id: Uuid, owner_id: Uuid) -> RepoResult<bool> {
        let mut rows = self.0.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !(r.id == id && r.owner_id == owner_id));
        Ok(rows.len() != before)
    }
}

struct MemoryFiles(Arc<MemoryBackend>);

#[async_trait]
impl FileStore for MemoryFiles {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        _bytes: Bytes,
        _content_type: &str,
    ) -> RepoResult<StoredFile> {
        let nth = self.0.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.0.fail_upload_at.load(Ordering::SeqCst) == nth {
            return Err(RepoError::Decode("upload refused".into()));
        }
        self.0.objects.lock().unwrap().push(path.to_string());
        Ok(StoredFile {
            bucket: bucket.to_string(),
            path: path.to_string(),
            public_url: format!("http://downstream.invalid/storage/v1/object/public/{bucket}/{path}"),
        })
    }

    async fn remove(&self, _bucket: &str, path: &str) -> RepoResult<()> {
        self.0.removes.fetch_add(1, Ordering::SeqCst);
        self.0.objects.lock().unwrap().retain(|p| p != path);
        Ok(())
    }
}

pub struct MemoryGateway(pub Arc<MemoryBackend>);

#[async_trait]
impl DownstreamGateway for MemoryGateway {
    async fn open(&self, _caller: &CallerIdentity) -> RepoResult<DownstreamHandle> {
        self.0.opens.fetch_add(1, Ordering::SeqCst);
        Ok(DownstreamHandle {
            jobs: Box::new(MemoryJobs(Arc::clone(&self.0))),
            files: Box::new(MemoryFiles(Arc::clone(&self.0))),
        })
    }
}

pub fn app() -> (Router, Arc<MemoryBackend>) {
    let config = test_config();
    let backend = Arc::new(MemoryBackend::default());
    let state = AppState::new(
        build_token_verifier(&config),
        Arc::new(MemoryGateway(Arc::clone(&backend))),
        config.storage_bucket.as_str(),
    );
    (build_router(state, &config), backend)
}

pub const BOUNDARY: &str = "jobtrackerboundary";

/// A multipart part: `(name, file_name, content)`.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a str);

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/pdf\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn create_request(token: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/jobs")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
