//! A fully wired application for handler tests: real SQLite, a wiremock
//! GitHub and a throwaway App key.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use base64::{engine::general_purpose::STANDARD, Engine};
use crypto_box::aead::OsRng;
use github_client::{AccountType, PrivateKeySource};
use http_body_util::BodyExt;
use repo_connect_core::{KeyPolicy, SetupConfig, SetupService};
use repo_connect_store::{
    testing::create_test_pool, InstallationStore, SqliteInstallationStore, SqlitePool,
    SqliteProjectKeyStore,
};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use serde_json::json;
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{routes::create_router, AppState};

pub(crate) const APP_ID: u64 = 12345;
pub(crate) const INSTALL_URL: &str = "https://github.com/apps/perceo/installations/new";
pub(crate) const PUBLIC_KEY_ID: &str = "568250167242549743";

fn app_private_key() -> &'static str {
    static KEY: OnceLock<String> = OnceLock::new();
    KEY.get_or_init(|| {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string()
    })
}

pub(crate) struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub pool: SqlitePool,
    pub github: MockServer,
    pub repository_key: crypto_box::SecretKey,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns with the default config adjusted by `configure`.
    pub async fn spawn_with<F>(configure: F) -> Self
    where
        F: FnOnce(&mut SetupConfig),
    {
        let github = MockServer::start().await;
        let pool = create_test_pool().await;

        let mut config = SetupConfig {
            app_id: Some(APP_ID),
            private_key: Some(PrivateKeySource::inline(app_private_key())),
            install_url: Some(INSTALL_URL.to_string()),
            api_base_url: github.uri(),
            key_policy: KeyPolicy::RotateOnEnsure,
            ..SetupConfig::default()
        };
        configure(&mut config);

        let service = SetupService::new(
            &config,
            Arc::new(config.github_client()),
            Arc::new(SqliteInstallationStore::new(pool.clone())),
            Arc::new(SqliteProjectKeyStore::new(pool.clone())),
        );
        let state = AppState::new(service);

        Self {
            router: create_router(state.clone()),
            state,
            pool,
            github,
            repository_key: crypto_box::SecretKey::generate(&mut OsRng),
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn record_installation(&self, installation_id: u64, login: &str) {
        SqliteInstallationStore::new(self.pool.clone())
            .upsert_installation(installation_id, login, AccountType::Organization)
            .await
            .unwrap();
    }

    /// Mounts the GitHub endpoints a successful provisioning run touches.
    pub async fn mount_github_success(&self, installation_id: u64, owner: &str, repo: &str) {
        self.mount_token(installation_id, 201).await;
        self.mount_public_key(owner, repo, 200).await;
        self.mount_put_secret(owner, repo, 201).await;
    }

    pub async fn mount_token(&self, installation_id: u64, status: u16) {
        self.mount_token_after(installation_id, status, Duration::ZERO)
            .await;
    }

    /// Like [`TestApp::mount_token`], with GitHub taking `delay` to answer.
    pub async fn mount_token_after(&self, installation_id: u64, status: u16, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/app/installations/{installation_id}/access_tokens"
            )))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({
                        "token": "ghs_test_installation_token",
                        "expires_at": "2030-01-01T00:00:00Z"
                    }))
                    .set_delay(delay),
            )
            .mount(&self.github)
            .await;
    }

    pub async fn mount_public_key(&self, owner: &str, repo: &str, status: u16) {
        let body = if status == 200 {
            json!({
                "key_id": PUBLIC_KEY_ID,
                "key": STANDARD.encode(self.repository_key.public_key().as_bytes()),
            })
        } else {
            json!({ "message": "Resource not accessible by integration" })
        };
        Mock::given(method("GET"))
            .and(path(format!(
                "/repos/{owner}/{repo}/actions/secrets/public-key"
            )))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.github)
            .await;
    }

    pub async fn mount_put_secret(&self, owner: &str, repo: &str, status: u16) {
        Mock::given(method("PUT"))
            .and(path(format!(
                "/repos/{owner}/{repo}/actions/secrets/PERCEO_API_KEY"
            )))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.github)
            .await;
    }

    pub async fn mount_installation(&self, installation_id: u64, login: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/app/installations/{installation_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": installation_id,
                "account": { "login": login, "type": "Organization" }
            })))
            .mount(&self.github)
            .await;
    }

    pub async fn github_request_count(&self) -> usize {
        self.github
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }

    /// Plaintext of every secret uploaded so far, opened with the repository key.
    pub async fn uploaded_secrets(&self) -> Vec<String> {
        let requests = self.github.received_requests().await.unwrap_or_default();
        requests
            .iter()
            .filter(|r| r.method.as_str() == "PUT")
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                assert_eq!(body["key_id"], PUBLIC_KEY_ID);
                let sealed = STANDARD
                    .decode(body["encrypted_value"].as_str().unwrap())
                    .unwrap();
                let opened = self.repository_key.unseal(&sealed).unwrap();
                String::from_utf8(opened).unwrap()
            })
            .collect()
    }
}

pub(crate) async fn body_json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub(crate) fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
