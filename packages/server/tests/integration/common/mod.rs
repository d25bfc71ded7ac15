use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, Version};
use hashbin_common::StorageEngine;
use hashbin_common::config::{ReconcileConfig, StorageConfig};
use hashbin_common::storage::filesystem::FilesystemBlobStore;
use hashbin_common::testing::FaultyBlobStore;
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tempfile::TempDir;

use hashbin_server::config::{AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig};
use hashbin_server::database::init_db;
use hashbin_server::index::SeaOrmMetadataIndex;
use hashbin_server::state::AppState;

pub const USER1: (&str, &str) = ("user1", "password1");
pub const USER2: (&str, &str) = ("user2", "password2");

pub mod routes {
    pub const UPLOAD: &str = "/upload";
    pub const HEALTH: &str = "/health";
    pub const OPENAPI: &str = "/api-docs/openapi.json";

    pub fn download(hash: &str) -> String {
        format!("/download/{hash}")
    }

    pub fn delete(hash: &str) -> String {
        format!("/delete/{hash}")
    }
}

/// Credential table shared by every test app. Hashed once, with minimal
/// argon2 cost so that per-request verification stays fast in debug builds.
fn users() -> &'static HashMap<String, String> {
    static USERS: OnceLock<HashMap<String, String>> = OnceLock::new();
    USERS.get_or_init(|| {
        let params = Params::new(1024, 1, 1, None).expect("valid argon2 params");
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        [USER1, USER2]
            .into_iter()
            .map(|(name, password)| {
                let salt = SaltString::generate(&mut OsRng);
                let hash = argon2
                    .hash_password(password.as_bytes(), &salt)
                    .expect("Failed to hash test password")
                    .to_string();
                (name.to_string(), hash)
            })
            .collect()
    })
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub config: Arc<AppConfig>,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

fn test_config(dir: &TempDir) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("files.db").display()),
        },
        storage: StorageConfig {
            root: dir.path().join("store"),
            ..Default::default()
        },
        auth: AuthConfig {
            users: users().clone(),
        },
        reconcile: ReconcileConfig {
            enabled: false,
            ..Default::default()
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(|_| {}).await
    }

    pub async fn spawn_with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = test_config(&dir);
        customize(&mut config);

        let engine = hashbin_server::build_engine(&config)
            .await
            .expect("Failed to build engine");
        Self::serve(engine, config, dir).await
    }

    /// Spawn an app whose blob store can be told to fail.
    pub async fn spawn_faulty() -> (Self, Arc<FaultyBlobStore<FilesystemBlobStore>>) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = test_config(&dir);

        let fs = FilesystemBlobStore::new(config.storage.root.clone())
            .await
            .expect("Failed to open blob store");
        let blobs = Arc::new(FaultyBlobStore::new(fs));
        let db = init_db(&config.database.url)
            .await
            .expect("Failed to initialize test database");
        let engine = StorageEngine::new(blobs.clone(), Arc::new(SeaOrmMetadataIndex::new(db)));

        (Self::serve(engine, config, dir).await, blobs)
    }

    async fn serve(engine: StorageEngine, config: AppConfig, dir: TempDir) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            engine,
            config: config.clone(),
        };
        let app = hashbin_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            config,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn upload_as(
        &self,
        (user, password): (&str, &str),
        file_name: &str,
        file_bytes: Vec<u8>,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.upload_form(Some((user, password)), form).await
    }

    pub async fn upload_form(
        &self,
        credentials: Option<(&str, &str)>,
        form: reqwest::multipart::Form,
    ) -> TestResponse {
        let mut req = self.client.post(self.url(routes::UPLOAD)).multipart(form);
        if let Some((user, password)) = credentials {
            req = req.basic_auth(user, Some(password));
        }
        let res = req
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_as(&self, credentials: Option<(&str, &str)>, hash: &str) -> TestResponse {
        let mut req = self.client.delete(self.url(&routes::delete(hash)));
        if let Some((user, password)) = credentials {
            req = req.basic_auth(user, Some(password));
        }
        let res = req.send().await.expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Upload as `USER1` and return the hash.
    pub async fn upload_ok(&self, file_name: &str, file_bytes: &[u8]) -> String {
        let res = self.upload_as(USER1, file_name, file_bytes.to_vec()).await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        res.file_hash()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn file_hash(&self) -> String {
        self.body["file_hash"]
            .as_str()
            .expect("response body should contain 'file_hash'")
            .to_string()
    }

    pub fn error(&self) -> &str {
        self.body["error"]
            .as_str()
            .expect("response body should contain 'error'")
    }

    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}
