//! Test helpers: build AppState and router against scratch directories.
//!
//! Run from workspace root: `cargo test -p vitrine-api --test uploads_test`
//! or `cargo test -p vitrine-api`.

pub mod fixtures;

use std::path::PathBuf;
use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use tempfile::TempDir;
use vitrine_api::setup::{build_state, routes};
use vitrine_api::state::AppState;
use vitrine_core::{constants, Config};

pub const TEST_ADMIN_API_KEY: &str = "test-admin-key-0123456789abcdef";

/// Test application: server plus the scratch directories it writes into.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub storage_path: PathBuf,
    pub temp_path: PathBuf,
    _storage_dir: TempDir,
    _scratch_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of leftover artifacts in the temp store directory.
    pub fn temp_artifact_count(&self) -> usize {
        std::fs::read_dir(&self.temp_path)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Number of rendition files persisted under the storage root.
    pub fn stored_file_count(&self) -> usize {
        fn walk(dir: &std::path::Path) -> usize {
            let mut count = 0;
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        count += walk(&path);
                    } else {
                        count += 1;
                    }
                }
            }
            count
        }
        walk(&self.storage_path)
    }
}

/// Setup a test app with the default contract limits.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup a test app after tweaking the configuration, for tests that need
/// small limits to stay fast.
pub async fn setup_test_app_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let storage_dir = TempDir::new().expect("storage temp dir");
    let scratch_dir = TempDir::new().expect("scratch temp dir");

    let mut config = Config {
        server_port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        environment: "test".to_string(),
        admin_api_keys: vec![TEST_ADMIN_API_KEY.to_string()],
        storage_root: storage_dir.path().to_string_lossy().into_owned(),
        temp_dir: scratch_dir.path().to_string_lossy().into_owned(),
        max_file_size_bytes: constants::MAX_FILE_SIZE_BYTES,
        max_batch_size_bytes: constants::MAX_BATCH_SIZE_BYTES,
        max_files_per_request: constants::MAX_FILES_PER_REQUEST,
        allowed_extensions: constants::ALLOWED_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .collect(),
        allowed_content_types: constants::ALLOWED_CONTENT_TYPES
            .iter()
            .map(|s| s.to_string())
            .collect(),
        upload_rate_limit_per_minute: constants::UPLOAD_RATE_LIMIT_PER_MINUTE,
        rate_limit_window_secs: constants::RATE_LIMIT_WINDOW_SECS,
        rate_limit_max_clients: 10_000,
    };
    tweak(&mut config);

    let state = build_state(config).await.expect("build state");
    let router = routes::setup_routes(&state.config, state.clone()).expect("setup routes");
    let server = TestServer::new(router).expect("test server");

    TestApp {
        server,
        state,
        storage_path: storage_dir.path().to_path_buf(),
        temp_path: scratch_dir.path().to_path_buf(),
        _storage_dir: storage_dir,
        _scratch_dir: scratch_dir,
    }
}

pub fn admin_path(product_id: &str) -> String {
    format!("/api/admin/products/{}/images", product_id)
}

/// POST a batch of `(filename, content_type, bytes)` files as the repeated
/// multipart field `images`, authenticated with the test admin key.
pub async fn upload_files(
    app: &TestApp,
    product_id: &str,
    files: Vec<(&str, &str, Vec<u8>)>,
) -> TestResponse {
    let mut form = MultipartForm::new();
    for (filename, content_type, data) in files {
        form = form.add_part(
            "images",
            Part::bytes(data)
                .file_name(filename)
                .mime_type(content_type),
        );
    }

    app.client()
        .post(&admin_path(product_id))
        .add_header("Authorization", format!("Bearer {}", TEST_ADMIN_API_KEY))
        .multipart(form)
        .await
}

/// GET the product's collection, returning the parsed body.
pub async fn list_images(app: &TestApp, product_id: &str) -> serde_json::Value {
    let response = app
        .client()
        .get(&admin_path(product_id))
        .add_header("Authorization", format!("Bearer {}", TEST_ADMIN_API_KEY))
        .await;
    response.assert_status_ok();
    response.json::<serde_json::Value>()
}
