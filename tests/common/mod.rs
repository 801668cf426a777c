#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;

use timesheet::authz::ApprovalConfig;
use timesheet::db::UserDirectory;
use timesheet::jwt::JwtConfig;
use timesheet::models::user::{UserKey, UserProfile};
use timesheet::{router, AppState};

pub struct TestApp {
    // Keeps the database file alive for the test's duration.
    _dir: TempDir,
    pub pool: SqlitePool,
    pub jwt: JwtConfig,
    pub app: Router,
}

pub async fn setup_pool() -> Result<(TempDir, SqlitePool)> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    Ok((dir, pool))
}

pub async fn spawn_app(approval: ApprovalConfig) -> Result<TestApp> {
    let (dir, pool) = setup_pool().await?;
    let jwt = JwtConfig::new("test-secret", 1);
    let app = router(AppState::new(pool.clone(), jwt.clone(), approval));
    Ok(TestApp { _dir: dir, pool, jwt, app })
}

impl TestApp {
    pub async fn add_user(&self, key: &str, username: &str, is_admin: bool, groups: &[&str]) -> Result<UserProfile> {
        let profile = UserProfile::new(key, username);
        UserDirectory::new(self.pool.clone())
            .upsert(&profile, is_admin, groups.iter())
            .await?;
        Ok(profile)
    }

    pub fn token(&self, key: &str) -> Result<String> {
        Ok(self.jwt.encode(&UserKey::from(key))?)
    }

    pub async fn send(&self, method: &str, uri: &str, key: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("authorization", format!("Bearer {}", self.token(key)?));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }
}
