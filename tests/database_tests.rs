//! tests/database_tests.rs
//!
//! The database binding is optional and connects lazily.

use app_kernel::components::DbDriver;
use app_kernel::{Application, Config};
use serde_json::json;
use tempfile::tempdir;

#[tokio::test]
async fn test_configured_sqlite_database_pings() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("app.db");
    let config = Config::from_value(json!({
        "db": { "driver": "sqlite", "db_name": file.to_string_lossy() }
    }))
    .unwrap();

    let app = Application::new(config).unwrap();
    assert!(app.container().is_bound("db"));

    let db = app.container().database().unwrap().unwrap();
    assert_eq!(db.driver(), DbDriver::Sqlite);
    db.ping().await.unwrap();
    assert!(file.exists());
}

#[tokio::test]
async fn test_database_instance_is_shared() {
    let config = Config::from_value(json!({ "db": {} })).unwrap();
    let app = Application::new(config).unwrap();

    let first = app.container().database().unwrap().unwrap();
    let second = app.container().database().unwrap().unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    first.ping().await.unwrap();
}

#[test]
fn test_no_db_section_binds_nothing() {
    let app = Application::new(Config::default()).unwrap();
    assert!(!app.container().is_bound("database"));
    assert!(app.container().class_of("db").is_none());
}
