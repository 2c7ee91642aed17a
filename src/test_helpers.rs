use diesel::sqlite::SqliteConnection;
use tempfile::TempDir;

use crate::config::Config;
use crate::models::feed::Feed;
use crate::models::user::User;

/// In-memory database with the full schema applied.
pub fn test_conn() -> SqliteConnection {
    crate::db::establish_connection(":memory:").expect("in-memory database")
}

pub fn seed_user(conn: &mut SqliteConnection, name: &str) -> User {
    User::create(conn, name).expect("seed user")
}

pub fn seed_feed(conn: &mut SqliteConnection, user_id: i32, name: &str, url: &str) -> Feed {
    Feed::create(conn, name, url, user_id).expect("seed feed")
}

/// A config file in a temp directory; keep the `TempDir` alive for as long
/// as the config is in use.
pub fn test_config() -> (TempDir, Config) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(crate::config::CONFIG_FILE);
    std::fs::write(&path, r#"{"db_url": ":memory:"}"#).expect("write config");
    let config = Config::read_from(path).expect("read config");
    (dir, config)
}
