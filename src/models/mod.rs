pub mod feed;
pub mod feed_follow;
pub mod post;
pub mod user;

/// Wall-clock time as epoch seconds, the unit every timestamp column uses.
pub fn now_epoch() -> i32 {
    chrono::Utc::now().timestamp() as i32
}
