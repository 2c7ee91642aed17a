use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::DateTime;
use diesel::SqliteConnection;

use crate::config::DuplicatePolicy;
use crate::errors::AppError;
use crate::models::feed::Feed;
use crate::models::now_epoch;
use crate::models::post::NewPost;
use crate::reader::{self, FeedFetcher, FetchedItem};

/// Signals the aggregation loop to stop; checked at each tick boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-cycle ingestion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub attempted: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Items dropped for an unparseable publish date.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub feed_name: String,
    pub report: WriteReport,
}

/// Publish dates are expected in the RFC 1123 shape with a numeric zone,
/// e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub fn parse_pub_date(raw: &str) -> Option<i32> {
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|date| date.timestamp() as i32)
}

/// Persist parsed items as posts. An item with a bad publish date is skipped
/// individually; one rotten item never drops the rest of the feed.
pub fn write_posts(
    conn: &mut SqliteConnection,
    feed_id: i32,
    items: &[FetchedItem],
    policy: DuplicatePolicy,
) -> Result<WriteReport, AppError> {
    let mut report = WriteReport::default();
    for item in items {
        report.attempted += 1;
        let published_at = match item.pub_date.as_deref().and_then(parse_pub_date) {
            Some(ts) => ts,
            None => {
                log::debug!("skipping '{}': unparseable publish date", item.title);
                report.skipped += 1;
                continue;
            }
        };

        let now = now_epoch();
        let post = NewPost {
            feed_id,
            title: &item.title,
            url: &item.link,
            description: item.description.as_deref(),
            published_at,
            created_at: now,
            updated_at: now,
        };
        let inserted = match policy {
            DuplicatePolicy::Ignore => post.insert_if_new(conn)?,
            DuplicatePolicy::Update => post.upsert(conn)?,
        };
        if inserted {
            report.inserted += 1;
        } else {
            report.duplicates += 1;
        }
    }
    Ok(report)
}

/// One full pass: pick the most overdue feed, fetch it, advance its fetch
/// timestamp, parse, persist. The timestamp moves right after a successful
/// fetch so a feed serving unparseable content is not hammered every tick.
pub fn run_cycle(
    conn: &mut SqliteConnection,
    fetcher: &dyn FeedFetcher,
    policy: DuplicatePolicy,
) -> Result<CycleOutcome, AppError> {
    let feed = Feed::next_to_fetch(conn)?;
    let payload = fetcher.fetch(&feed.url)?;
    Feed::mark_fetched(conn, feed.id, now_epoch())?;
    let fetched = reader::parse_feed(&payload)?;
    let report = write_posts(conn, feed.id, &fetched.items, policy)?;
    Ok(CycleOutcome {
        feed_name: feed.name,
        report,
    })
}

/// The aggregation loop: one cycle immediately, then one every `interval`,
/// measured cycle start to cycle start. An overrunning cycle makes the next
/// one fire as soon as it finishes; there is no overlap and no catch-up
/// burst. Fetch and parse failures are logged and the loop moves on; store
/// failures and an empty feed set end it.
pub fn run(
    conn: &mut SqliteConnection,
    fetcher: &dyn FeedFetcher,
    interval: Duration,
    policy: DuplicatePolicy,
    cancel: &CancelToken,
) -> Result<(), AppError> {
    log::info!("collecting feeds every {interval:?}");
    loop {
        if cancel.is_cancelled() {
            log::info!("aggregation stopped");
            return Ok(());
        }
        let started = Instant::now();
        match run_cycle(conn, fetcher, policy) {
            Ok(outcome) => {
                let r = outcome.report;
                log::info!(
                    "fetched '{}' ({} items: {} new, {} duplicate, {} skipped)",
                    outcome.feed_name,
                    r.attempted,
                    r.inserted,
                    r.duplicates,
                    r.skipped
                );
            }
            Err(e) if e.halts_aggregation() => return Err(e),
            Err(e) => log::warn!("aggregation cycle failed: {e}"),
        }

        let next_tick = started + interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        }
    }
}

/// Parse durations like `"30s"`, `"1m"`, `"1h30m"`, `"250ms"`.
pub fn parse_duration(raw: &str) -> Result<Duration, AppError> {
    let invalid = || {
        AppError::Usage(format!(
            "invalid duration '{raw}' (expected forms like \"30s\", \"1m\", \"1h30m\")"
        ))
    };

    let mut total = Duration::ZERO;
    let mut digits = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return Err(invalid());
        }
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        digits.clear();
        total += match c {
            'h' => Duration::from_secs(value * 3600),
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                Duration::from_millis(value)
            }
            'm' => Duration::from_secs(value * 60),
            's' => Duration::from_secs(value),
            _ => return Err(invalid()),
        };
    }
    if !digits.is_empty() || total == Duration::ZERO {
        return Err(invalid());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{seed_feed, seed_user, test_conn};

    #[test]
    fn parse_duration_accepts_common_forms() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m30s").unwrap(), Duration::from_secs(150));
    }

    #[test]
    fn parse_duration_rejects_bad_input() {
        for raw in ["", "fast", "10", "s", "10x", "-5s", "0s", "m30"] {
            assert!(
                matches!(parse_duration(raw), Err(AppError::Usage(_))),
                "expected '{raw}' to be rejected"
            );
        }
    }

    #[test]
    fn parse_pub_date_handles_the_expected_format() {
        let ts = parse_pub_date("Mon, 02 Jan 2006 15:04:05 -0700").unwrap();
        assert_eq!(ts, 1136239445);
        assert_eq!(parse_pub_date("garbage"), None);
        assert_eq!(parse_pub_date("2006-01-02"), None);
    }

    fn item(title: &str, link: &str, pub_date: Option<&str>) -> FetchedItem {
        FetchedItem {
            title: title.to_string(),
            link: link.to_string(),
            description: Some(format!("{title} body")),
            pub_date: pub_date.map(str::to_string),
        }
    }

    #[test]
    fn write_posts_skips_items_with_bad_dates() {
        let mut conn = test_conn();
        let user = seed_user(&mut conn, "ada");
        let feed = seed_feed(&mut conn, user.id, "one", "https://one.example/rss");

        let items = vec![
            item("first", "https://one.example/1", Some("Mon, 02 Jan 2006 15:04:05 -0700")),
            item("second", "https://one.example/2", Some("not a date")),
            item("third", "https://one.example/3", Some("Tue, 03 Jan 2006 15:04:05 -0700")),
        ];
        let report =
            write_posts(&mut conn, feed.id, &items, DuplicatePolicy::Ignore).unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.duplicates, 0);
        assert_eq!(
            crate::models::post::Post::count_for_feed(&mut conn, feed.id).unwrap(),
            2
        );
    }

    #[test]
    fn write_posts_absorbs_duplicates_silently() {
        let mut conn = test_conn();
        let user = seed_user(&mut conn, "ada");
        let feed = seed_feed(&mut conn, user.id, "one", "https://one.example/rss");

        let items = vec![item(
            "first",
            "https://one.example/1",
            Some("Mon, 02 Jan 2006 15:04:05 -0700"),
        )];
        let first = write_posts(&mut conn, feed.id, &items, DuplicatePolicy::Ignore).unwrap();
        let second = write_posts(&mut conn, feed.id, &items, DuplicatePolicy::Ignore).unwrap();

        assert_eq!(first.inserted, 1);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(
            crate::models::post::Post::count_for_feed(&mut conn, feed.id).unwrap(),
            1
        );
    }

    #[test]
    fn missing_pub_date_counts_as_skipped() {
        let mut conn = test_conn();
        let user = seed_user(&mut conn, "ada");
        let feed = seed_feed(&mut conn, user.id, "one", "https://one.example/rss");

        let items = vec![item("undated", "https://one.example/1", None)];
        let report =
            write_posts(&mut conn, feed.id, &items, DuplicatePolicy::Ignore).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.inserted, 0);
    }
}
