use diesel::prelude::*;

use crate::errors::AppError;
use crate::models::feed::Feed;
use crate::schema::{feed_follows, feeds, posts};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(Feed))]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    pub feed_id: i32,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: i32,
    pub created_at: i32,
    pub updated_at: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost<'a> {
    pub feed_id: i32,
    pub title: &'a str,
    pub url: &'a str,
    pub description: Option<&'a str>,
    pub published_at: i32,
    pub created_at: i32,
    pub updated_at: i32,
}

impl NewPost<'_> {
    /// Insert unless a post with this URL already exists. Returns whether a
    /// row was added; re-observing a known URL is a no-op, not an error.
    pub fn insert_if_new(&self, conn: &mut SqliteConnection) -> Result<bool, AppError> {
        let inserted = diesel::insert_or_ignore_into(posts::table)
            .values(self)
            .execute(conn)?;
        Ok(inserted > 0)
    }

    /// Insert, or refresh title/description/publish date when the URL is
    /// already stored. Returns whether the row was newly added.
    pub fn upsert(&self, conn: &mut SqliteConnection) -> Result<bool, AppError> {
        let existed = Post::url_exists(conn, self.url)?;
        diesel::insert_into(posts::table)
            .values(self)
            .on_conflict(posts::url)
            .do_update()
            .set((
                posts::title.eq(self.title),
                posts::description.eq(self.description),
                posts::published_at.eq(self.published_at),
                posts::updated_at.eq(self.updated_at),
            ))
            .execute(conn)?;
        Ok(!existed)
    }
}

impl Post {
    pub fn url_exists(conn: &mut SqliteConnection, url: &str) -> Result<bool, AppError> {
        let found: Option<i32> = posts::table
            .filter(posts::url.eq(url))
            .select(posts::id)
            .first(conn)
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_by_url(conn: &mut SqliteConnection, url: &str) -> Result<Post, AppError> {
        posts::table
            .filter(posts::url.eq(url))
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("post '{url}' not found")))
    }

    pub fn count_for_feed(conn: &mut SqliteConnection, feed_id: i32) -> Result<i64, AppError> {
        posts::table
            .filter(posts::feed_id.eq(feed_id))
            .count()
            .first(conn)
            .map_err(Into::into)
    }

    /// Newest posts from the feeds the user follows.
    pub fn for_user(
        conn: &mut SqliteConnection,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<Post>, AppError> {
        posts::table
            .inner_join(feeds::table.inner_join(feed_follows::table))
            .filter(feed_follows::user_id.eq(user_id))
            .select(posts::all_columns)
            .order(posts::published_at.desc())
            .limit(limit)
            .load(conn)
            .map_err(Into::into)
    }
}
