use diesel::prelude::*;

use crate::errors::AppError;
use crate::models::now_epoch;
use crate::models::user::User;
use crate::schema::{feeds, users};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(User))]
#[diesel(table_name = feeds)]
pub struct Feed {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub user_id: i32,
    pub created_at: i32,
    pub updated_at: i32,
    /// Never-fetched feeds hold `None` and are always scheduled first.
    pub last_fetched_at: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = feeds)]
pub struct NewFeed<'a> {
    pub name: &'a str,
    pub url: &'a str,
    pub user_id: i32,
    pub created_at: i32,
    pub updated_at: i32,
}

impl Feed {
    pub fn create(
        conn: &mut SqliteConnection,
        name: &str,
        url: &str,
        user_id: i32,
    ) -> Result<Feed, AppError> {
        let now = now_epoch();
        let new_feed = NewFeed {
            name,
            url,
            user_id,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(feeds::table)
            .values(&new_feed)
            .get_result(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => AppError::Usage(format!("feed with url '{url}' already exists")),
                other => other.into(),
            })
    }

    pub fn get_by_url(conn: &mut SqliteConnection, url: &str) -> Result<Feed, AppError> {
        feeds::table
            .filter(feeds::url.eq(url))
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("feed '{url}' not found")))
    }

    /// All feeds paired with the name of the user who added them.
    pub fn get_all_with_owner(
        conn: &mut SqliteConnection,
    ) -> Result<Vec<(Feed, String)>, AppError> {
        feeds::table
            .inner_join(users::table)
            .select((feeds::all_columns, users::name))
            .order(feeds::name.asc())
            .load(conn)
            .map_err(Into::into)
    }

    /// The single feed whose fetch is most overdue. SQLite sorts `NULL`
    /// before any value in ascending order, so never-fetched feeds win; ties
    /// break by id, which keeps successive picks deterministic and
    /// starvation-free.
    pub fn next_to_fetch(conn: &mut SqliteConnection) -> Result<Feed, AppError> {
        feeds::table
            .order((feeds::last_fetched_at.asc(), feeds::id.asc()))
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound("no feeds to fetch".to_string()))
    }

    pub fn mark_fetched(
        conn: &mut SqliteConnection,
        feed_id: i32,
        fetched_at: i32,
    ) -> Result<(), AppError> {
        diesel::update(feeds::table.find(feed_id))
            .set((
                feeds::last_fetched_at.eq(Some(fetched_at)),
                feeds::updated_at.eq(fetched_at),
            ))
            .execute(conn)?;
        Ok(())
    }

    pub fn delete_by_url(conn: &mut SqliteConnection, url: &str) -> Result<(), AppError> {
        let deleted = diesel::delete(feeds::table.filter(feeds::url.eq(url))).execute(conn)?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("feed '{url}' not found")));
        }
        Ok(())
    }
}
