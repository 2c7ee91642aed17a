use diesel::prelude::*;

use crate::errors::AppError;
use crate::models::feed::Feed;
use crate::models::now_epoch;
use crate::models::user::User;
use crate::schema::{feed_follows, feeds};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Feed))]
#[diesel(table_name = feed_follows)]
pub struct FeedFollow {
    pub id: i32,
    pub user_id: i32,
    pub feed_id: i32,
    pub created_at: i32,
    pub updated_at: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = feed_follows)]
pub struct NewFeedFollow {
    pub user_id: i32,
    pub feed_id: i32,
    pub created_at: i32,
    pub updated_at: i32,
}

impl FeedFollow {
    pub fn create(
        conn: &mut SqliteConnection,
        user_id: i32,
        feed_id: i32,
    ) -> Result<FeedFollow, AppError> {
        let now = now_epoch();
        let new_follow = NewFeedFollow {
            user_id,
            feed_id,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(feed_follows::table)
            .values(&new_follow)
            .get_result(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => AppError::Usage("already following this feed".to_string()),
                other => other.into(),
            })
    }

    /// Feeds the user follows, oldest follow first.
    pub fn feeds_for_user(
        conn: &mut SqliteConnection,
        user_id: i32,
    ) -> Result<Vec<Feed>, AppError> {
        feed_follows::table
            .inner_join(feeds::table)
            .filter(feed_follows::user_id.eq(user_id))
            .select(feeds::all_columns)
            .order(feed_follows::created_at.asc())
            .load(conn)
            .map_err(Into::into)
    }

    pub fn delete(
        conn: &mut SqliteConnection,
        user_id: i32,
        feed_id: i32,
    ) -> Result<(), AppError> {
        let deleted = diesel::delete(
            feed_follows::table
                .filter(feed_follows::user_id.eq(user_id))
                .filter(feed_follows::feed_id.eq(feed_id)),
        )
        .execute(conn)?;
        if deleted == 0 {
            return Err(AppError::NotFound("not following this feed".to_string()));
        }
        Ok(())
    }
}
