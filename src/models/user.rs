use diesel::prelude::*;

use crate::errors::AppError;
use crate::models::now_epoch;
use crate::schema::users;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub created_at: i32,
    pub updated_at: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub created_at: i32,
    pub updated_at: i32,
}

impl User {
    pub fn create(conn: &mut SqliteConnection, name: &str) -> Result<User, AppError> {
        let now = now_epoch();
        let new_user = NewUser {
            name,
            created_at: now,
            updated_at: now,
        };
        diesel::insert_into(users::table)
            .values(&new_user)
            .get_result(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => AppError::Usage(format!("user '{name}' already exists")),
                other => other.into(),
            })
    }

    pub fn get_by_name(conn: &mut SqliteConnection, name: &str) -> Result<User, AppError> {
        users::table
            .filter(users::name.eq(name))
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("user '{name}' not found")))
    }

    pub fn get_all(conn: &mut SqliteConnection) -> Result<Vec<User>, AppError> {
        users::table
            .order(users::name.asc())
            .load(conn)
            .map_err(Into::into)
    }

    /// Remove every user. Feeds, follows and posts go with them through the
    /// foreign-key cascades.
    pub fn delete_all(conn: &mut SqliteConnection) -> Result<usize, AppError> {
        diesel::delete(users::table).execute(conn).map_err(Into::into)
    }
}
