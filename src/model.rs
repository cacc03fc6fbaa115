use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered account. The bcrypt hash stays server-side; `User` is never
/// serialized into a page or payload.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    #[sqlx(rename = "userID")]
    pub user_id: i64,
    pub username: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

/// Catalog row. The catalog is read-only from the application's point of
/// view; rows are loaded out of band (see schema.sql).
///
/// Serialized field names follow the database columns because the `/movies`
/// payload is consumed by client scripts that expect `filmID` etc.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Film {
    #[sqlx(rename = "filmID")]
    #[serde(rename = "filmID")]
    pub film_id: i64,
    pub title: String,
    pub director: String,
    pub year: i32,
    /// "-" is the loader's convention for "no tagline".
    pub tagline: String,
    pub description: String,
    pub poster: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum WatchStatus {
    Planned,
    Watched,
}

#[derive(Debug, Clone, FromRow)]
pub struct WatchlistEntry {
    #[sqlx(rename = "ID")]
    pub id: i64,
    #[sqlx(rename = "userID")]
    pub user_id: i64,
    #[sqlx(rename = "filmID")]
    pub film_id: i64,
    pub status: WatchStatus,
}

/// Poster strip item for the watchlist and dashboard pages.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PosterEntry {
    #[sqlx(rename = "filmID")]
    #[serde(rename = "filmID")]
    pub film_id: i64,
    pub poster: String,
}

/// What a live session knows about its user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub user_id: i64,
}
