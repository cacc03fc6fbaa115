use crate::model::*;
use async_trait::async_trait;
use sqlx::mysql::MySqlPool;
use sqlx::{MySql, QueryBuilder};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

/// Data access seam. Handlers and services only see this trait; the real
/// implementation runs parameterized queries against MySQL, tests substitute
/// an in-memory table set.
#[async_trait]
pub trait Store: Send + Sync {
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;
    /// Removes the user row and every watchlist row of that user.
    async fn delete_user(&self, user_id: i64) -> Result<(), StoreError>;

    async fn film(&self, film_id: i64) -> Result<Option<Film>, StoreError>;
    async fn all_films(&self) -> Result<Vec<Film>, StoreError>;
    /// Case-insensitive substring match on the title. An empty query matches
    /// the whole catalog.
    async fn search_films(&self, query: &str) -> Result<Vec<Film>, StoreError>;
    async fn posters(&self, film_ids: &[i64]) -> Result<Vec<PosterEntry>, StoreError>;

    async fn entries(&self, user_id: i64, film_id: i64)
        -> Result<Vec<WatchlistEntry>, StoreError>;
    async fn entries_with_status(
        &self,
        user_id: i64,
        film_id: i64,
        status: WatchStatus,
    ) -> Result<Vec<WatchlistEntry>, StoreError>;
    async fn entries_for_user(
        &self,
        user_id: i64,
        status: WatchStatus,
    ) -> Result<Vec<WatchlistEntry>, StoreError>;
    async fn insert_entry(
        &self,
        user_id: i64,
        film_id: i64,
        status: WatchStatus,
    ) -> Result<(), StoreError>;
    async fn delete_entries(&self, ids: &[i64]) -> Result<(), StoreError>;
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT userID, username, password FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), StoreError> {
        // Both deletes in one transaction so an account is never half
        // removed.
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM users WHERE userID = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users_watchlist WHERE userID = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn film(&self, film_id: i64) -> Result<Option<Film>, StoreError> {
        let film = sqlx::query_as::<_, Film>(
            "SELECT filmID, title, director, year, tagline, description, poster \
             FROM films WHERE filmID = ?",
        )
        .bind(film_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(film)
    }

    async fn all_films(&self) -> Result<Vec<Film>, StoreError> {
        let films = sqlx::query_as::<_, Film>(
            "SELECT filmID, title, director, year, tagline, description, poster FROM films",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(films)
    }

    async fn search_films(&self, query: &str) -> Result<Vec<Film>, StoreError> {
        let films = sqlx::query_as::<_, Film>(
            "SELECT filmID, title, director, year, tagline, description, poster \
             FROM films WHERE LOWER(title) LIKE LOWER(?)",
        )
        .bind(format!("%{}%", query))
        .fetch_all(&self.pool)
        .await?;
        Ok(films)
    }

    async fn posters(&self, film_ids: &[i64]) -> Result<Vec<PosterEntry>, StoreError> {
        if film_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder =
            QueryBuilder::<MySql>::new("SELECT filmID, poster FROM films WHERE filmID IN (");
        let mut ids = builder.separated(", ");
        for id in film_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(")");
        let posters = builder
            .build_query_as::<PosterEntry>()
            .fetch_all(&self.pool)
            .await?;
        Ok(posters)
    }

    async fn entries(
        &self,
        user_id: i64,
        film_id: i64,
    ) -> Result<Vec<WatchlistEntry>, StoreError> {
        let entries = sqlx::query_as::<_, WatchlistEntry>(
            "SELECT ID, userID, filmID, status FROM users_watchlist \
             WHERE userID = ? AND filmID = ?",
        )
        .bind(user_id)
        .bind(film_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn entries_with_status(
        &self,
        user_id: i64,
        film_id: i64,
        status: WatchStatus,
    ) -> Result<Vec<WatchlistEntry>, StoreError> {
        let entries = sqlx::query_as::<_, WatchlistEntry>(
            "SELECT ID, userID, filmID, status FROM users_watchlist \
             WHERE userID = ? AND filmID = ? AND status = ?",
        )
        .bind(user_id)
        .bind(film_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn entries_for_user(
        &self,
        user_id: i64,
        status: WatchStatus,
    ) -> Result<Vec<WatchlistEntry>, StoreError> {
        let entries = sqlx::query_as::<_, WatchlistEntry>(
            "SELECT ID, userID, filmID, status FROM users_watchlist \
             WHERE userID = ? AND status = ?",
        )
        .bind(user_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn insert_entry(
        &self,
        user_id: i64,
        film_id: i64,
        status: WatchStatus,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users_watchlist (userID, filmID, status) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(film_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_entries(&self, ids: &[i64]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut builder = QueryBuilder::<MySql>::new("DELETE FROM users_watchlist WHERE ID IN (");
        let mut sep = builder.separated(", ");
        for id in ids {
            sep.push_bind(*id);
        }
        sep.push_unseparated(")");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}
