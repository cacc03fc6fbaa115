//! Watchlist status changes and the per-user film lists.

use crate::database::Store;
use crate::error::AppError;
use crate::model::{PosterEntry, WatchStatus};

/// Applies a status action for (user, film).
///
/// "planned" is a toggle: existing planned entries for the pair are deleted,
/// otherwise one is inserted. "watched" always inserts a fresh entry;
/// repeat watches stack up as separate rows. The asymmetry is deliberate.
pub async fn set_status(
    db: &dyn Store,
    user_id: i64,
    film_id: i64,
    status: WatchStatus,
) -> Result<(), AppError> {
    match status {
        WatchStatus::Planned => {
            let existing = db
                .entries_with_status(user_id, film_id, WatchStatus::Planned)
                .await?;
            if existing.is_empty() {
                db.insert_entry(user_id, film_id, WatchStatus::Planned).await?;
            } else {
                let ids: Vec<i64> = existing.iter().map(|e| e.id).collect();
                db.delete_entries(&ids).await?;
            }
        }
        WatchStatus::Watched => {
            db.insert_entry(user_id, film_id, WatchStatus::Watched).await?;
        }
    }
    Ok(())
}

/// Whether the film sits on the user's planned and/or watched lists.
pub async fn film_flags(
    db: &dyn Store,
    user_id: i64,
    film_id: i64,
) -> Result<(bool, bool), AppError> {
    let entries = db.entries(user_id, film_id).await?;
    let planned = entries.iter().any(|e| e.status == WatchStatus::Planned);
    let watched = entries.iter().any(|e| e.status == WatchStatus::Watched);
    Ok((planned, watched))
}

/// Poster strip for the watchlist/dashboard pages. No entries means an
/// empty strip, and the film query is skipped entirely.
pub async fn posters_for(
    db: &dyn Store,
    user_id: i64,
    status: WatchStatus,
) -> Result<Vec<PosterEntry>, AppError> {
    let entries = db.entries_for_user(user_id, status).await?;
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = entries.iter().map(|e| e.film_id).collect();
    Ok(db.posters(&ids).await?)
}
