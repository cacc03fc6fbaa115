//! The session keys a login leaves behind.

use crate::error::AppError;
use crate::model::SessionUser;
use actix_session::Session;

const LOGGEDIN: &str = "loggedin";
const USERNAME: &str = "username";
const USER_ID: &str = "userID";

/// Marks the session as logged in for `user`.
pub fn establish(session: &Session, user: &SessionUser) -> Result<(), AppError> {
    session.insert(LOGGEDIN, true)?;
    session.insert(USERNAME, &user.username)?;
    session.insert(USER_ID, user.user_id)?;
    Ok(())
}

/// The current user, if the session carries a complete login. A session
/// with a stale or partial state reads as logged out.
pub fn current_user(session: &Session) -> Option<SessionUser> {
    if !session.get::<bool>(LOGGEDIN).ok().flatten().unwrap_or(false) {
        return None;
    }
    let username = session.get::<String>(USERNAME).ok().flatten()?;
    let user_id = session.get::<i64>(USER_ID).ok().flatten()?;
    Some(SessionUser { username, user_id })
}

/// Drops the session state and invalidates the cookie, so the next request
/// starts over with a fresh session.
pub fn clear(session: &Session) {
    session.purge();
}
