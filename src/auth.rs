//! Registration, login and the password policy.

use crate::database::Store;
use crate::error::AppError;
use crate::model::SessionUser;
use log::info;

const SPECIAL_CHARS: &str = "!@#$%^&*";

const POLICY_MESSAGE: &str = "Password must be at least 8 characters long and contain \
     at least one uppercase letter, one lowercase letter, one number, and one special character.";

/// Registration form policy: at least 8 characters with one lowercase
/// letter, one uppercase letter, one digit and one of `!@#$%^&*`.
pub fn password_meets_policy(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIAL_CHARS.contains(c))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    Ok(bcrypt::verify(password, hash)?)
}

/// Creates an account and returns the session payload for it.
///
/// The username existence check is not atomic with the insert, so two
/// concurrent registrations of the same name can race. Accepted; the
/// UNIQUE constraint on the column makes the loser surface as a data error.
pub async fn register(
    db: &dyn Store,
    username: &str,
    password: &str,
    password_confirm: &str,
) -> Result<SessionUser, AppError> {
    if password != password_confirm {
        return Err(AppError::Validation("Passwords do not match".to_owned()));
    }
    if !password_meets_policy(password) {
        return Err(AppError::Validation(POLICY_MESSAGE.to_owned()));
    }
    let hashed = hash_password(password)?;
    if db.user_by_username(username).await?.is_some() {
        return Err(AppError::Conflict);
    }
    db.insert_user(username, &hashed).await?;
    // Re-read the row to pick up the generated userID.
    let user = db
        .user_by_username(username)
        .await?
        .ok_or_else(|| AppError::Internal(format!("user missing after insert: {}", username)))?;
    info!("New user registered: {}", username);
    Ok(SessionUser {
        username: user.username,
        user_id: user.user_id,
    })
}

/// A missing user and a failed verification report the identical message,
/// so the response does not reveal which usernames exist.
pub async fn login(
    db: &dyn Store,
    username: &str,
    password: &str,
) -> Result<SessionUser, AppError> {
    let user = db.user_by_username(username).await?.ok_or(AppError::Auth)?;
    if verify_password(password, &user.password_hash)? {
        info!("Login: {}", username);
        return Ok(SessionUser {
            username: user.username,
            user_id: user.user_id,
        });
    }
    Err(AppError::Auth)
}
