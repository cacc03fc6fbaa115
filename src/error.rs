use crate::database::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Username already exists")]
    Conflict,
    #[error("Invalid username or password")]
    Auth,
    #[error("database error: {0}")]
    Data(#[from] StoreError),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("session error: {0}")]
    Session(#[from] actix_session::SessionInsertError),
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Validation(_) | AppError::Conflict | AppError::Auth => {
                HttpResponse::build(self.status_code())
                    .content_type("text/plain; charset=utf-8")
                    .body(self.to_string())
            }
            other => {
                debug!("{:?}", other);
                // The diagnostic detail ends up in the response body. That
                // leaks internals to the client; kept as longstanding
                // behavior of this app (see DESIGN.md) rather than fixed
                // here.
                let body = format!(
                    "<!DOCTYPE html><html><body><h1>Something went wrong :/</h1>\
                     <pre>{:?}</pre></body></html>",
                    other
                );
                HttpResponse::InternalServerError()
                    .content_type("text/html; charset=utf-8")
                    .body(body)
            }
        }
    }
}
