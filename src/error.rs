use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Domain errors for the asset library.
///
/// Expected, recoverable conditions (`NotFound`, `NoContent`) travel as
/// `Err` values and are mapped to client-facing statuses; storage and
/// database failures bubble up as 500s.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("storage failure at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no files to download")]
    NoContent,

    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Error::InvalidOperation(reason.into())
    }

    pub fn storage(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Domain(Error),
    Session(tower_sessions::session::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Domain(Error::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{what} not found")).into_response()
            }
            AppError::Domain(Error::InvalidOperation(reason)) => {
                (StatusCode::BAD_REQUEST, reason).into_response()
            }
            AppError::Domain(Error::NoContent) => {
                (StatusCode::NOT_FOUND, "Nothing to download").into_response()
            }
            AppError::Domain(e) => {
                tracing::error!("Domain error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            AppError::Session(e) => {
                tracing::error!("Session error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        AppError::Domain(e)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Domain(Error::Database(e))
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        AppError::Session(e)
    }
}
