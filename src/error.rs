use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::{models::ApiResponse, store::StoreError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A multi-step creation failed; any partial writes were compensated.
    #[error("{message}")]
    Creation {
        message: String,
        #[source]
        source: StoreError,
    },

    /// The denormalized vote counter could not be kept consistent; any
    /// partial writes were compensated.
    #[error("{message}")]
    CounterUpdate {
        message: String,
        #[source]
        source: StoreError,
    },

    /// A deletion step failed. The message names the layer that is now
    /// inconsistent.
    #[error("{message}")]
    Deletion {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("internal server error")]
    Internal(#[from] StoreError),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn creation(message: impl Into<String>, source: StoreError) -> Self {
        Self::Creation {
            message: message.into(),
            source,
        }
    }

    pub fn counter_update(message: impl Into<String>, source: StoreError) -> Self {
        Self::CounterUpdate {
            message: message.into(),
            source,
        }
    }

    pub fn deletion(message: impl Into<String>, source: StoreError) -> Self {
        Self::Deletion {
            message: message.into(),
            source,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Creation { .. }
            | Self::CounterUpdate { .. }
            | Self::Deletion { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self {
                Self::Internal(source) => error!(error = %source, "internal error"),
                other => error!(error = ?other, "request failed mid-sequence"),
            }
        }

        let body = ApiResponse::failure(self.to_string());
        (status, Json(body)).into_response()
    }
}
