use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use canteen_engine::{NotificationApiError, OrderFlowError, WalletApiError, WalletError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    PaymentFailed(String),
    #[error("{0}")]
    RefundFailed(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationError(e) => match e {
                AuthError::MissingIdentity | AuthError::InvalidIdentity(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::PaymentFailed(_) => StatusCode::BAD_REQUEST,
            Self::RefundFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No user identity was supplied with the request.")]
    MissingIdentity,
    #[error("The user identity is not in the correct format. {0}")]
    InvalidIdentity(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::Unauthorized { .. } => Self::InsufficientPermissions(e.to_string()),
            OrderFlowError::InvalidStatus { .. } |
            OrderFlowError::TooLateToCancel(_) |
            OrderFlowError::OutOfStock { .. } |
            OrderFlowError::InvalidInput(_) => Self::InvalidRequest(e.to_string()),
            OrderFlowError::PaymentFailed { .. } => Self::PaymentFailed(e.to_string()),
            OrderFlowError::RefundFailed { .. } => Self::RefundFailed(e.to_string()),
            OrderFlowError::DatabaseError(_) | OrderFlowError::SystemError(_) => {
                error!("💻️ Order flow failure: {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}

impl From<NotificationApiError> for ServerError {
    fn from(e: NotificationApiError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<WalletApiError> for ServerError {
    fn from(e: WalletApiError) -> Self {
        match e {
            WalletApiError::InvalidInput(_) => Self::InvalidRequest(e.to_string()),
            WalletApiError::WalletError(WalletError::InvalidAmount(_)) => Self::InvalidRequest(e.to_string()),
            WalletApiError::WalletError(_) => Self::BackendError(e.to_string()),
        }
    }
}
