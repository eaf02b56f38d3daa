//! Stable error taxonomy shared by the API, the worker and the RPC server.
//!
//! Every failure that crosses a component boundary is expressed as a
//! [`ServiceError`] carrying an [`ErrorCode`]. Codes are stable strings
//! (`SVC1000`, `SVC4101`, ...) persisted into `operations.error_msg` and
//! returned to API clients, so they must never be renumbered.

use std::error::Error as StdError;
use std::fmt;

/// Boxed cause attached to a [`ServiceError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Stable service error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidRequest,
    InvalidStyle,
    InvalidShotDetails,
    StoryNotFound,
    ShotNotFound,
    OperationNotFound,
    OperationCreateFailed,
    OperationUpdateFailed,
    OperationTimeout,
    QueueConfigInvalid,
    JobEnqueueFailed,
    WorkerExecutionFailed,
    ResultDataMissing,
    ShotMissingPartial,
    ShotContentMissing,
    ShotAssetMissing,
    DatabaseActionFailed,
}

/// Coarse response class a code maps to at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ClientError,
    NotFound,
    GatewayTimeout,
    BadGateway,
    Internal,
}

impl ErrorClass {
    /// HTTP status code equivalent of this class.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorClass::ClientError => 400,
            ErrorClass::NotFound => 404,
            ErrorClass::BadGateway => 502,
            ErrorClass::GatewayTimeout => 504,
            ErrorClass::Internal => 500,
        }
    }
}

impl ErrorCode {
    /// The stable wire identifier of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "SVC1000",
            ErrorCode::InvalidStyle => "SVC1001",
            ErrorCode::InvalidShotDetails => "SVC1002",
            ErrorCode::StoryNotFound => "SVC1101",
            ErrorCode::ShotNotFound => "SVC1102",
            ErrorCode::OperationNotFound => "SVC1103",
            ErrorCode::OperationCreateFailed => "SVC2001",
            ErrorCode::OperationUpdateFailed => "SVC2002",
            ErrorCode::OperationTimeout => "SVC2003",
            ErrorCode::QueueConfigInvalid => "SVC3001",
            ErrorCode::JobEnqueueFailed => "SVC3002",
            ErrorCode::WorkerExecutionFailed => "SVC4001",
            ErrorCode::ResultDataMissing => "SVC4002",
            ErrorCode::ShotMissingPartial => "SVC4101",
            ErrorCode::ShotContentMissing => "SVC4102",
            ErrorCode::ShotAssetMissing => "SVC4103",
            ErrorCode::DatabaseActionFailed => "SVC5001",
        }
    }

    /// Human-readable message used when an error carries none of its own.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid request parameters",
            ErrorCode::InvalidStyle => "unsupported style",
            ErrorCode::InvalidShotDetails => "invalid shot details",
            ErrorCode::StoryNotFound => "story not found",
            ErrorCode::ShotNotFound => "shot not found",
            ErrorCode::OperationNotFound => "operation not found",
            ErrorCode::OperationCreateFailed => "failed to create operation",
            ErrorCode::OperationUpdateFailed => "failed to update operation status",
            ErrorCode::OperationTimeout => "operation timed out",
            ErrorCode::QueueConfigInvalid => "job queue is misconfigured",
            ErrorCode::JobEnqueueFailed => "failed to enqueue job",
            ErrorCode::WorkerExecutionFailed => "worker execution failed",
            ErrorCode::ResultDataMissing => "job result is missing",
            ErrorCode::ShotMissingPartial => "some shots are missing",
            ErrorCode::ShotContentMissing => "shot content is missing or incomplete",
            ErrorCode::ShotAssetMissing => "shot assets are missing or corrupted",
            ErrorCode::DatabaseActionFailed => "database action failed",
        }
    }

    /// Response class used by the API layer.
    pub fn class(self) -> ErrorClass {
        match self {
            ErrorCode::InvalidRequest | ErrorCode::InvalidStyle | ErrorCode::InvalidShotDetails => {
                ErrorClass::ClientError
            }
            ErrorCode::StoryNotFound | ErrorCode::ShotNotFound | ErrorCode::OperationNotFound => {
                ErrorClass::NotFound
            }
            ErrorCode::OperationTimeout => ErrorClass::GatewayTimeout,
            ErrorCode::JobEnqueueFailed
            | ErrorCode::WorkerExecutionFailed
            | ErrorCode::ResultDataMissing
            | ErrorCode::ShotMissingPartial
            | ErrorCode::ShotContentMissing
            | ErrorCode::ShotAssetMissing => ErrorClass::BadGateway,
            ErrorCode::QueueConfigInvalid
            | ErrorCode::OperationCreateFailed
            | ErrorCode::OperationUpdateFailed
            | ErrorCode::DatabaseActionFailed => ErrorClass::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure: stable code, optional message, optional cause.
#[derive(Debug)]
pub struct ServiceError {
    code: ErrorCode,
    message: String,
    source: Option<BoxError>,
}

impl ServiceError {
    /// Create an error with an explicit message and no cause.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create an error that wraps an underlying cause.
    pub fn wrap(code: ErrorCode, message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    /// Create an error that only carries the code's default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, String::new())
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The explicit message, falling back to the code's default message.
    pub fn message(&self) -> &str {
        if self.message.is_empty() {
            self.code.default_message()
        } else {
            &self.message
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.code.class()
    }

    /// True when this error carries the given code.
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message())?;
        if let Some(cause) = &self.source {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl StdError for ServiceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Convenience alias for fallible service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
