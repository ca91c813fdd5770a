use thiserror::Error;

/// Service-level errors that can occur in cart reconciliation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Cart not found")]
    CartNotFound { user_id: String },

    #[error("Cart item not found")]
    CartItemNotFound { product_id: String, user_id: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database connection failed")]
    ConnectionFailed,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid stored data: {message}")]
    InvalidData { message: String },

    #[error("Cast failed: {message}")]
    CastFailed { message: String },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Timeout occurred during operation")]
    Timeout,
}

/// Errors raised while coercing an incoming cart item into its typed form
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid format: {field}, expected={expected}")]
    InvalidFormat { field: String, expected: String },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

impl ServiceError {
    /// A present value the store cannot cast to its field type.
    ///
    /// Surfaces as a store failure rather than a client error.
    pub fn uncastable(err: ValidationError) -> Self {
        RepositoryError::CastFailed {
            message: err.to_string(),
        }
        .into()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
