#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required field was missing or invalid before serialization.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport-level failure (connection, timeout, non-2xx status).
    #[error("http error: {0}")]
    Http(String),

    /// The API accepted the request but returned GraphQL errors.
    /// The message is the remote error text, verbatim.
    #[error("api error: {0}")]
    Api(String),

    /// The response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

pub type ApiResult<T> = Result<T, ApiError>;
