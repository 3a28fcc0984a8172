use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum WPayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The gateway did not respond within the timeout")]
    Timeout,
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The gateway declined the request. [{code}] {message}")]
    Rejected { code: String, message: String },
}
