use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use upi_payment_engine::OrderFlowError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("Request refused. {0}")]
    ForbiddenPeer(String),
    #[error(transparent)]
    OrderFlow(#[from] OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ForbiddenPeer(_) => StatusCode::FORBIDDEN,
            Self::OrderFlow(e) => match e {
                OrderFlowError::ValidationError(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::InvalidSignature => StatusCode::FORBIDDEN,
                OrderFlowError::ForeignMerchant(_) => StatusCode::FORBIDDEN,
                OrderFlowError::StaleRequest(_) => StatusCode::BAD_REQUEST,
                OrderFlowError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderFlowError::GatewayError(_) => StatusCode::BAD_GATEWAY,
                OrderFlowError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                OrderFlowError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({ "error": self.to_string() });
        if let Self::OrderFlow(OrderFlowError::GatewayTimeout { order_id }) = self {
            body["orderId"] = serde_json::Value::String(order_id.to_string());
        }
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}
