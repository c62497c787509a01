//! Gateway error types with HTTP response mapping.

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use reservation::ReservationError;
use stock_ledger::StockError;
use thiserror::Error;

/// Gateway-level error type that maps to HTTP responses.
///
/// Authentication and stock-availability failures are business outcomes;
/// upstream unavailability is distinct from an upstream rejection, which is
/// relayed with its original status and body.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bearer token missing, invalid, or expired.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),

    /// The stock ledger rejected a direct operation.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// The reservation coordinator rejected an operation.
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    /// A collaborator could not be reached before the deadline.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A collaborator answered with an error status, relayed verbatim.
    #[error("Upstream rejected request with status {status}")]
    UpstreamRejected { status: StatusCode, body: Bytes },
}

fn stock_error_status(err: &StockError) -> StatusCode {
    match err {
        StockError::UnknownProduct(_) => StatusCode::NOT_FOUND,
        StockError::InsufficientStock { .. } => StatusCode::CONFLICT,
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            GatewayError::InvalidToken => (StatusCode::UNAUTHORIZED, self.to_string()),
            GatewayError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            GatewayError::Stock(ref err) => (stock_error_status(err), self.to_string()),
            GatewayError::Reservation(ref err) => {
                (stock_error_status(err.stock_cause()), self.to_string())
            }
            GatewayError::UpstreamUnavailable(msg) => {
                tracing::warn!(detail = %msg, "upstream unavailable");
                let body = serde_json::json!({ "detail": msg });
                return (StatusCode::BAD_GATEWAY, axum::Json(body)).into_response();
            }
            GatewayError::UpstreamRejected { status, body } => {
                let mut response = (status, body).into_response();
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                return response;
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
