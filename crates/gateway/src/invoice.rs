//! Bridge to the asynchronous invoice compute collaborator.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// A generated invoice document reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_url: String,
    pub invoice_id: String,
}

/// Trait for invoice generation implementations.
///
/// The compute collaborator is a single-shot request/response call with a
/// longer bounded deadline than ordinary forwarding, since it stands for
/// asynchronous document generation.
#[async_trait]
pub trait InvoiceGenerator: Send + Sync {
    /// Generates an invoice for the given order.
    async fn generate(&self, order_id: &OrderId) -> Result<Invoice, GatewayError>;
}

/// The compute function's result envelope: a status code plus a body that
/// arrives either as a JSON string or as an object.
#[derive(Deserialize)]
struct ComputeEnvelope {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(default)]
    body: serde_json::Value,
}

/// Invoice generator that invokes the compute function over HTTP.
#[derive(Clone)]
pub struct HttpInvoiceClient {
    client: reqwest::Client,
    function_url: String,
    timeout: Duration,
}

impl HttpInvoiceClient {
    /// Creates a client for the compute function at `function_url`.
    pub fn new(function_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            function_url: function_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl InvoiceGenerator for HttpInvoiceClient {
    async fn generate(&self, order_id: &OrderId) -> Result<Invoice, GatewayError> {
        let response = self
            .client
            .post(&self.function_url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "order_id": order_id }))
            .send()
            .await
            .map_err(|err| GatewayError::UpstreamUnavailable(err.to_string()))?;

        let envelope: ComputeEnvelope = response
            .json()
            .await
            .map_err(|err| GatewayError::UpstreamUnavailable(format!("invalid compute response: {err}")))?;

        // The transport call can succeed while the envelope itself carries a
        // failure status; that status is what gets relayed.
        if envelope.status_code >= 400 {
            let status = StatusCode::from_u16(envelope.status_code)
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let body = match envelope.body {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(GatewayError::UpstreamRejected {
                status,
                body: body.into(),
            });
        }

        let invoice = match envelope.body {
            serde_json::Value::String(s) => serde_json::from_str(&s),
            other => serde_json::from_value(other),
        }
        .map_err(|err| GatewayError::UpstreamUnavailable(format!("invalid invoice payload: {err}")))?;

        Ok(invoice)
    }
}

#[derive(Default)]
struct StaticInvoiceState {
    fail_status: Option<u16>,
    generated: u64,
}

/// In-memory invoice generator for testing.
#[derive(Clone, Default)]
pub struct StaticInvoiceGenerator {
    state: Arc<RwLock<StaticInvoiceState>>,
}

impl StaticInvoiceGenerator {
    /// Creates a generator that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail with the given envelope status.
    pub fn set_fail_status(&self, status: Option<u16>) {
        self.state.write().unwrap().fail_status = status;
    }

    /// Returns how many invoices were generated.
    pub fn generated_count(&self) -> u64 {
        self.state.read().unwrap().generated
    }
}

#[async_trait]
impl InvoiceGenerator for StaticInvoiceGenerator {
    async fn generate(&self, order_id: &OrderId) -> Result<Invoice, GatewayError> {
        let mut state = self.state.write().unwrap();
        if let Some(status) = state.fail_status {
            return Err(GatewayError::UpstreamRejected {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body: format!("{{\"error\": \"invoice generation failed for {order_id}\"}}").into(),
            });
        }
        state.generated += 1;
        Ok(Invoice {
            invoice_url: format!("https://invoices.example.com/inv-{order_id}.pdf"),
            invoice_id: format!("inv-{order_id}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_generator_success() {
        let generator = StaticInvoiceGenerator::new();
        let invoice = generator.generate(&OrderId::new("42")).await.unwrap();
        assert_eq!(invoice.invoice_id, "inv-42");
        assert_eq!(generator.generated_count(), 1);
    }

    #[tokio::test]
    async fn test_static_generator_failure() {
        let generator = StaticInvoiceGenerator::new();
        generator.set_fail_status(Some(500));

        let err = generator.generate(&OrderId::new("42")).await.unwrap_err();
        match err {
            GatewayError::UpstreamRejected { status, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(generator.generated_count(), 0);
    }
}
