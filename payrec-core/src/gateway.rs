//! Outbound client for the payment gateway API.
//!
//! Only the single call the reconciliation flow needs is implemented:
//! submitting checkout details (redirect results, 3DS challenge results)
//! and getting back a gateway response that feeds the normal
//! persist → normalize → reconcile path.

use payrec_sdk::objects::GatewayResponse;
use thiserror::Error;
use url::Url;

/// Errors that can occur when calling the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request error
    #[error("gateway request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway rejected the call.
    #[error("gateway returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// The gateway base URL and path could not be joined.
    #[error("invalid gateway URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Minimal payment-gateway HTTP client.
pub struct GatewayClient {
    base_url: Url,
    api_key: String,
    merchant_account: String,
    http_client: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: Url, api_key: String, merchant_account: String) -> Self {
        Self {
            base_url,
            api_key,
            merchant_account,
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Submit filtered checkout details and return the gateway's response.
    ///
    /// `details` must already have passed the state-data key allowlist;
    /// this client forwards it verbatim.
    pub async fn payment_details(
        &self,
        details: serde_json::Map<String, serde_json::Value>,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.base_url.join("payments/details")?;

        let body = serde_json::json!({
            "merchantAccount": self.merchant_account,
            "details": details,
        });

        let response = self
            .http_client
            .post(url)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GatewayResponse>().await?)
    }
}
