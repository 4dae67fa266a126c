use crate::config::GatewayConfig;
use crate::domain::gateway::{GatewayError, HttpMethod, Problem};
use crate::domain::ports::GatewayClient;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

/// `GatewayClient` over HTTPS with bearer-token authentication.
///
/// Resource ids such as `/psp/creditcard/payments/{id}` are joined to the configured base URL;
/// operation hrefs advertised by the gateway are absolute and used as they are.
#[derive(Clone)]
pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpGatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::InternalError(Box::new(e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn url_for(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}/{}", self.base_url, path_or_url.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn request(
        &self,
        method: HttpMethod,
        path_or_url: &str,
        body: Option<Value>,
    ) -> std::result::Result<Value, GatewayError> {
        let url = self.url_for(path_or_url);
        debug!(%method, %url, "Gateway request");

        let mut request = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Patch => self.client.patch(&url),
        }
        .bearer_auth(&self.access_token)
        .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let problem = serde_json::from_str::<Problem>(&text).ok();
            let message = problem
                .as_ref()
                .map(Problem::summary)
                .filter(|summary| !summary.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
            debug!(%method, %url, status = status.as_u16(), %message, "Gateway rejected request");
            return Err(GatewayError::Http {
                status: status.as_u16(),
                message,
                problem,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
