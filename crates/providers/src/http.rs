//! `reqwest`-backed [`RequestSender`].

use async_trait::async_trait;
use tracing::debug;

use crate::{HttpResponse, ProviderError, RequestSender, RequestSpec};

/// Sends [`RequestSpec`]s over a shared `reqwest` client.
#[derive(Default)]
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestSender for ReqwestSender {
    async fn send(&self, request: RequestSpec) -> Result<HttpResponse, ProviderError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            ProviderError::InvalidRequest(format!("unsupported HTTP method '{}'", request.method))
        })?;

        debug!(method = %method, url = %request.url, "sending request");

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            body,
        })
    }
}
