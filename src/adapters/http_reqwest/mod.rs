//! reqwest-backed HTTP adapter

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client, Method};
use tracing::debug;

use crate::domain::errors::*;
use crate::ports::*;

/// HTTP adapter; never sends a Referer and buffers bodies up to the request limit
pub struct ReqwestHttpAdapter {
    client: Client,
}

impl ReqwestHttpAdapter {
    pub fn new() -> Result<Self, DomainError> {
        let client = Client::builder()
            .referer(false)
            .redirect(redirect::Policy::limited(10))
            .build()
            .map_err(|e| DomainError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpPort for ReqwestHttpAdapter {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, DomainError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let mut response = builder
            .send()
            .await
            .map_err(|e| DomainError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();

        let mut result = HttpResponse {
            status,
            content_type,
            content_length,
            body: Vec::new(),
            body_limit_exceeded: false,
        };

        if !response.status().is_success() {
            return Ok(result);
        }

        if let (Some(limit), Some(declared)) = (request.max_body_bytes, content_length) {
            if declared > limit {
                debug!(url = %request.url, declared, limit, "Declared length over limit, body skipped");
                result.body_limit_exceeded = true;
                return Ok(result);
            }
        }

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DomainError::Network(e.to_string()))?
        {
            if let Some(limit) = request.max_body_bytes {
                if (result.body.len() + chunk.len()) as u64 > limit {
                    result.body_limit_exceeded = true;
                    break;
                }
            }
            result.body.extend_from_slice(&chunk);
        }

        Ok(result)
    }
}
