use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use marginalia_core::pipeline::{
    Transport, TransportFailure, TransportRequest, TransportResponse,
};
use marginalia_domain::{HttpMethod, MarginaliaError};
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

/// [`Transport`] backed by `reqwest`.
///
/// Any HTTP status is returned as a response; only connection, TLS and
/// timeout problems become [`TransportFailure`]s. Retries belong to the
/// pipeline, not to this client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, MarginaliaError> {
        Self::builder().build()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure> {
        let method = to_reqwest_method(request.method);
        let mut builder = self
            .client
            .request(method.clone(), &request.url)
            .timeout(request.timeout)
            .query(&request.query.iter().collect::<Vec<_>>());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(%method, url = %request.url, "sending HTTP request");
        let response = builder.send().await.map_err(|err| map_error(&err, request.timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect::<BTreeMap<_, _>>();
        let body = response.text().await.map_err(|err| map_error(&err, request.timeout))?;
        debug!(%method, url = %request.url, status, "received HTTP response");

        Ok(TransportResponse { status, headers, body })
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: Some(concat!("marginalia/", env!("CARGO_PKG_VERSION")).to_string()),
            default_headers: None,
        }
    }
}

impl ReqwestTransportBuilder {
    /// Upper bound for establishing a connection; the per-request timeout
    /// still comes from each [`TransportRequest`].
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, MarginaliaError> {
        let mut builder = ReqwestClient::builder().connect_timeout(self.connect_timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|err| MarginaliaError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(ReqwestTransport { client })
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn map_error(err: &reqwest::Error, timeout: Duration) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout(timeout)
    } else {
        TransportFailure::Network(err.to_string())
    }
}
