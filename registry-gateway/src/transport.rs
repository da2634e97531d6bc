use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use reqwest::Client;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tower::BoxError;
use tower::Service;

/// Header carrying the caller's detached signature.
pub const SIGNATURE_HEADER: &str = "Signature";

/// One outbound POST to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub url: Url,
    pub signature: String,
    /// Serialized document, sent as `application/json`.
    pub body: Vec<u8>,
}

/// What came back from the registry, whatever the status.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Production transport backed by a shared `reqwest` client.
///
/// Any `tower::Service<TransportRequest, Response = TransportResponse, Error = BoxError>`
/// can stand in for it, which is how the gateway is tested without a network.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, timeouts, custom roots...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Service<TransportRequest> for HttpTransport {
    type Response = TransportResponse;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: TransportRequest) -> Self::Future {
        let client = self.client.clone();

        Box::pin(async move {
            let response = client
                .post(req.url)
                .header(CONTENT_TYPE, "application/json")
                .header(SIGNATURE_HEADER, req.signature)
                .body(req.body)
                .send()
                .await?;

            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(TransportResponse { status, body })
        })
    }
}
