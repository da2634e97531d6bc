use std::ops::ControlFlow;
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use opentelemetry::metrics::Histogram;
use pace_limit::RateLimiter;
use pace_limit::Reason;
use reqwest::Url;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio::time::timeout;
use tower::BoxError;
use tower::Service;
use tower::ServiceExt;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::error::GatewayError;
use crate::transport::HttpTransport;
use crate::transport::TransportRequest;
use crate::transport::TransportResponse;

/// Path of the create-document call, relative to the registry base URL.
pub const CREATE_DOCUMENT_PATH: &str = "/api/v3/lk/documents/create";

const STATUS_OK: u16 = 200;

#[derive(Clone, Debug)]
struct GatewayMetrics {
    submissions: Counter<u64>,
    limiter_wait: Histogram<f64>,
}

impl GatewayMetrics {
    fn new() -> Self {
        let meter = global::meter("registry_gateway");
        Self {
            submissions: meter.u64_counter("submissions").build(),
            limiter_wait: meter
                .f64_histogram("limiter_wait_seconds")
                .with_unit("s")
                .build(),
        }
    }
}

/// Submits documents to one registry endpoint, one at a time, at a bounded rate.
///
/// Every submission first waits for a permit from the [`RateLimiter`] and then
/// for exclusive use of the outbound channel. The whole HTTP exchange runs
/// while the channel is held, so at most one request is ever in flight, even
/// right after two permits are granted back to back.
///
/// Build one gateway per endpoint and share it, typically behind an `Arc`.
#[derive(Debug)]
pub struct SubmissionGateway<T = HttpTransport> {
    endpoint: Url,
    limiter: RateLimiter,
    channel: Mutex<T>,
    max_wait: Option<Duration>,
    instruments: GatewayMetrics,
}

impl SubmissionGateway<HttpTransport> {
    /// Create a gateway posting to `base_url` over HTTP, admitting at most
    /// `permits_per_second` submissions per second.
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidConfiguration`] if the rate is not a positive
    /// number or the base URL is not an http(s) URL.
    pub fn new(base_url: &str, permits_per_second: f64) -> Result<Self, GatewayError> {
        let limiter = RateLimiter::configure(permits_per_second)?;
        Self::with_transport(base_url, limiter, HttpTransport::new())
    }
}

impl<T> SubmissionGateway<T> {
    /// Create a gateway around an existing limiter and transport.
    pub fn with_transport(
        base_url: &str,
        limiter: RateLimiter,
        transport: T,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            endpoint: create_document_url(base_url)?,
            limiter,
            channel: Mutex::new(transport),
            max_wait: None,
            instruments: GatewayMetrics::new(),
        })
    }

    /// Give up on any submission that cannot get a permit and the channel
    /// within `max_wait`.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// The full URL documents are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl<T> SubmissionGateway<T>
where
    T: Service<TransportRequest, Response = TransportResponse, Error = BoxError>,
{
    /// Submit `document` with `signature` and return the registry's response body.
    ///
    /// Waits for the rate limiter, then for the channel, then performs exactly
    /// one POST. The channel is released on every exit path.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Timeout`] if a default deadline is configured and exceeded
    ///   before the request was sent.
    /// - [`GatewayError::Serialization`] if the document cannot be encoded.
    /// - [`GatewayError::Transport`] if the HTTP exchange fails.
    /// - [`GatewayError::SubmissionFailed`] if the registry answers anything but `200`.
    pub async fn submit<D>(&self, document: &D, signature: &str) -> Result<String, GatewayError>
    where
        D: Serialize + ?Sized,
    {
        self.dispatch(document, signature, self.max_wait).await
    }

    /// Like [`SubmissionGateway::submit`], giving up with
    /// [`GatewayError::Timeout`] if the permit and the channel are not both
    /// obtained within `max_wait`.
    pub async fn submit_within<D>(
        &self,
        document: &D,
        signature: &str,
        max_wait: Duration,
    ) -> Result<String, GatewayError>
    where
        D: Serialize + ?Sized,
    {
        self.dispatch(document, signature, Some(max_wait)).await
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    async fn dispatch<D>(
        &self,
        document: &D,
        signature: &str,
        max_wait: Option<Duration>,
    ) -> Result<String, GatewayError>
    where
        D: Serialize + ?Sized,
    {
        let outcome = self.exchange(document, signature, max_wait).await;

        let label = match &outcome {
            Ok(_) => "completed",
            Err(err) => err.kind(),
        };
        self.instruments
            .submissions
            .add(1, &[KeyValue::new("outcome", label)]);

        outcome
    }

    async fn exchange<D>(
        &self,
        document: &D,
        signature: &str,
        max_wait: Option<Duration>,
    ) -> Result<String, GatewayError>
    where
        D: Serialize + ?Sized,
    {
        let start = Instant::now();

        let waited = match self.limiter.acquire_within(max_wait).await {
            ControlFlow::Continue(waited) => waited,
            ControlFlow::Break(Reason::Overloaded { retry_after }) => {
                debug!(?retry_after, "no permit before the deadline");
                return Err(GatewayError::Timeout);
            }
        };
        self.instruments
            .limiter_wait
            .record(waited.as_secs_f64(), &[]);
        if !waited.is_zero() {
            debug!(?waited, "throttled by rate limiter");
        }

        let mut channel = match max_wait {
            Some(max_wait) => {
                let remaining = max_wait.saturating_sub(start.elapsed());
                timeout(remaining, self.channel.lock()).await.map_err(|_| {
                    debug!("outbound channel still busy at the deadline");
                    GatewayError::Timeout
                })?
            }
            None => self.channel.lock().await,
        };

        let body = serde_json::to_vec(document)?;
        debug!(bytes = body.len(), "sending document");

        let request = TransportRequest {
            url: self.endpoint.clone(),
            signature: signature.to_owned(),
            body,
        };
        let response = ServiceExt::<TransportRequest>::ready(&mut *channel)
            .await
            .map_err(transport_failure)?
            .call(request)
            .await
            .map_err(transport_failure)?;

        if response.status == STATUS_OK {
            info!(status = response.status, "document accepted");
            Ok(response.body)
        } else {
            warn!(status = response.status, "document rejected");
            Err(GatewayError::SubmissionFailed {
                status: response.status,
                body: response.body,
            })
        }
    }
}

fn transport_failure(err: BoxError) -> GatewayError {
    warn!(error = %err, "transport failure");
    GatewayError::Transport(err.to_string())
}

fn create_document_url(base_url: &str) -> Result<Url, GatewayError> {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), CREATE_DOCUMENT_PATH);
    let url = Url::parse(&raw)
        .map_err(|err| GatewayError::InvalidConfiguration(format!("base url {base_url:?}: {err}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(GatewayError::InvalidConfiguration(format!(
            "base url {base_url:?}: unsupported scheme {scheme}"
        ))),
    }
}
