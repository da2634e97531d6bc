use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use serde::Serialize;
use tower::BoxError;
use tower::Service;

use crate::document::Document;
use crate::error::GatewayError;
use crate::gateway::SubmissionGateway;
use crate::transport::HttpTransport;
use crate::transport::TransportRequest;
use crate::transport::TransportResponse;

/// A document together with the signature it is submitted under.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission<D = Document> {
    pub document: D,
    pub signature: String,
}

impl<D> Submission<D> {
    pub fn new(document: D, signature: impl Into<String>) -> Self {
        Self {
            document,
            signature: signature.into(),
        }
    }
}

/// Exposes a shared [`SubmissionGateway`] as a `tower::Service`.
///
/// Every clone talks to the same gateway, so pacing and the one-in-flight
/// guarantee hold across clones. Caller side policy (retries, overall
/// timeouts, buffering) can be stacked on top with `tower::ServiceBuilder`.
pub struct SubmitService<T = HttpTransport, D = Document> {
    gateway: Arc<SubmissionGateway<T>>,
    _phantom: PhantomData<fn(D)>,
}

// Deriving Clone would needlessly require T: Clone and D: Clone.
impl<T, D> Clone for SubmitService<T, D> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            _phantom: PhantomData,
        }
    }
}

impl<T, D> SubmitService<T, D> {
    pub fn new(gateway: Arc<SubmissionGateway<T>>) -> Self {
        Self {
            gateway,
            _phantom: PhantomData,
        }
    }

    pub fn gateway(&self) -> &Arc<SubmissionGateway<T>> {
        &self.gateway
    }
}

impl<T, D> Service<Submission<D>> for SubmitService<T, D>
where
    T: Service<TransportRequest, Response = TransportResponse, Error = BoxError> + Send + 'static,
    T::Future: Send,
    D: Serialize + Send + Sync + 'static,
{
    type Response = String;
    type Error = GatewayError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Throttling happens inside the call so that it is shared by every clone.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Submission<D>) -> Self::Future {
        let gateway = Arc::clone(&self.gateway);

        Box::pin(async move { gateway.submit(&req.document, &req.signature).await })
    }
}
