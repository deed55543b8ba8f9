use crate::error::Result;
use crate::extract::Fragment;
use crate::request::GenerationRequest;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Fragments of one reply, in arrival order
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// Capability of a text-generation backend
///
/// A backend submits the request and, on a success status, hands back the
/// reply as a fragment stream. Non-success statuses are returned as
/// `ChatError::RemoteError` before any fragment is produced. Dropping the
/// stream closes the underlying connection.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn stream_reply(&self, request: &GenerationRequest) -> Result<FragmentStream>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for std::sync::Arc<T> {
    async fn stream_reply(&self, request: &GenerationRequest) -> Result<FragmentStream> {
        (**self).stream_reply(request).await
    }
}
