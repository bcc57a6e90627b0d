use std::future::Future;

use async_trait::async_trait;
use candela_types::CandelaError;
use tokio_util::sync::CancellationToken;

/// Lets the engine tell an abandoned fetch from a real failure.
pub trait Cancellation {
    /// `true` if the error only reports that the fetch honored its token.
    fn is_cancellation(&self) -> bool;
}

impl Cancellation for CandelaError {
    fn is_cancellation(&self) -> bool {
        self.is_cancelled()
    }
}

/// Asynchronous loader driven by a [`Resource`](super::Resource).
///
/// The token is advisory: the engine discards results of superseded fetches
/// on its own, but a fetcher that watches the token can stop real work early.
/// A fetcher that stops because of the token should return an error whose
/// [`Cancellation::is_cancellation`] is `true`.
#[async_trait(?Send)]
pub trait Fetcher<S, D, E> {
    /// Load data for `source`.
    async fn fetch(&self, source: S, token: CancellationToken) -> Result<D, E>;
}

#[async_trait(?Send)]
impl<S, D, E, F, Fut> Fetcher<S, D, E> for F
where
    S: 'static,
    D: 'static,
    E: 'static,
    F: Fn(S, CancellationToken) -> Fut,
    Fut: Future<Output = Result<D, E>> + 'static,
{
    async fn fetch(&self, source: S, token: CancellationToken) -> Result<D, E> {
        (self)(source, token).await
    }
}
