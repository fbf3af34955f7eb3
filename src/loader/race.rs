//! First-of-N settlement combinator.
//!
//! A path "settles" when it either produces a result or fails terminally.
//! The first settlement wins; the remaining paths are dropped, which
//! cancels them deterministically. A deadline bounds the whole race.

use crate::error::{IngestError, Result};
use futures::future::{select_all, BoxFuture};
use std::time::Duration;

/// Resolve with the first of `paths` to settle, cancelling the rest.
/// Fails with [`IngestError::Timeout`] if nothing settles within `limit`.
///
/// `paths` must be non-empty.
pub async fn first_settled<T>(
    limit: Duration,
    paths: Vec<BoxFuture<'static, Result<T>>>,
) -> Result<T> {
    debug_assert!(!paths.is_empty());
    let race = async move {
        let (outcome, winner, losers) = select_all(paths).await;
        drop(losers);
        tracing::debug!(winner, ok = outcome.is_ok(), "load path settled first");
        outcome
    };
    match tokio::time::timeout(limit, race).await {
        Ok(outcome) => outcome,
        Err(_) => Err(IngestError::Timeout(limit)),
    }
}
