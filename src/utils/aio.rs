//! Async helpers.

use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, select_all};
use tokio::sync::Semaphore;

use crate::error::{AlbertoError, Result};

/// Run `futures` with at most `n` of them in progress at once.
///
/// Results are returned in input order.
///
/// # Errors
/// `AlbertoError::DeveloperArgument` if `n` is zero.
pub async fn semaphore_gather<I, F, T>(n: usize, futures: I) -> Result<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T>,
{
    if n == 0 {
        return Err(AlbertoError::DeveloperArgument(
            "semaphore_gather needs room for at least one future".to_string(),
        ));
    }

    let semaphore = Arc::new(Semaphore::new(n));
    let limited = futures.into_iter().map(|future| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            // never closed, so acquire cannot fail
            let _permit = semaphore.acquire().await;
            future.await
        }
    });
    Ok(join_all(limited).await)
}

/// Wait for the first of `futures` to finish and drop the rest.
///
/// Returns the index of the finished future with its value.
///
/// # Errors
/// - `AlbertoError::GatherAny` carrying the index if the first future to
///   finish failed
/// - `AlbertoError::DeveloperArgument` if `futures` is empty
pub async fn gather_any<I, F, T>(futures: I) -> Result<(usize, T)>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T>>,
{
    let futures: Vec<_> = futures.into_iter().map(Box::pin).collect();
    if futures.is_empty() {
        return Err(AlbertoError::DeveloperArgument(
            "gather_any needs at least one future".to_string(),
        ));
    }

    let (output, index, _rest) = select_all(futures).await;
    match output {
        Ok(value) => Ok((index, value)),
        Err(e) => Err(AlbertoError::GatherAny {
            index,
            source: Box::new(e),
        }),
    }
}
