//! Fire-and-collect concurrent call helper.
//!
//! Runs every operation to completion and records each slot's outcome;
//! a failure never cancels its siblings. This is the primitive under the
//! reconciliation engine's associate/disassociate fan-out.

use std::future::Future;

use futures_util::future::join_all;

use nomenclab_core::RemoteError;

/// Run keyed operations concurrently, collecting one result per slot.
///
/// Results come back in the order the operations were given, regardless of
/// completion order. There is no short-circuit on first failure.
pub async fn settle_all<K, T, F>(ops: Vec<(K, F)>) -> Vec<(K, Result<T, RemoteError>)>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    let (keys, futures): (Vec<K>, Vec<F>) = ops.into_iter().unzip();
    let results = join_all(futures).await;
    keys.into_iter().zip(results).collect()
}
