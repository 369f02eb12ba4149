use std::future::Future;

use tracing::error;

use testrig_core::{HarnessError, HarnessResult};

/// Run an async test body to completion from synchronous code.
///
/// The body gets a fresh current-thread runtime with IO and timers enabled.
/// Its error is logged and handed back unchanged (as a [`HarnessError`]), so a
/// plain `#[test] fn` can `syncify(|| async { ... })?` or assert on the result.
pub fn syncify<F, Fut, T, E>(run_async: F) -> HarnessResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<HarnessError>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| HarnessError::Runtime(e.to_string()))?;

    runtime.block_on(run_async()).map_err(|e| {
        let err: HarnessError = e.into();
        error!(error = %err, "async test body failed");
        err
    })
}
