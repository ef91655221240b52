use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Run a future and turn a panic inside it into an error message.
///
/// Spawned API tasks go through this so a panicking request reports back to
/// the UI instead of leaving the view waiting for an event that never comes.
pub async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "task panicked".to_string()
            }
        })
}
