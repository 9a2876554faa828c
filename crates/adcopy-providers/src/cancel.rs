use std::future::Future;

use adcopy_core::AppError;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `cancel` fires first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let cancel = CancellationToken::new();
        let value = cancellable(&cancel, async { Ok::<_, AppError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = cancellable(&cancel, async { Ok::<_, AppError>(7) }).await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move { child.cancel() });
        let result = cancellable(&cancel, std::future::pending::<Result<(), AppError>>()).await;
        assert!(matches!(result, Err(AppError::Cancelled)));
    }
}
