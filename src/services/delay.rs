//! Timer-backed delay service.

use std::time::Duration;

use async_trait::async_trait;

use super::DelayService;
use crate::execution::ServiceError;

/// Delays using the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelayService;

#[async_trait]
impl DelayService for TokioDelayService {
    async fn delay(&self, duration: Duration) -> Result<(), ServiceError> {
        tokio::time::sleep(duration).await;
        Ok(())
    }
}
