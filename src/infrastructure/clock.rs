use crate::domain::ports::Clock;
use async_trait::async_trait;
use std::time::Duration;

/// Wall-clock delays backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
