//! 주기 스케줄러
//!
//! 고정 간격으로 [`BenchmarkCollector::scan`]을 실행합니다.
//!
//! ```text
//! Idle --(tick)--> Running --(scan 완료)--> Idle --> ... --(cancel)--> Stopped
//! ```
//!
//! - 첫 tick은 시작 후 한 주기가 지나야 발생합니다.
//! - 주기는 인라인으로 끝까지 실행되므로 겹치지 않습니다. 밀린 tick은 몰아서 실행하지 않고 미룹니다.
//! - 취소는 새 주기 시작만 막습니다. 실행 중인 주기는 강제로 중단하지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::collector::BenchmarkCollector;
use crate::discovery::ContainerDiscovery;
use crate::scanner::ImageScanner;

impl<D: ContainerDiscovery, S: ImageScanner> BenchmarkCollector<D, S> {
    /// 스케줄 루프를 백그라운드 태스크로 시작합니다.
    ///
    /// 반환된 핸들은 `cancel` 이후 루프가 끝나면 완료됩니다.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken, interval: Duration) -> JoinHandle<()> {
        let collector = Arc::clone(self);
        tokio::spawn(async move { collector.run(cancel, interval).await })
    }

    /// 스케줄 루프를 현재 태스크에서 실행합니다.
    pub async fn run(&self, cancel: CancellationToken, interval: Duration) {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "collector loop started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.scan(&cancel).await {
                error!(error = %e, "scan cycle failed");
            }
        }

        info!("collector loop stopped");
    }
}
