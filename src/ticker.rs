use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::Timestamp;

/// Periodic "current time" publisher for live durations. Never touches
/// persisted state.
///
/// The background task is aborted by [`Ticker::detach`] or on drop.
#[derive(Debug)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
    now: watch::Receiver<Timestamp>,
}

/// Must be called from within a tokio runtime.
pub fn start_ticker(period: Duration) -> Ticker {
    let (tx, rx) = watch::channel(Utc::now());
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx.send(Utc::now()).is_err() {
                break;
            }
        }
    });
    log::debug!("ticker started period_ms={}", period.as_millis());
    Ticker {
        handle: Some(handle),
        now: rx,
    }
}

impl Ticker {
    pub fn subscribe(&self) -> watch::Receiver<Timestamp> {
        self.now.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn detach(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::debug!("ticker stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
