//! Injectable waiting for poll loops.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Something that can wait
pub trait Sleeper {
  fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Real wall-clock waiting on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
  async fn sleep(&self, duration: Duration) {
    tokio::time::sleep(duration).await;
  }
}

/// Returns immediately and records every requested wait
#[derive(Debug, Default)]
pub struct InstantSleeper {
  waits: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
  pub fn new() -> Self {
    Self::default()
  }

  /// Waits requested so far
  pub fn waits(&self) -> Vec<Duration> {
    self.waits.lock().map(|waits| waits.clone()).unwrap_or_default()
  }
}

impl Sleeper for InstantSleeper {
  async fn sleep(&self, duration: Duration) {
    if let Ok(mut waits) = self.waits.lock() {
      waits.push(duration);
    }
  }
}
