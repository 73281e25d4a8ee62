//! Process-wide request counters.
//!
//! Plain atomics owned by [`crate::state::AppState`]: initialized at
//! process start, read by the `/metrics` endpoint, never reset while the
//! process lives. Counts are per-process; a multi-instance deployment
//! needs an external counter store instead.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
  events_received: AtomicU64,
  sessions_created: AtomicU64,
}

impl Metrics {
  pub fn inc_events(&self, n: u64) {
    self.events_received.fetch_add(n, Ordering::Relaxed);
  }

  pub fn inc_sessions(&self, n: u64) {
    self.sessions_created.fetch_add(n, Ordering::Relaxed);
  }

  pub fn events_received(&self) -> u64 {
    self.events_received.load(Ordering::Relaxed)
  }

  pub fn sessions_created(&self) -> u64 {
    self.sessions_created.load(Ordering::Relaxed)
  }

  /// Plain-text exposition for the `/metrics` endpoint.
  pub fn render(&self) -> String {
    format!(
      "events_received_total {}\nsessions_created_total {}\n",
      self.events_received(),
      self.sessions_created()
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_counters_accumulate() {
    let metrics = Metrics::default();

    metrics.inc_events(3);
    metrics.inc_events(2);
    metrics.inc_sessions(1);

    assert_eq!(metrics.events_received(), 5);
    assert_eq!(metrics.sessions_created(), 1);
  }

  #[test]
  fn test_render_format() {
    let metrics = Metrics::default();
    metrics.inc_events(7);

    assert_eq!(
      metrics.render(),
      "events_received_total 7\nsessions_created_total 0\n"
    );
  }
}
