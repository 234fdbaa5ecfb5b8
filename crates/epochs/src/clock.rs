use super::*;

/// Wall clock with an adjustable offset. Jobs read time through this so tests
/// can steer them to any instant without waiting.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock {
  shift: TimeDelta,
}

impl Clock {
  pub fn now(&self) -> DateTime<Utc> {
    Utc::now() + self.shift
  }

  /// Shifts the clock so that `now()` reads `now` from this instant on.
  pub fn set_now(&mut self, now: DateTime<Utc>) {
    self.shift = now - Utc::now();
  }
}
