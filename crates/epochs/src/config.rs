use super::*;

/// Window geometry shared by all epoch-driven jobs. `first` is the lowest
/// epoch a job may ever process; ranges are clamped to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochConfig {
  start: DateTime<Utc>,
  period: TimeDelta,
  first: i64,
}

impl EpochConfig {
  pub fn new(start: DateTime<Utc>, period_seconds: i64, first: i64) -> Result<Self, Error> {
    if period_seconds <= 0 {
      return Err(Error::NonPositivePeriod(period_seconds));
    }

    Ok(Self {
      start,
      period: TimeDelta::seconds(period_seconds),
      first,
    })
  }

  pub fn start(&self) -> DateTime<Utc> {
    self.start
  }

  pub fn period_seconds(&self) -> i64 {
    self.period.num_seconds()
  }

  pub fn first(&self) -> i64 {
    self.first
  }

  /// Index of the epoch containing `time`. Negative before `start`.
  pub fn epoch_of(&self, time: DateTime<Utc>) -> i64 {
    (time - self.start)
      .num_seconds()
      .div_euclid(self.period.num_seconds())
  }

  pub fn start_of(&self, epoch: i64) -> DateTime<Utc> {
    self.start + TimeDelta::seconds(self.period.num_seconds() * epoch)
  }

  pub fn end_of(&self, epoch: i64) -> DateTime<Utc> {
    self.start_of(epoch + 1)
  }

  /// The last epoch whose window has fully elapsed at `now`.
  pub fn last_finished(&self, now: DateTime<Utc>) -> i64 {
    self.epoch_of(now) - 1
  }

  /// Clamps `[start, end]` to `[first, _]` and caps its length at
  /// `batch_size`. A non-positive `batch_size` leaves the length alone. The
  /// result may be empty.
  pub fn trimmed_range(&self, start: i64, end: i64, batch_size: i64) -> EpochRange {
    let start = start.max(self.first);

    let end = if batch_size > 0 && end >= start + batch_size {
      start + batch_size - 1
    } else {
      end
    };

    EpochRange { start, end }
  }
}
