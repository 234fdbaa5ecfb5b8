use super::*;

/// Closed range of epoch indices. `end < start` means there is nothing to do.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EpochRange {
  pub start: i64,
  pub end: i64,
}

impl EpochRange {
  pub fn is_empty(&self) -> bool {
    self.end < self.start
  }

  pub fn len(&self) -> u64 {
    if self.is_empty() {
      0
    } else {
      self.end.abs_diff(self.start) + 1
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = i64> + use<> {
    self.start..=self.end
  }
}

impl Display for EpochRange {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "[{}, {}]", self.start, self.end)
  }
}
