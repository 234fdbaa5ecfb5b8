use super::*;

/// Rows under this node id mark collector lifecycle events rather than
/// validator probes. No real validator has the all-zero id.
pub(crate) const MARKER_NODE: NodeId = NodeId([0; 20]);

/// Samples validator connectivity from the node on every tick. Failures are
/// recorded as marker rows so the aggregator can tell "the validator was
/// down" from "the collector could not ask".
pub struct UptimeCollector {
  pub index: Arc<Index>,
  pub interval: Duration,
  pub platform: Arc<dyn PlatformApi>,
}

impl Job for UptimeCollector {
  fn name(&self) -> &'static str {
    "uptime-collector"
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn on_start(&mut self, now: DateTime<Utc>) -> Result {
    self.index.insert_uptimes(&[(
      MARKER_NODE,
      now.timestamp(),
      UptimeStatus::IndexerStarted,
    )])
  }

  fn tick(&mut self, now: DateTime<Utc>) -> Result {
    match self.platform.current_validators() {
      Ok(validators) => {
        let time = now.timestamp();

        let probes = validators
          .iter()
          .map(|validator| {
            (
              validator.node_id,
              time,
              if validator.connected {
                UptimeStatus::Connected
              } else {
                UptimeStatus::Disconnected
              },
            )
          })
          .collect::<Vec<(NodeId, i64, UptimeStatus)>>();

        self.index.insert_uptimes(&probes)?;

        log::debug!("recorded {} validator probes", probes.len());

        Ok(())
      }
      Err(err) => {
        let status = if is_timeout(&err) {
          UptimeStatus::Timeout
        } else {
          UptimeStatus::ServiceError
        };

        self
          .index
          .insert_uptimes(&[(MARKER_NODE, now.timestamp(), status)])?;

        Err(err)
      }
    }
  }
}

fn is_timeout(err: &Error) -> bool {
  err.chain().any(|cause| {
    cause
      .downcast_ref::<reqwest::Error>()
      .is_some_and(reqwest::Error::is_timeout)
  })
}

/// Folds raw probes into per-epoch, per-validator connected seconds. Epochs
/// are aggregated once; the cursor is the aggregates table itself, so a
/// restart resumes after the last epoch written.
pub struct UptimeAggregator {
  pub config: EpochConfig,
  pub epoch_batch: i64,
  pub index: Arc<Index>,
  pub interval: Duration,
  pub last_aggregated: Option<i64>,
  pub retention: Duration,
}

impl UptimeAggregator {
  fn cursor(&self) -> Result<i64> {
    if let Some(epoch) = self.last_aggregated {
      return Ok(epoch + 1);
    }

    Ok(match self.index.last_aggregated_epoch()? {
      Some(epoch) => epoch + 1,
      None => self.config.first(),
    })
  }

  fn aggregate_epoch(&self, epoch: i64) -> Result {
    let from = self.config.start_of(epoch);
    let to = self.config.end_of(epoch);

    let mut totals = BTreeMap::<NodeId, UptimeAggregate>::new();

    for (node_id, start, end) in self.index.validators_overlapping(from, to)? {
      let clip_start = start.max(from.timestamp());
      let clip_end = end.min(to.timestamp());

      if clip_start >= clip_end {
        continue;
      }

      let probes = self.index.uptimes_between(node_id, clip_start, clip_end)?;

      let total = totals.entry(node_id).or_default();

      total.connected += connected_seconds(&probes, clip_start, clip_end);
      total.staked += clip_end - clip_start;
    }

    let rows = totals.into_iter().collect::<Vec<(NodeId, UptimeAggregate)>>();

    self.index.insert_aggregates(epoch, &rows)?;

    log::info!(
      "aggregated uptime for epoch {epoch} across {} validators",
      rows.len()
    );

    Ok(())
  }
}

impl Job for UptimeAggregator {
  fn name(&self) -> &'static str {
    "uptime-aggregator"
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn tick(&mut self, now: DateTime<Utc>) -> Result {
    let range = self.config.trimmed_range(
      self.cursor()?,
      self.config.last_finished(now),
      self.epoch_batch,
    );

    let mut aggregated = false;

    for epoch in range.iter() {
      if SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
        break;
      }

      self.aggregate_epoch(epoch)?;

      self.last_aggregated = Some(epoch);
      aggregated = true;
    }

    if aggregated {
      let cutoff = (now - TimeDelta::from_std(self.retention)?).timestamp();

      let pruned = self.index.prune_uptimes_before(cutoff)?;

      if pruned > 0 {
        log::debug!("pruned {pruned} probes past the retention window");
      }
    }

    Ok(())
  }
}

/// Connected seconds within `[start, end]` given a validator's probes in
/// time order. Each probe's status covers the stretch leading up to it; the
/// stretch after the last probe counts as connected, as does the whole
/// interval when there are no probes at all.
fn connected_seconds(probes: &[(i64, UptimeStatus)], start: i64, end: i64) -> i64 {
  let mut connected = 0;
  let mut prev = start;

  for (time, status) in probes {
    if *status != UptimeStatus::Disconnected {
      connected += time - prev;
    }

    prev = *time;
  }

  connected + (end - prev)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn an_unprobed_window_counts_as_connected() {
    assert_eq!(connected_seconds(&[], 0, 100), 100);
  }

  #[test]
  fn connected_probes_cover_the_whole_window() {
    assert_eq!(
      connected_seconds(
        &[(30, UptimeStatus::Connected), (60, UptimeStatus::Connected)],
        0,
        100,
      ),
      100,
    );
  }

  #[test]
  fn a_disconnected_probe_discounts_the_stretch_before_it() {
    assert_eq!(
      connected_seconds(
        &[
          (40, UptimeStatus::Disconnected),
          (70, UptimeStatus::Connected),
        ],
        0,
        100,
      ),
      60,
    );
  }

  #[test]
  fn a_trailing_disconnect_still_credits_the_tail() {
    assert_eq!(
      connected_seconds(&[(90, UptimeStatus::Disconnected)], 0, 100),
      10,
    );
  }
}
