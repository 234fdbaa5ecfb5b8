use super::*;

/// Drives ingestion. Each tick fetches at most one batch of accepted
/// containers starting at the cursor, decodes and resolves them, and commits
/// rows and cursor atomically. A tick that finds nothing new still rewrites
/// the cursor so its `updated` field doubles as a liveness watermark.
pub struct Updater {
  batch_size: usize,
  chain: Chain,
  containers: Arc<dyn ContainerApi>,
  index: Arc<Index>,
  platform: Arc<dyn PlatformApi>,
  resolver: Resolver,
  start_index: u64,
}

impl Updater {
  pub fn new(
    chain: Chain,
    index: Arc<Index>,
    containers: Arc<dyn ContainerApi>,
    platform: Arc<dyn PlatformApi>,
    start_index: u64,
    batch_size: usize,
  ) -> Self {
    Self {
      batch_size: batch_size.max(1),
      chain,
      containers,
      index,
      platform,
      resolver: Resolver::new(chain),
      start_index,
    }
  }

  /// Ingests one batch, returning the number of containers processed. Zero
  /// means the index has caught up with the chain.
  pub fn tick(&mut self, now: DateTime<Utc>) -> Result<usize> {
    let state = self
      .index
      .state(INGEST_STATE)?
      .unwrap_or_else(State::genesis);

    let next = state.next_index.max(self.start_index);

    let Some(head) = self
      .containers
      .last_accepted()?
      .map(|container| container.index)
    else {
      self.heartbeat(next, state.last_chain_index, now)?;
      return Ok(0);
    };

    if head < next {
      self.heartbeat(next, head, now)?;
      return Ok(0);
    }

    let limit = usize::try_from(head - next + 1)?.min(self.batch_size);
    let containers = self.containers.container_range(next, limit)?;

    let Some(last) = containers.last() else {
      bail!("container range starting at {next} came back empty below head {head}");
    };

    let mut batch = Batch::new(self.chain, &self.index, &mut self.resolver, containers.len())?;
    for container in &containers {
      batch.add_container(container, &*self.platform)?;
    }
    batch.resolve(&*self.containers)?;

    self.index.commit_batch(
      batch.take(),
      State {
        next_index: last.index + 1,
        last_chain_index: head,
        updated: now.timestamp(),
      },
    )?;

    Ok(containers.len())
  }

  fn heartbeat(&self, next: u64, last_chain_index: u64, now: DateTime<Utc>) -> Result {
    self.index.set_state(
      INGEST_STATE,
      State {
        next_index: next,
        last_chain_index,
        updated: now.timestamp(),
      },
    )
  }

  /// Ticks until the cursor reaches the chain head or shutdown is requested.
  pub fn catch_up(&mut self) -> Result<usize> {
    let head = self
      .containers
      .last_accepted()?
      .map(|container| container.index);

    let progress_bar = if let Some(head) = head
      && !cfg!(test)
      && !log::log_enabled!(log::Level::Info)
    {
      let bar = ProgressBar::new(head + 1);
      bar.set_style(ProgressStyle::with_template(
        "[indexing containers] {wide_bar} {pos}/{len}",
      )?);
      bar.set_position(
        self
          .index
          .state(INGEST_STATE)?
          .map(|state| state.next_index)
          .unwrap_or_default(),
      );
      Some(bar)
    } else {
      None
    };

    let mut total = 0;
    loop {
      if SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
        break;
      }

      let processed = self.tick(Utc::now())?;
      if processed == 0 {
        break;
      }

      total += processed;
      if let Some(bar) = &progress_bar {
        bar.inc(processed as u64);
      }
    }

    if let Some(bar) = progress_bar {
      bar.finish_and_clear();
    }

    Ok(total)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct StubChain {
    containers: Vec<Container>,
  }

  impl StubChain {
    fn of_heights(heights: impl IntoIterator<Item = u64>) -> Self {
      Self {
        containers: heights
          .into_iter()
          .map(|height| {
            let block = Block::Commit { height };
            Container {
              id: TxId([u8::try_from(height).unwrap(); 32]),
              index: height,
              timestamp: i64::try_from(height).unwrap() * 10,
              bytes: block.to_bytes().unwrap(),
            }
          })
          .collect(),
      }
    }
  }

  impl ContainerApi for StubChain {
    fn last_accepted(&self) -> Result<Option<Container>> {
      Ok(self.containers.last().cloned())
    }

    fn container_range(&self, start: u64, limit: usize) -> Result<Vec<Container>> {
      Ok(
        self
          .containers
          .iter()
          .filter(|container| container.index >= start)
          .take(limit)
          .cloned()
          .collect(),
      )
    }

    fn container(&self, id: TxId) -> Result<Option<Container>> {
      Ok(
        self
          .containers
          .iter()
          .find(|container| container.id == id)
          .cloned(),
      )
    }
  }

  struct StubPlatform;

  impl PlatformApi for StubPlatform {
    fn reward_utxos(&self, _tx_id: TxId) -> Result<Vec<RewardUtxo>> {
      Ok(Vec::new())
    }

    fn current_validators(&self) -> Result<Vec<Validator>> {
      panic!("not used by ingestion");
    }
  }

  fn updater(
    heights: impl IntoIterator<Item = u64>,
    start: u64,
    batch: usize,
  ) -> (tempfile::TempDir, Updater) {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(Index::open(&dir.path().join("index.redb")).unwrap());
    let updater = Updater::new(
      Chain::Local,
      index,
      Arc::new(StubChain::of_heights(heights)),
      Arc::new(StubPlatform),
      start,
      batch,
    );
    (dir, updater)
  }

  #[test]
  fn ticks_advance_the_cursor_in_batches() {
    let (_dir, mut updater) = updater(0..3, 0, 2);

    assert_eq!(updater.tick(timestamp(100)).unwrap(), 2);
    let state = updater.index.state(INGEST_STATE).unwrap().unwrap();
    assert_eq!(state.next_index, 2);
    assert_eq!(state.last_chain_index, 2);
    assert_eq!(state.updated, 100);

    assert_eq!(updater.tick(timestamp(200)).unwrap(), 1);
    let state = updater.index.state(INGEST_STATE).unwrap().unwrap();
    assert_eq!(state.next_index, 3);

    assert_eq!(
      updater.index.block(1).unwrap().unwrap().kind,
      BlockKind::Commit,
    );
  }

  #[test]
  fn a_caught_up_tick_only_refreshes_the_heartbeat() {
    let (_dir, mut updater) = updater(0..2, 0, 10);

    assert_eq!(updater.tick(timestamp(100)).unwrap(), 2);
    assert_eq!(updater.tick(timestamp(250)).unwrap(), 0);

    let state = updater.index.state(INGEST_STATE).unwrap().unwrap();
    assert_eq!(state.next_index, 2);
    assert_eq!(state.last_chain_index, 1);
    assert_eq!(state.updated, 250);
  }

  #[test]
  fn ingestion_starts_at_the_configured_index() {
    let (_dir, mut updater) = updater(0..5, 3, 10);

    assert_eq!(updater.tick(timestamp(100)).unwrap(), 2);
    assert!(updater.index.block(2).unwrap().is_none());
    assert!(updater.index.block(3).unwrap().is_some());
  }

  #[test]
  fn an_empty_chain_still_heartbeats() {
    let (_dir, mut updater) = updater(0..0, 0, 10);

    assert_eq!(updater.tick(timestamp(42)).unwrap(), 0);
    let state = updater.index.state(INGEST_STATE).unwrap().unwrap();
    assert_eq!(state.updated, 42);
  }

  #[test]
  fn catch_up_processes_everything() {
    let (_dir, mut updater) = updater(0..25, 0, 4);

    assert_eq!(updater.catch_up().unwrap(), 25);
    assert_eq!(
      updater
        .index
        .state(INGEST_STATE)
        .unwrap()
        .unwrap()
        .next_index,
      25,
    );
  }
}
