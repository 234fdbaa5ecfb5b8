use super::*;

pub use {
  mirror::MirrorJob,
  uptime::{UptimeAggregator, UptimeCollector},
  voting::VotingJob,
};

mod mirror;
mod uptime;
mod voting;

/// A periodic attestation job. Each job runs on its own thread and ticks
/// strictly one at a time, so a slow tick delays the next instead of
/// overlapping it.
pub trait Job: Send {
  fn name(&self) -> &'static str;

  fn interval(&self) -> Duration;

  fn on_start(&mut self, _now: DateTime<Utc>) -> Result {
    Ok(())
  }

  fn tick(&mut self, now: DateTime<Utc>) -> Result;
}

/// Runs a job until shutdown. Tick failures are logged and the job keeps
/// going; a failed `on_start` retires the job. `jitter` spreads job wakeups
/// so they do not all hit the node at once.
pub fn spawn(mut job: Box<dyn Job>, jitter: Duration, clock: Clock) -> thread::JoinHandle<()> {
  thread::spawn(move || {
    if let Err(err) = job.on_start(clock.now()) {
      log::error!("{} failed to start: {err:#}", job.name());
      return;
    }

    while !SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
      if let Err(err) = job.tick(clock.now()) {
        log::error!("{} tick failed: {err:#}", job.name());
      }

      let deadline = Instant::now() + job.interval() + jitter.mul_f64(rand::random::<f64>());
      while Instant::now() < deadline {
        if SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
          return;
        }
        thread::sleep(Duration::from_millis(100));
      }
    }
  })
}

/// The deduped stake set of one epoch window and its Merkle tree. `stakes`
/// and `data` are parallel.
pub(crate) struct EpochStakes {
  pub(crate) stakes: Vec<StakeTx>,
  pub(crate) data: Vec<StakeData>,
  pub(crate) tree: MerkleTree,
}

impl EpochStakes {
  pub(crate) fn load(
    index: &Index,
    config: &EpochConfig,
    chain: Chain,
    epoch: i64,
  ) -> Result<Self> {
    let stakes = stake::dedupe(
      index.stakes_starting_in(config.start_of(epoch), config.end_of(epoch))?,
    );

    let data = stakes
      .iter()
      .map(|stake| stake.stake_data(chain.address_hrp()))
      .collect::<Result<Vec<StakeData>>>()?;

    let tree = MerkleTree::build(data.iter().map(StakeData::leaf_hash).collect());

    Ok(Self {
      stakes,
      data,
      tree,
    })
  }

  /// The root this epoch commits to: the tree root, or the zero-input
  /// sentinel when the window is empty.
  pub(crate) fn root(&self) -> [u8; 32] {
    self.tree.root().unwrap_or(*EMPTY_EPOCH_ROOT)
  }
}
