use super::*;

/// Votes each finished epoch's root once ingestion has fully covered it. The
/// vote may be the empty-window sentinel; abstaining would stall epochs that
/// simply had no stakes.
pub struct VotingJob {
  pub chain: Chain,
  pub config: EpochConfig,
  pub delay: TimeDelta,
  pub epoch_batch: i64,
  pub index: Arc<Index>,
  pub interval: Duration,
  pub voting: Arc<dyn VotingApi>,
}

impl VotingJob {
  fn cursor(&self) -> Result<i64> {
    Ok(match self.index.state(VOTING_STATE)? {
      Some(state) => i64::try_from(state.next_index)?,
      None => self.config.first(),
    })
  }
}

impl Job for VotingJob {
  fn name(&self) -> &'static str {
    "voting"
  }

  fn interval(&self) -> Duration {
    self.interval
  }

  fn tick(&mut self, now: DateTime<Utc>) -> Result {
    let ingest = self
      .index
      .state(INGEST_STATE)?
      .unwrap_or_else(State::genesis);

    let range = self.config.trimmed_range(
      self.cursor()?,
      self.config.last_finished(now),
      self.epoch_batch,
    );

    for epoch in range.iter() {
      if SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
        break;
      }

      // Voting on a window the index has not fully covered would commit to an
      // incomplete root. `delay` widens the margin for containers whose
      // acceptance the node reported late.
      if self.config.end_of(epoch) > ingest.updated_at() - self.delay
        || ingest.next_index <= ingest.last_chain_index
      {
        log::debug!("epoch {epoch} is not fully ingested yet");
        break;
      }

      let root = EpochStakes::load(&self.index, &self.config, self.chain, epoch)?.root();

      if self.voting.should_vote(epoch)? {
        self.voting.submit_vote(epoch, root)?;
        log::info!("voted {} for epoch {epoch}", hex::encode(root));
      } else {
        log::debug!("not eligible to vote for epoch {epoch}");
      }

      self
        .index
        .set_job_cursor(VOTING_STATE, u64::try_from(epoch + 1)?, now)?;
    }

    Ok(())
  }
}
