use super::*;

/// Replays finished epochs onto the mirror contract. An epoch is only
/// processed once its root is confirmed on chain, and the locally built tree
/// must reproduce that root before any stake from it is submitted.
pub struct MirrorJob {
  pub binder: Arc<dyn BinderApi>,
  pub chain: Chain,
  pub config: EpochConfig,
  pub epoch_batch: i64,
  pub index: Arc<Index>,
  pub interval: Duration,
  pub mirror: Arc<dyn MirrorApi>,
  pub registered: HashSet<Address>,
  pub voting: Arc<dyn VotingApi>,
}

impl MirrorJob {
  fn cursor(&self) -> Result<i64> {
    Ok(match self.index.state(MIRROR_STATE)? {
      Some(state) => i64::try_from(state.next_index)?,
      None => self.config.first(),
    })
  }

  /// Mirrors one epoch. Returns false when the epoch's root is not yet
  /// confirmed on chain, which also stalls every later epoch.
  fn mirror_epoch(&mut self, epoch: i64) -> Result<bool> {
    let onchain = self.voting.merkle_root(epoch)?;

    if onchain == [0; 32] {
      log::debug!("epoch {epoch} has no confirmed root yet");
      return Ok(false);
    }

    let stakes = EpochStakes::load(&self.index, &self.config, self.chain, epoch)?;

    let local = stakes.root();

    if local != onchain {
      return Err(
        SnafuError::RootMismatch {
          epoch,
          local: hex::encode(local),
          onchain: hex::encode(onchain),
        }
        .into(),
      );
    }

    for (stake, data) in stakes.stakes.iter().zip(&stakes.data) {
      // A stake whose address has no bound key cannot be credited, but the
      // mirror call itself does not depend on the binding.
      if let Err(err) = self.register(stake, data) {
        log::error!(
          "failed to register public key for {}: {err:#}",
          stake.input_address
        );
      }

      let proof = stakes
        .tree
        .proof(&data.leaf_hash())
        .context("stake leaf missing from its own tree")?;

      match self.mirror.mirror_stake(data, &proof)? {
        MirrorOutcome::Mirrored => {
          log::info!("mirrored stake {} for node {}", stake.tx_id, data.node_id);
        }
        MirrorOutcome::Skipped(kind) => {
          log::info!("stake {} skipped: {kind}", stake.tx_id);
        }
      }
    }

    log::info!("mirrored epoch {epoch} with {} stakes", stakes.stakes.len());

    Ok(true)
  }

  /// Binds the stake's input address to its public key, recovered from the
  /// credential that signed the staking transaction. Addresses already bound,
  /// here or on chain, are skipped.
  fn register(&mut self, stake: &StakeTx, data: &StakeData) -> Result {
    if self.registered.contains(&data.input_address) {
      return Ok(());
    }

    if self.binder.is_registered(data.input_address)? {
      self.registered.insert(data.input_address);
      return Ok(());
    }

    let row = self
      .index
      .transaction(stake.tx_id)?
      .with_context(|| format!("staking transaction {} is not in the index", stake.tx_id))?;

    let signed = SignedTransaction::from_bytes(&row.bytes)?;

    let key = signed.key_for_address(stake.input_index, data.input_address)?;

    self.binder.register_public_key(&key)?;

    self.registered.insert(data.input_address);

    log::info!("registered public key for {}", stake.input_address);

    Ok(())
  }
}

impl Job for MirrorJob {
  fn name(&self) -> &'static str {
    "mirror"
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

    for epoch in range.iter() {
      if SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
        break;
      }

      if !self.mirror_epoch(epoch)? {
        break;
      }

      self
        .index
        .set_job_cursor(MIRROR_STATE, u64::try_from(epoch + 1)?, now)?;
    }

    Ok(())
  }
}
