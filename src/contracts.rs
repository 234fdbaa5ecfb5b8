use super::*;

pub use client::ContractClient;

mod client;

pub trait VotingApi: Send + Sync {
  /// The root recorded on chain for `epoch`, all zeros while unset.
  fn merkle_root(&self, epoch: i64) -> Result<[u8; 32]>;

  fn should_vote(&self, epoch: i64) -> Result<bool>;

  fn submit_vote(&self, epoch: i64, root: [u8; 32]) -> Result;

  /// `(first_epoch_start_ts, epoch_duration_sec)` as configured on chain.
  fn epoch_config(&self) -> Result<(i64, i64)>;
}

pub trait MirrorApi: Send + Sync {
  fn mirror_stake(&self, stake: &StakeData, proof: &[[u8; 32]]) -> Result<MirrorOutcome>;
}

pub trait BinderApi: Send + Sync {
  /// Whether the platform address is already bound to an account.
  fn is_registered(&self, address: Address) -> Result<bool>;

  fn register_public_key(&self, key: &PublicKey) -> Result;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MirrorOutcome {
  Mirrored,
  Skipped(RevertKind),
}

/// Reverts that report a stake the contracts have already settled or will
/// never accept, rather than a fault of ours. Ticks log these and move on.
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, PartialEq)]
pub enum RevertKind {
  #[display("transaction already mirrored")]
  AlreadyMirrored,
  #[display("staking already ended")]
  StakingEnded,
  #[display("unknown staking address")]
  UnknownStakingAddress,
  #[display("staking data invalid")]
  InvalidStakingData,
  #[display("Max node ids exceeded")]
  NodeIdsExceeded,
}

impl RevertKind {
  pub fn classify(message: &str) -> Option<Self> {
    [
      Self::AlreadyMirrored,
      Self::StakingEnded,
      Self::UnknownStakingAddress,
      Self::InvalidStakingData,
      Self::NodeIdsExceeded,
    ]
    .into_iter()
    .find(|kind| message.contains(&kind.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn revert_messages_classify_by_substring() {
    assert_eq!(
      RevertKind::classify("execution reverted: transaction already mirrored"),
      Some(RevertKind::AlreadyMirrored),
    );
    assert_eq!(
      RevertKind::classify("staking already ended"),
      Some(RevertKind::StakingEnded),
    );
    assert_eq!(
      RevertKind::classify("execution reverted: unknown staking address"),
      Some(RevertKind::UnknownStakingAddress),
    );
    assert_eq!(
      RevertKind::classify("staking data invalid"),
      Some(RevertKind::InvalidStakingData),
    );
    assert_eq!(
      RevertKind::classify("execution reverted: Max node ids exceeded"),
      Some(RevertKind::NodeIdsExceeded),
    );
  }

  #[test]
  fn unknown_reverts_do_not_classify() {
    assert_eq!(RevertKind::classify("execution reverted: paused"), None);
    assert_eq!(RevertKind::classify("max node ids exceeded"), None);
  }
}
