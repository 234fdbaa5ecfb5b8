use super::*;

pub(crate) trait Entry: Sized {
  type Value;

  fn load(value: Self::Value) -> Self;

  fn store(self) -> Self::Value;
}

pub(super) type StateValue = (u64, u64, i64);

/// Job cursor. `next_index` is the next container or epoch to process,
/// `last_chain_index` the chain head seen on the last tick, `updated` the
/// unix time of the last write. Advances monotonically except through an
/// explicit administrative reset.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct State {
  pub next_index: u64,
  pub last_chain_index: u64,
  pub updated: i64,
}

impl State {
  pub(crate) fn genesis() -> Self {
    Self {
      next_index: 0,
      last_chain_index: 0,
      updated: 0,
    }
  }

  pub(crate) fn updated_at(&self) -> DateTime<Utc> {
    timestamp(self.updated)
  }
}

impl Entry for State {
  type Value = StateValue;

  fn load((next_index, last_chain_index, updated): Self::Value) -> Self {
    Self {
      next_index,
      last_chain_index,
      updated,
    }
  }

  fn store(self) -> Self::Value {
    (self.next_index, self.last_chain_index, self.updated)
  }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
  Proposal,
  Commit,
  Abort,
  Standard,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
  AddValidator,
  AddDelegator,
  AddSubnetValidator,
  RewardValidator,
  Import,
  Export,
  AdvanceTime,
  CreateChain,
  CreateSubnet,
}

impl TxKind {
  pub fn is_staking(self) -> bool {
    matches!(self, Self::AddValidator | Self::AddDelegator)
  }

  pub(crate) fn staking_kind(self) -> Option<StakingKind> {
    match self {
      Self::AddValidator => Some(StakingKind::Validator),
      Self::AddDelegator => Some(StakingKind::Delegator),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
  Transfer,
  Stake,
  Reward,
  Export,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
  Transfer,
  Import,
}

/// One row per container, including the transaction-less commit and abort
/// containers, which appear only here.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BlockRow {
  pub id: TxId,
  pub kind: BlockKind,
  pub height: u64,
  pub timestamp: i64,
  pub transactions: u32,
  #[serde_as(as = "Hex")]
  pub bytes: Vec<u8>,
}

/// One row per transaction. The staking fields are populated exactly when
/// `kind.is_staking()`.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TxRow {
  pub tx_id: TxId,
  pub kind: TxKind,
  pub block_id: TxId,
  pub block_kind: BlockKind,
  pub block_height: u64,
  pub timestamp: i64,
  pub chain_time: i64,
  #[serde_as(as = "Hex")]
  pub memo: Vec<u8>,
  #[serde_as(as = "Hex")]
  pub bytes: Vec<u8>,
  pub node_id: Option<NodeId>,
  pub start_time: Option<i64>,
  pub end_time: Option<i64>,
  pub weight: Option<u64>,
  pub rewards_owner: Option<String>,
  pub fee_percentage: Option<u32>,
  pub chain_id: Option<TxId>,
  pub reward_tx_id: Option<TxId>,
  pub new_chain_time: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct OutputRow {
  pub tx_id: TxId,
  pub index: u32,
  pub amount: u64,
  pub address: String,
  pub kind: OutputKind,
}

/// The address is absent until the resolver recovers it from the funding
/// output, and stays absent for imported inputs, whose funding lives on
/// another chain.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct InputRow {
  pub tx_id: TxId,
  pub index: u32,
  pub amount: u64,
  pub funding_tx_id: TxId,
  pub funding_index: u32,
  pub address: Option<String>,
  pub kind: InputKind,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UptimeStatus {
  Connected,
  Disconnected,
  Timeout,
  ServiceError,
  IndexerStarted,
}

impl Entry for UptimeStatus {
  type Value = i8;

  fn load(value: Self::Value) -> Self {
    match value {
      1 => Self::Connected,
      -1 => Self::Timeout,
      -2 => Self::ServiceError,
      -3 => Self::IndexerStarted,
      _ => Self::Disconnected,
    }
  }

  fn store(self) -> Self::Value {
    match self {
      Self::Connected => 1,
      Self::Disconnected => 0,
      Self::Timeout => -1,
      Self::ServiceError => -2,
      Self::IndexerStarted => -3,
    }
  }
}

/// Per-epoch, per-node uptime tally in seconds.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct UptimeAggregate {
  pub connected: i64,
  pub staked: i64,
}

impl Entry for UptimeAggregate {
  type Value = (i64, i64);

  fn load((connected, staked): Self::Value) -> Self {
    Self { connected, staked }
  }

  fn store(self) -> Self::Value {
    (self.connected, self.staked)
  }
}
