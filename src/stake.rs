use super::*;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingKind {
  Validator,
  Delegator,
}

impl StakingKind {
  /// Numeric code in the leaf encoding and the mirror contract's ABI.
  pub fn code(self) -> u8 {
    match self {
      Self::Validator => 0,
      Self::Delegator => 1,
    }
  }
}

/// A staking transaction as the attestation contracts see it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StakeData {
  pub tx_id: TxId,
  pub kind: StakingKind,
  pub input_address: Address,
  pub node_id: NodeId,
  pub start_time: u64,
  pub end_time: u64,
  pub weight: u64,
}

impl StakeData {
  /// Leaf hash under the attestation root: keccak256 of the ABI words
  /// `(txId, stakingType, inputAddress, nodeId, startTime, endTime, weight)`.
  pub fn leaf_hash(&self) -> [u8; 32] {
    keccak256(&ethers::abi::encode(&[
      Token::FixedBytes(self.tx_id.0.to_vec()),
      Token::Uint(self.kind.code().into()),
      Token::FixedBytes(self.input_address.0.to_vec()),
      Token::FixedBytes(self.node_id.0.to_vec()),
      Token::Uint(self.start_time.into()),
      Token::Uint(self.end_time.into()),
      Token::Uint(self.weight.into()),
    ]))
  }
}

/// A stored staking transaction joined with one of its funding addresses.
/// The same transaction appears once per distinct funding address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakeTx {
  pub tx_id: TxId,
  pub kind: StakingKind,
  pub node_id: NodeId,
  pub start_time: i64,
  pub end_time: i64,
  pub weight: u64,
  pub input_address: String,
  pub input_index: u32,
}

impl StakeTx {
  pub fn stake_data(&self, hrp: &str) -> Result<StakeData> {
    let input_address = Address::decode_expecting(&self.input_address, hrp)?;

    let window = |time: i64| {
      u64::try_from(time).map_err(|_| SnafuError::StakeTime { tx_id: self.tx_id })
    };

    Ok(StakeData {
      tx_id: self.tx_id,
      kind: self.kind,
      input_address,
      node_id: self.node_id,
      start_time: window(self.start_time)?,
      end_time: window(self.end_time)?,
      weight: self.weight,
    })
  }
}

/// Collapses to one entry per `(transaction, funding address)`, keeping the
/// smallest input index.
pub fn dedupe(stakes: Vec<StakeTx>) -> Vec<StakeTx> {
  let mut unique: BTreeMap<(TxId, String), StakeTx> = BTreeMap::new();

  for stake in stakes {
    let key = (stake.tx_id, stake.input_address.clone());
    match unique.get_mut(&key) {
      Some(existing) => {
        if stake.input_index < existing.input_index {
          *existing = stake;
        }
      }
      None => {
        unique.insert(key, stake);
      }
    }
  }

  unique.into_values().collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn stake_tx(tx_id: u8, address: &str, input_index: u32) -> StakeTx {
    StakeTx {
      tx_id: TxId([tx_id; 32]),
      kind: StakingKind::Delegator,
      node_id: NodeId([5; 20]),
      start_time: 1_000,
      end_time: 2_000,
      weight: 77,
      input_address: address.into(),
      input_index,
    }
  }

  #[test]
  fn kind_codes() {
    assert_eq!(StakingKind::Validator.code(), 0);
    assert_eq!(StakingKind::Delegator.code(), 1);
  }

  #[test]
  fn leaf_hash_packs_seven_padded_words() {
    let data = StakeData {
      tx_id: TxId([0xaa; 32]),
      kind: StakingKind::Delegator,
      input_address: Address([0xbb; 20]),
      node_id: NodeId([0xcc; 20]),
      start_time: 0x0102,
      end_time: 0x0304,
      weight: 0x0506,
    };

    let mut words = Vec::new();
    words.extend_from_slice(&[0xaa; 32]);

    let mut kind = [0; 32];
    kind[31] = 1;
    words.extend_from_slice(&kind);

    words.extend_from_slice(&[0xbb; 20]);
    words.extend_from_slice(&[0; 12]);
    words.extend_from_slice(&[0xcc; 20]);
    words.extend_from_slice(&[0; 12]);

    for value in [0x0102u64, 0x0304, 0x0506] {
      words.extend_from_slice(&[0; 24]);
      words.extend_from_slice(&value.to_be_bytes());
    }

    assert_eq!(words.len(), 224);
    assert_eq!(data.leaf_hash(), keccak256(&words));
  }

  #[test]
  fn leaf_hash_depends_on_every_field() {
    let base = StakeData {
      tx_id: TxId([1; 32]),
      kind: StakingKind::Validator,
      input_address: Address([2; 20]),
      node_id: NodeId([3; 20]),
      start_time: 10,
      end_time: 20,
      weight: 30,
    };

    let mut tweaked = base;
    tweaked.kind = StakingKind::Delegator;
    assert_ne!(base.leaf_hash(), tweaked.leaf_hash());

    let mut tweaked = base;
    tweaked.weight = 31;
    assert_ne!(base.leaf_hash(), tweaked.leaf_hash());
  }

  #[test]
  fn dedupe_keeps_smallest_input_index() {
    let deduped = dedupe(vec![
      stake_tx(1, "addr-a", 2),
      stake_tx(1, "addr-a", 0),
      stake_tx(1, "addr-a", 1),
      stake_tx(1, "addr-b", 3),
      stake_tx(2, "addr-a", 4),
    ]);

    assert_eq!(deduped.len(), 3);
    assert_eq!(deduped[0], stake_tx(1, "addr-a", 0));
    assert_eq!(deduped[1], stake_tx(1, "addr-b", 3));
    assert_eq!(deduped[2], stake_tx(2, "addr-a", 4));
  }

  #[test]
  fn stake_data_rejects_foreign_prefixes_and_negative_windows() {
    let address = Address([7; 20]).encode("pin").unwrap();

    let mut stake = stake_tx(1, &address, 0);
    assert_eq!(
      stake.stake_data("pin").unwrap().input_address,
      Address([7; 20])
    );
    assert!(stake.stake_data("tpin").is_err());

    stake.start_time = -5;
    assert_eq!(
      stake.stake_data("pin").unwrap_err().to_string(),
      format!(
        "staking window of transaction {} precedes the unix epoch",
        TxId([1; 32])
      )
    );
  }
}
