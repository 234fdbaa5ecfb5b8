use super::*;

/// A container as decoded from the bytes delivered by the indexer API. The
/// union is closed: bytes that decode to anything else are a hard error at
/// the height they arrived from.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
  Proposal {
    height: u64,
    transaction: SignedTransaction,
  },
  Commit {
    height: u64,
  },
  Abort {
    height: u64,
  },
  Standard {
    height: u64,
    transactions: Vec<SignedTransaction>,
  },
}

impl Block {
  pub fn decode(bytes: &[u8], height: u64) -> Result<Self, SnafuError> {
    ciborium::from_reader(bytes).snafu_context(error::ContainerDecode { height })
  }

  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(self, &mut bytes)?;
    Ok(bytes)
  }

  pub fn height(&self) -> u64 {
    match self {
      Self::Proposal { height, .. }
      | Self::Commit { height }
      | Self::Abort { height }
      | Self::Standard { height, .. } => *height,
    }
  }

  pub fn transactions(&self) -> &[SignedTransaction] {
    match self {
      Self::Proposal { transaction, .. } => slice::from_ref(transaction),
      Self::Commit { .. } | Self::Abort { .. } => &[],
      Self::Standard { transactions, .. } => transactions,
    }
  }
}
