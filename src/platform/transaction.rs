use super::*;

/// Closed union of the transactions the chain can carry. Decoding bytes that
/// describe any other payload fails, which is what marks a container as
/// unindexable.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transaction {
  AddValidator(AddValidator),
  AddDelegator(AddDelegator),
  AddSubnetValidator(AddSubnetValidator),
  CreateChain { base: BaseTx, name: String },
  CreateSubnet { base: BaseTx },
  Import(Import),
  Export(Export),
  AdvanceTime { time: i64 },
  RewardValidator { staking_tx_id: TxId },
}

impl Transaction {
  pub fn base(&self) -> Option<&BaseTx> {
    match self {
      Self::AddValidator(tx) => Some(&tx.base),
      Self::AddDelegator(tx) => Some(&tx.base),
      Self::AddSubnetValidator(tx) => Some(&tx.base),
      Self::CreateChain { base, .. } | Self::CreateSubnet { base } => Some(base),
      Self::Import(tx) => Some(&tx.base),
      Self::Export(tx) => Some(&tx.base),
      Self::AdvanceTime { .. } | Self::RewardValidator { .. } => None,
    }
  }

  /// Digest that credentials sign: SHA-256 of the serialized transaction.
  pub fn signing_hash(&self) -> Result<[u8; 32]> {
    let mut bytes = Vec::new();
    ciborium::into_writer(self, &mut bytes)?;
    Ok(Sha256::digest(&bytes).into())
  }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct BaseTx {
  pub outputs: Vec<TransferOutput>,
  pub inputs: Vec<TransferInput>,
  #[serde_as(as = "Hex")]
  pub memo: Vec<u8>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TransferOutput {
  pub amount: u64,
  pub addresses: Vec<Address>,
}

/// Reference to the funding output. The funded address is not part of the
/// wire format; the resolver recovers it from the referenced output.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TransferInput {
  pub tx_id: TxId,
  pub output_index: u32,
  pub amount: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AddValidator {
  pub base: BaseTx,
  pub node_id: NodeId,
  pub start_time: i64,
  pub end_time: i64,
  pub weight: u64,
  pub stake: Vec<TransferOutput>,
  pub rewards_owner: Vec<Address>,
  pub shares: u32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AddDelegator {
  pub base: BaseTx,
  pub node_id: NodeId,
  pub start_time: i64,
  pub end_time: i64,
  pub weight: u64,
  pub stake: Vec<TransferOutput>,
  pub rewards_owner: Vec<Address>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AddSubnetValidator {
  pub base: BaseTx,
  pub node_id: NodeId,
  pub start_time: i64,
  pub end_time: i64,
  pub weight: u64,
  pub subnet: TxId,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Import {
  pub base: BaseTx,
  pub source_chain: TxId,
  pub imported_inputs: Vec<TransferInput>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Export {
  pub base: BaseTx,
  pub destination_chain: TxId,
  pub exported_outputs: Vec<TransferOutput>,
}

/// One credential per transaction input, holding recoverable signatures over
/// the unsigned transaction's signing hash.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Credential {
  #[serde_as(as = "Vec<Hex>")]
  pub signatures: Vec<[u8; 65]>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SignedTransaction {
  pub transaction: Transaction,
  pub credentials: Vec<Credential>,
}

impl SignedTransaction {
  pub fn to_bytes(&self) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(self, &mut bytes)?;
    Ok(bytes)
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
    Ok(ciborium::from_reader(bytes)?)
  }

  /// A transaction's id is the SHA-256 digest of its signed serialization.
  pub fn id(&self) -> Result<TxId> {
    Ok(TxId(Sha256::digest(self.to_bytes()?).into()))
  }

  /// Public keys recovered from the credential at `index`, in signature
  /// order.
  pub fn credential_keys(&self, index: u32) -> Result<Vec<PublicKey>> {
    let Some(credential) = self.credentials.get(usize::try_from(index)?) else {
      return Err(
        SnafuError::CredentialIndex {
          tx_id: self.id()?,
          index,
        }
        .into(),
      );
    };

    let message = Message::from_digest(self.transaction.signing_hash()?);

    credential
      .signatures
      .iter()
      .map(|signature| {
        let recovery = RecoveryId::from_i32(i32::from(signature[64]))?;
        let signature = RecoverableSignature::from_compact(&signature[..64], recovery)?;
        Ok(SECP256K1.recover_ecdsa(&message, &signature)?)
      })
      .collect()
  }

  /// The recovered key in credential `index` that controls `address`.
  pub fn key_for_address(&self, index: u32, address: Address) -> Result<PublicKey> {
    for key in self.credential_keys(index)? {
      if Address::from_public_key(&key) == address {
        return Ok(key);
      }
    }

    Err(
      SnafuError::CredentialMissing {
        tx_id: self.id()?,
        address: hex::encode(address.0),
      }
      .into(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(fill: u8) -> secp256k1::SecretKey {
    secp256k1::SecretKey::from_slice(&[fill; 32]).unwrap()
  }

  fn delegation(owner: Address) -> Transaction {
    Transaction::AddDelegator(AddDelegator {
      base: BaseTx {
        outputs: Vec::new(),
        inputs: vec![TransferInput {
          tx_id: TxId([9; 32]),
          output_index: 0,
          amount: 50,
        }],
        memo: b"hi".to_vec(),
      },
      node_id: NodeId([4; 20]),
      start_time: 1_700_000_000,
      end_time: 1_700_100_000,
      weight: 50,
      stake: vec![TransferOutput {
        amount: 50,
        addresses: vec![owner],
      }],
      rewards_owner: vec![owner],
    })
  }

  fn sign(transaction: Transaction, keys: &[secp256k1::SecretKey]) -> SignedTransaction {
    let message = Message::from_digest(transaction.signing_hash().unwrap());

    let signatures = keys
      .iter()
      .map(|key| {
        let (recovery, compact) = SECP256K1
          .sign_ecdsa_recoverable(&message, key)
          .serialize_compact();
        let mut signature = [0; 65];
        signature[..64].copy_from_slice(&compact);
        signature[64] = u8::try_from(recovery.to_i32()).unwrap();
        signature
      })
      .collect();

    SignedTransaction {
      transaction,
      credentials: vec![Credential { signatures }],
    }
  }

  #[test]
  fn round_trip_and_stable_id() {
    let owner = Address::from_public_key(&key(1).public_key(&SECP256K1));
    let signed = sign(delegation(owner), &[key(1)]);

    let bytes = signed.to_bytes().unwrap();
    let decoded = SignedTransaction::from_bytes(&bytes).unwrap();
    assert_eq!(decoded, signed);
    assert_eq!(decoded.id().unwrap(), signed.id().unwrap());

    let other = sign(
      Transaction::AdvanceTime {
        time: 1_700_000_000,
      },
      &[key(1)],
    );
    assert_ne!(other.id().unwrap(), signed.id().unwrap());
  }

  #[test]
  fn recovered_key_controls_the_signing_address() {
    let secret = key(2);
    let owner = Address::from_public_key(&secret.public_key(&SECP256K1));
    let signed = sign(delegation(owner), &[secret]);

    let keys = signed.credential_keys(0).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(Address::from_public_key(&keys[0]), owner);

    assert_eq!(
      signed.key_for_address(0, owner).unwrap(),
      secret.public_key(&SECP256K1)
    );
  }

  #[test]
  fn missing_credentials_are_reported() {
    let owner = Address::from_public_key(&key(3).public_key(&SECP256K1));
    let signed = sign(delegation(owner), &[key(3)]);

    assert!(
      signed
        .credential_keys(7)
        .unwrap_err()
        .to_string()
        .contains("no credential at index 7")
    );

    let stranger = Address([0; 20]);
    assert!(
      signed
        .key_for_address(0, stranger)
        .unwrap_err()
        .to_string()
        .contains("signs for address")
    );
  }

  #[test]
  fn memo_is_rendered_as_hex() {
    let base = BaseTx {
      outputs: Vec::new(),
      inputs: Vec::new(),
      memo: vec![0xde, 0xad],
    };

    assert_eq!(
      serde_json::to_string(&base).unwrap(),
      r#"{"outputs":[],"inputs":[],"memo":"dead"}"#
    );
  }
}
