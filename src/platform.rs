//! Typed identifiers and the container model of the platform chain.

use super::*;

pub use {block::Block, transaction::*};

pub mod block;
pub mod transaction;

#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, DeserializeFromStr, SerializeDisplay)]
pub struct TxId(pub [u8; 32]);

impl Display for TxId {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", hex::encode(self.0))
  }
}

impl Debug for TxId {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{self}")
  }
}

impl FromStr for TxId {
  type Err = SnafuError;

  fn from_str(input: &str) -> Result<Self, Self::Err> {
    Ok(Self(
      <[u8; 32]>::from_hex(input).snafu_context(error::TxIdParse { input })?,
    ))
  }
}

#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd, DeserializeFromStr, SerializeDisplay)]
pub struct NodeId(pub [u8; 20]);

impl Display for NodeId {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", hex::encode(self.0))
  }
}

impl Debug for NodeId {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{self}")
  }
}

impl FromStr for NodeId {
  type Err = SnafuError;

  fn from_str(input: &str) -> Result<Self, Self::Err> {
    Ok(Self(
      <[u8; 20]>::from_hex(input).snafu_context(error::NodeIdParse { input })?,
    ))
  }
}

/// Raw form of a platform-chain address. Text rendering is bech32 and needs
/// the chain's human-readable prefix, so there is no context-free `Display`.
#[derive(Clone, Copy, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Address(pub [u8; 20]);

impl Address {
  pub fn from_public_key(key: &secp256k1::PublicKey) -> Self {
    let sha = Sha256::digest(key.serialize());
    Self(Ripemd160::digest(sha).into())
  }

  pub fn encode(&self, hrp: &str) -> Result<String> {
    Ok(bech32::encode::<bech32::Bech32>(
      bech32::Hrp::parse(hrp)?,
      &self.0,
    )?)
  }

  pub fn decode(input: &str) -> Result<(String, Self), SnafuError> {
    let (hrp, bytes) = bech32::decode(input).snafu_context(error::AddressParse { input })?;

    let length = bytes.len();
    let bytes = <[u8; 20]>::try_from(bytes).map_err(|_| SnafuError::AddressLength {
      input: input.to_string(),
      length,
    })?;

    Ok((hrp.to_lowercase(), Self(bytes)))
  }

  pub fn decode_expecting(input: &str, expected: &str) -> Result<Self, SnafuError> {
    let (actual, address) = Self::decode(input)?;

    if actual != expected {
      return Err(SnafuError::AddressHrp {
        input: input.to_string(),
        actual,
        expected: expected.to_string(),
      });
    }

    Ok(address)
  }
}

impl Debug for Address {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", hex::encode(self.0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tx_id_from_str() {
    #[track_caller]
    fn case(s: &str) {
      assert_eq!(s.parse::<TxId>().unwrap().to_string(), s);
    }

    case("0000000000000000000000000000000000000000000000000000000000000000");
    case("00fe00fe00fe00fe00fe00fe00fe00fe00fe00fe00fe00fe00fe00fe00fe00fe");

    assert_eq!(
      "zz".parse::<TxId>().unwrap_err().to_string(),
      "Invalid transaction id `zz`"
    );
    assert!("00ff".parse::<TxId>().is_err());
  }

  #[test]
  fn node_id_from_str() {
    let s = "00fe00fe00fe00fe00fe00fe00fe00fe00fe00fe";
    assert_eq!(s.parse::<NodeId>().unwrap().to_string(), s);
    assert!("0011".parse::<NodeId>().is_err());
  }

  #[test]
  fn tx_id_serde_is_textual() {
    let id = TxId([0xab; 32]);
    assert_eq!(
      serde_json::to_string(&id).unwrap(),
      format!("\"{}\"", "ab".repeat(32))
    );
    assert_eq!(
      serde_json::from_str::<TxId>(&format!("\"{}\"", "ab".repeat(32))).unwrap(),
      id
    );
  }

  #[test]
  fn address_round_trip() {
    let address = Address([7; 20]);
    let encoded = address.encode("pin").unwrap();
    assert!(encoded.starts_with("pin1"));

    let (hrp, decoded) = Address::decode(&encoded).unwrap();
    assert_eq!(hrp, "pin");
    assert_eq!(decoded, address);

    assert_eq!(Address::decode_expecting(&encoded, "pin").unwrap(), address);
    assert_eq!(
      Address::decode_expecting(&encoded, "tpin")
        .unwrap_err()
        .to_string(),
      format!("Address `{encoded}` has prefix `pin`, expected `tpin`"),
    );
  }

  #[test]
  fn address_rejects_garbage() {
    assert!(Address::decode("not bech32").is_err());
  }

  #[test]
  fn address_from_public_key_is_stable() {
    let key = secp256k1::SecretKey::from_slice(&[1; 32]).unwrap();
    let public = key.public_key(&SECP256K1);
    assert_eq!(
      Address::from_public_key(&public),
      Address::from_public_key(&public),
    );
  }
}
