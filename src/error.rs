use super::*;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum SnafuError {
  #[snafu(display("Invalid chain `{chain}`"))]
  InvalidChain { chain: String },
  #[snafu(display("Invalid transaction id `{input}`"))]
  TxIdParse {
    input: String,
    source: hex::FromHexError,
  },
  #[snafu(display("Invalid node id `{input}`"))]
  NodeIdParse {
    input: String,
    source: hex::FromHexError,
  },
  #[snafu(display("Invalid address `{input}`"))]
  AddressParse {
    input: String,
    source: bech32::DecodeError,
  },
  #[snafu(display("Address `{input}` carries {length} bytes, expected 20"))]
  AddressLength { input: String, length: usize },
  #[snafu(display("Address `{input}` has prefix `{actual}`, expected `{expected}`"))]
  AddressHrp {
    input: String,
    actual: String,
    expected: String,
  },
  #[snafu(display("failed to decode container at height {height}: {source}"))]
  ContainerDecode {
    height: u64,
    source: ciborium::de::Error<io::Error>,
  },
  #[snafu(display("unable to fetch transactions with ids {tx_ids:?}"))]
  UnresolvedInputs { tx_ids: Vec<TxId> },
  #[snafu(display(
    "staking transaction {tx_id} has {count} rewards owner addresses, expected exactly 1"
  ))]
  RewardsOwner { tx_id: TxId, count: usize },
  #[snafu(display("output {index} of transaction {tx_id} has no addresses"))]
  OutputAddresses { tx_id: TxId, index: u32 },
  #[snafu(display(
    "stake output {index} of transaction {tx_id} has {count} addresses, expected exactly 1"
  ))]
  StakeOutputAddresses { tx_id: TxId, index: u32, count: usize },
  #[snafu(display("staking window of transaction {tx_id} precedes the unix epoch"))]
  StakeTime { tx_id: TxId },
  #[snafu(display(
    "merkle root mismatch for epoch {epoch}: got {local}, expected {onchain}"
  ))]
  RootMismatch {
    epoch: i64,
    local: String,
    onchain: String,
  },
  #[snafu(display("transaction {tx_id} has no credential at index {index}"))]
  CredentialIndex { tx_id: TxId, index: u32 },
  #[snafu(display("no credential of transaction {tx_id} signs for address {address}"))]
  CredentialMissing { tx_id: TxId, address: String },
}
