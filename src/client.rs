use {super::*, serde::de::DeserializeOwned};

/// An accepted container as served by the node's index API. `bytes` holds the
/// CBOR encoding of a block, except for containers fetched by transaction id,
/// which hold a single signed transaction.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Container {
  pub id: TxId,
  pub index: u64,
  pub timestamp: i64,
  #[serde_as(as = "Hex")]
  pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RewardUtxo {
  pub tx_id: TxId,
  pub index: u32,
  pub amount: u64,
  pub addresses: Vec<Address>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Validator {
  pub node_id: NodeId,
  pub connected: bool,
}

pub trait ContainerApi: Send + Sync {
  fn last_accepted(&self) -> Result<Option<Container>>;

  /// At most `limit` containers starting at index `start`, in index order.
  fn container_range(&self, start: u64, limit: usize) -> Result<Vec<Container>>;

  /// The container holding the transaction `id`, or `None` if the node does
  /// not know it.
  fn container(&self, id: TxId) -> Result<Option<Container>>;
}

pub trait PlatformApi: Send + Sync {
  /// UTXOs minted as staking rewards of `tx_id`. Empty until the stake ends.
  fn reward_utxos(&self, tx_id: TxId) -> Result<Vec<RewardUtxo>>;

  fn current_validators(&self) -> Result<Vec<Validator>>;
}

#[derive(Deserialize)]
struct RpcError {
  code: i64,
  message: String,
}

impl Display for RpcError {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "rpc error {}: {}", self.code, self.message)
  }
}

#[derive(Deserialize)]
struct RpcResponse {
  #[serde(default)]
  result: serde_json::Value,
  error: Option<RpcError>,
}

struct Rpc {
  endpoint: String,
  http: reqwest::blocking::Client,
}

impl Rpc {
  fn new(node_url: &str, path: &str) -> Result<Self> {
    Ok(Self {
      endpoint: format!("{}{path}", node_url.trim_end_matches('/')),
      http: reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?,
    })
  }

  fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> Result<T> {
    let body = serde_json::json!({
      "jsonrpc": "2.0",
      "id": 0,
      "method": method,
      "params": params,
    });

    let mut errors = 0;
    let response = loop {
      match self.post(&body) {
        Ok(response) => break response,
        Err(err) => {
          errors += 1;
          let seconds = 1 << errors;
          if seconds > 120 {
            return Err(Error::from(err))
              .with_context(|| format!("{method} failed after repeated attempts"));
          }
          log::warn!("{method} failed, retrying in {seconds}s: {err}");
          thread::sleep(Duration::from_secs(seconds));
        }
      }
    };

    let response = response
      .json::<RpcResponse>()
      .with_context(|| format!("{method} returned an undecodable response"))?;

    if let Some(error) = response.error {
      bail!("{method} failed: {error}");
    }

    serde_json::from_value(response.result)
      .with_context(|| format!("{method} returned an undecodable result"))
  }

  fn post(&self, body: &serde_json::Value) -> reqwest::Result<reqwest::blocking::Response> {
    self
      .http
      .post(&self.endpoint)
      .json(body)
      .send()?
      .error_for_status()
  }
}

/// Client of the node's accepted-container index.
pub struct IndexClient {
  rpc: Rpc,
}

impl IndexClient {
  pub fn new(node_url: &str) -> Result<Self> {
    Ok(Self {
      rpc: Rpc::new(node_url, "/ext/index/block")?,
    })
  }
}

impl ContainerApi for IndexClient {
  fn last_accepted(&self) -> Result<Option<Container>> {
    self
      .rpc
      .call("index.lastAccepted", serde_json::json!({}))
  }

  fn container_range(&self, start: u64, limit: usize) -> Result<Vec<Container>> {
    self.rpc.call(
      "index.getContainerRange",
      serde_json::json!({
        "start_index": start,
        "num_to_fetch": limit,
      }),
    )
  }

  fn container(&self, id: TxId) -> Result<Option<Container>> {
    self
      .rpc
      .call("index.getContainerByID", serde_json::json!({ "id": id }))
  }
}

/// Client of the platform chain API proper, for state the containers alone
/// cannot provide.
pub struct PlatformClient {
  rpc: Rpc,
}

impl PlatformClient {
  pub fn new(node_url: &str) -> Result<Self> {
    Ok(Self {
      rpc: Rpc::new(node_url, "/ext/chain")?,
    })
  }
}

impl PlatformApi for PlatformClient {
  fn reward_utxos(&self, tx_id: TxId) -> Result<Vec<RewardUtxo>> {
    self
      .rpc
      .call("platform.getRewardUtxos", serde_json::json!({ "tx_id": tx_id }))
  }

  fn current_validators(&self) -> Result<Vec<Validator>> {
    self
      .rpc
      .call("platform.getCurrentValidators", serde_json::json!({}))
  }
}
