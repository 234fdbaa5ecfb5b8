use {
  super::*,
  ethers::{
    contract::{abigen, ContractError},
    core::types::{Bytes, H160, U256},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
  },
  tokio::runtime::Runtime,
};

abigen!(
  Voting,
  r#"[
    function getMerkleRoot(uint256 epoch) external view returns (bytes32)
    function shouldVote(uint256 epoch, address voter) external view returns (bool)
    function submitVote(uint256 epoch, bytes32 merkleRoot) external
    function firstEpochStartTs() external view returns (uint256)
    function epochDurationSec() external view returns (uint256)
  ]"#;

  Mirroring,
  r#"[
    struct PChainStake { bytes32 txId; uint8 stakingType; bytes20 inputAddress; bytes20 nodeId; uint64 startTime; uint64 endTime; uint64 weight }
    function mirrorStake(PChainStake stakeData, bytes32[] merkleProof) external
  ]"#;

  Binder,
  r#"[
    function registerPublicKey(bytes publicKey) external
    function pAddressToCAddress(bytes20 pAddress) external view returns (address)
  ]"#;
);

type EthClient = SignerMiddleware<Provider<Http>, LocalWallet>;

const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Synchronous facade over the attestation contracts. Mutating calls block
/// until the transaction is mined or `TRANSACTION_TIMEOUT` passes.
pub struct ContractClient {
  binder: Binder<EthClient>,
  from: H160,
  mirroring: Mirroring<EthClient>,
  runtime: Runtime,
  voting: Voting<EthClient>,
}

impl ContractClient {
  pub fn new(
    rpc_url: &str,
    private_key: &str,
    voting: &str,
    mirroring: &str,
    binder: &str,
  ) -> Result<Self> {
    let runtime = Runtime::new()?;

    let provider = Provider::<Http>::try_from(rpc_url)
      .with_context(|| format!("invalid rpc url `{rpc_url}`"))?;

    let chain_id = runtime
      .block_on(provider.get_chainid())
      .context("failed to fetch the chain id")?;

    let wallet = private_key
      .trim_start_matches("0x")
      .parse::<LocalWallet>()
      .context("invalid private key")?
      .with_chain_id(chain_id.as_u64());

    let from = wallet.address();
    let client = Arc::new(SignerMiddleware::new(provider, wallet));

    Ok(Self {
      binder: Binder::new(parse_contract_address(binder, "binder")?, client.clone()),
      from,
      mirroring: Mirroring::new(
        parse_contract_address(mirroring, "mirroring")?,
        client.clone(),
      ),
      runtime,
      voting: Voting::new(parse_contract_address(voting, "voting")?, client),
    })
  }
}

impl VotingApi for ContractClient {
  fn merkle_root(&self, epoch: i64) -> Result<[u8; 32]> {
    Ok(
      self
        .runtime
        .block_on(self.voting.get_merkle_root(epoch_ordinal(epoch)?).call())?,
    )
  }

  fn should_vote(&self, epoch: i64) -> Result<bool> {
    Ok(
      self.runtime.block_on(
        self
          .voting
          .should_vote(epoch_ordinal(epoch)?, self.from)
          .call(),
      )?,
    )
  }

  fn submit_vote(&self, epoch: i64, root: [u8; 32]) -> Result {
    let call = self.voting.submit_vote(epoch_ordinal(epoch)?, root);

    self.runtime.block_on(async {
      let pending = call.send().await?;
      confirmed(pending).await
    })
  }

  fn epoch_config(&self) -> Result<(i64, i64)> {
    let start = self
      .runtime
      .block_on(self.voting.first_epoch_start_ts().call())?;
    let duration = self
      .runtime
      .block_on(self.voting.epoch_duration_sec().call())?;

    Ok((to_unix(start)?, to_unix(duration)?))
  }
}

impl MirrorApi for ContractClient {
  fn mirror_stake(&self, stake: &StakeData, proof: &[[u8; 32]]) -> Result<MirrorOutcome> {
    let call = self
      .mirroring
      .mirror_stake(stake_struct(stake), proof.to_vec());

    self.runtime.block_on(async {
      match call.send().await {
        Ok(pending) => {
          confirmed(pending).await?;
          Ok(MirrorOutcome::Mirrored)
        }
        Err(err) => match revert_kind(&err) {
          Some(kind) => Ok(MirrorOutcome::Skipped(kind)),
          None => Err(err.into()),
        },
      }
    })
  }
}

impl BinderApi for ContractClient {
  fn is_registered(&self, address: Address) -> Result<bool> {
    let bound = self
      .runtime
      .block_on(self.binder.p_address_to_c_address(address.0).call())?;

    Ok(bound != H160::zero())
  }

  fn register_public_key(&self, key: &PublicKey) -> Result {
    let call = self
      .binder
      .register_public_key(Bytes::from(key.serialize_uncompressed().to_vec()));

    self.runtime.block_on(async {
      let pending = call.send().await?;
      confirmed(pending).await
    })
  }
}

fn stake_struct(stake: &StakeData) -> PChainStake {
  PChainStake {
    tx_id: stake.tx_id.0,
    staking_type: stake.kind.code(),
    input_address: stake.input_address.0,
    node_id: stake.node_id.0,
    start_time: stake.start_time,
    end_time: stake.end_time,
    weight: stake.weight,
  }
}

fn revert_kind(err: &ContractError<EthClient>) -> Option<RevertKind> {
  err
    .decode_revert::<String>()
    .as_deref()
    .and_then(RevertKind::classify)
}

async fn confirmed(pending: PendingTransaction<'_, Http>) -> Result {
  let receipt = tokio::time::timeout(TRANSACTION_TIMEOUT, pending)
    .await
    .context("transaction was not mined in time")??
    .context("transaction was dropped without a receipt")?;

  ensure!(
    receipt.status == Some(1.into()),
    "transaction {} reverted on chain",
    receipt.transaction_hash,
  );

  Ok(())
}

fn parse_contract_address(address: &str, name: &str) -> Result<H160> {
  address
    .trim_start_matches("0x")
    .parse::<H160>()
    .map_err(|err| anyhow!("invalid {name} contract address `{address}`: {err}"))
}

fn epoch_ordinal(epoch: i64) -> Result<U256> {
  Ok(U256::from(
    u64::try_from(epoch).with_context(|| format!("epoch {epoch} precedes the first epoch"))?,
  ))
}

fn to_unix(value: U256) -> Result<i64> {
  ensure!(value.bits() <= 63, "{value} does not fit in a unix timestamp");
  Ok(i64::try_from(value.low_u64())?)
}
