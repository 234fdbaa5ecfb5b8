use {super::*, serde_with::DurationSeconds};

/// Layered configuration: command-line options (with their `PIN_`-prefixed
/// environment fallbacks) beat the YAML config file, which beats built-in
/// defaults. Unset fields stay `None` until an accessor resolves them.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
  batch_size: Option<usize>,
  binder_contract: Option<String>,
  chain: Option<Chain>,
  data_dir: Option<PathBuf>,
  epoch_batch: Option<i64>,
  epoch_period: Option<i64>,
  epoch_start: Option<i64>,
  first_epoch: Option<i64>,
  #[serde_as(as = "Option<DurationSeconds<u64>>")]
  job_interval: Option<Duration>,
  mirroring_contract: Option<String>,
  no_mirror: bool,
  no_uptime: bool,
  no_voting: bool,
  node_url: Option<String>,
  #[serde_as(as = "Option<DurationSeconds<u64>>")]
  poll_interval: Option<Duration>,
  private_key: Option<String>,
  rpc_url: Option<String>,
  start_index: Option<u64>,
  #[serde_as(as = "Option<DurationSeconds<u64>>")]
  uptime_retention: Option<Duration>,
  voting_contract: Option<String>,
  #[serde_as(as = "Option<DurationSeconds<u64>>")]
  voting_delay: Option<Duration>,
}

impl Settings {
  pub fn load(options: Options) -> Result<Settings> {
    let config = options.config.clone();

    let overrides = Settings::from_options(options);

    let path = match config {
      Some(path) => Some(path),
      None => {
        let path = overrides.data_dir()?.join("pin.yaml");
        path.exists().then_some(path)
      }
    };

    let config = match path {
      Some(path) => serde_yaml::from_reader(
        fs::File::open(&path)
          .with_context(|| format!("failed to open config file `{}`", path.display()))?,
      )
      .with_context(|| format!("failed to deserialize config file `{}`", path.display()))?,
      None => Settings::default(),
    };

    Ok(overrides.or(config))
  }

  fn from_options(options: Options) -> Settings {
    Settings {
      batch_size: options.batch_size,
      binder_contract: options.binder_contract,
      chain: options.chain_argument,
      data_dir: options.data_dir,
      epoch_batch: options.epoch_batch,
      epoch_period: options.epoch_period,
      epoch_start: options.epoch_start,
      first_epoch: options.first_epoch,
      job_interval: options.job_interval.map(Into::into),
      mirroring_contract: options.mirroring_contract,
      no_mirror: options.no_mirror,
      no_uptime: options.no_uptime,
      no_voting: options.no_voting,
      node_url: options.node_url,
      poll_interval: options.poll_interval.map(Into::into),
      private_key: options.private_key,
      rpc_url: options.rpc_url,
      start_index: options.start_index,
      uptime_retention: options.uptime_retention.map(Into::into),
      voting_contract: options.voting_contract,
      voting_delay: options.voting_delay.map(Into::into),
    }
  }

  fn or(self, source: Settings) -> Settings {
    Settings {
      batch_size: self.batch_size.or(source.batch_size),
      binder_contract: self.binder_contract.or(source.binder_contract),
      chain: self.chain.or(source.chain),
      data_dir: self.data_dir.or(source.data_dir),
      epoch_batch: self.epoch_batch.or(source.epoch_batch),
      epoch_period: self.epoch_period.or(source.epoch_period),
      epoch_start: self.epoch_start.or(source.epoch_start),
      first_epoch: self.first_epoch.or(source.first_epoch),
      job_interval: self.job_interval.or(source.job_interval),
      mirroring_contract: self.mirroring_contract.or(source.mirroring_contract),
      no_mirror: self.no_mirror || source.no_mirror,
      no_uptime: self.no_uptime || source.no_uptime,
      no_voting: self.no_voting || source.no_voting,
      node_url: self.node_url.or(source.node_url),
      poll_interval: self.poll_interval.or(source.poll_interval),
      private_key: self.private_key.or(source.private_key),
      rpc_url: self.rpc_url.or(source.rpc_url),
      start_index: self.start_index.or(source.start_index),
      uptime_retention: self.uptime_retention.or(source.uptime_retention),
      voting_contract: self.voting_contract.or(source.voting_contract),
      voting_delay: self.voting_delay.or(source.voting_delay),
    }
  }

  pub fn chain(&self) -> Chain {
    self.chain.unwrap_or_default()
  }

  pub fn data_dir(&self) -> Result<PathBuf> {
    let base = match &self.data_dir {
      Some(base) => base.clone(),
      None => dirs::data_dir()
        .context("failed to retrieve data dir")?
        .join("pin"),
    };

    Ok(self.chain().join_with_data_dir(base))
  }

  pub fn index_path(&self) -> Result<PathBuf> {
    Ok(self.data_dir()?.join("index.redb"))
  }

  pub fn node_url(&self) -> String {
    self
      .node_url
      .clone()
      .unwrap_or_else(|| self.chain().default_node_url().into())
  }

  pub fn rpc_url(&self) -> Result<&str> {
    self
      .rpc_url
      .as_deref()
      .context("no EVM endpoint configured; set --rpc-url or PIN_RPC_URL")
  }

  pub fn private_key(&self) -> Result<&str> {
    self
      .private_key
      .as_deref()
      .context("no private key configured; set --private-key or PIN_PRIVATE_KEY")
  }

  pub fn voting_contract(&self) -> Result<&str> {
    self
      .voting_contract
      .as_deref()
      .context("no voting contract configured; set --voting-contract or PIN_VOTING_CONTRACT")
  }

  pub fn mirroring_contract(&self) -> Result<&str> {
    self.mirroring_contract.as_deref().context(
      "no mirroring contract configured; set --mirroring-contract or PIN_MIRRORING_CONTRACT",
    )
  }

  pub fn binder_contract(&self) -> Result<&str> {
    self
      .binder_contract
      .as_deref()
      .context("no binder contract configured; set --binder-contract or PIN_BINDER_CONTRACT")
  }

  pub fn poll_interval(&self) -> Duration {
    self.poll_interval.unwrap_or(Duration::from_secs(3))
  }

  pub fn batch_size(&self) -> usize {
    self.batch_size.unwrap_or(10)
  }

  pub fn start_index(&self) -> u64 {
    self.start_index.unwrap_or_default()
  }

  pub fn job_interval(&self) -> Duration {
    self.job_interval.unwrap_or(Duration::from_secs(60))
  }

  pub fn epoch_batch(&self) -> i64 {
    self.epoch_batch.unwrap_or(100)
  }

  pub fn voting_delay(&self) -> Duration {
    self.voting_delay.unwrap_or_default()
  }

  pub fn uptime_retention(&self) -> Duration {
    self
      .uptime_retention
      .unwrap_or(Duration::from_secs(7 * 24 * 60 * 60))
  }

  pub fn no_mirror(&self) -> bool {
    self.no_mirror
  }

  pub fn no_uptime(&self) -> bool {
    self.no_uptime
  }

  pub fn no_voting(&self) -> bool {
    self.no_voting
  }

  /// Epoch geometry from local settings when both overrides are present,
  /// otherwise fetched from the voting contract.
  pub fn epoch_config(&self, voting: Option<&dyn VotingApi>) -> Result<EpochConfig> {
    let first = self.first_epoch.unwrap_or_default();

    if let (Some(start), Some(period)) = (self.epoch_start, self.epoch_period) {
      return Ok(EpochConfig::new(timestamp(start), period, first)?);
    }

    let voting =
      voting.context("epoch start and period are not configured and no voting contract is set")?;

    let (start, period) = voting.epoch_config()?;

    Ok(EpochConfig::new(timestamp(start), period, first)?)
  }
}
