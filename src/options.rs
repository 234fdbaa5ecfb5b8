use super::*;

#[derive(Clone, Default, Debug, Parser)]
pub struct Options {
  #[arg(long, help = "Fetch at most <BATCH_SIZE> containers per poll. [default: 10]")]
  pub(crate) batch_size: Option<usize>,
  #[arg(
    long,
    env = "PIN_BINDER_CONTRACT",
    help = "Register staking public keys with the binder contract at <BINDER_CONTRACT>."
  )]
  pub(crate) binder_contract: Option<String>,
  #[arg(
    long = "chain",
    value_enum,
    env = "PIN_CHAIN",
    help = "Index <CHAIN>. [default: mainnet]"
  )]
  pub(crate) chain_argument: Option<Chain>,
  #[arg(long, help = "Load configuration from <CONFIG>.")]
  pub(crate) config: Option<PathBuf>,
  #[arg(long, alias = "datadir", help = "Store index in <DATA_DIR>.")]
  pub(crate) data_dir: Option<PathBuf>,
  #[arg(
    long,
    help = "Process at most <EPOCH_BATCH> epochs per job tick. [default: 100]"
  )]
  pub(crate) epoch_batch: Option<i64>,
  #[arg(
    long,
    help = "Override the on-chain epoch period with <EPOCH_PERIOD> seconds."
  )]
  pub(crate) epoch_period: Option<i64>,
  #[arg(
    long,
    help = "Override the on-chain epoch start with unix time <EPOCH_START>."
  )]
  pub(crate) epoch_start: Option<i64>,
  #[arg(
    long,
    help = "Skip attestation work before epoch <FIRST_EPOCH>. [default: 0]"
  )]
  pub(crate) first_epoch: Option<i64>,
  #[arg(
    long,
    help = "Tick attestation jobs every <JOB_INTERVAL>. [default: 60s]"
  )]
  pub(crate) job_interval: Option<humantime::Duration>,
  #[arg(
    long,
    env = "PIN_MIRRORING_CONTRACT",
    help = "Mirror stakes to the mirroring contract at <MIRRORING_CONTRACT>."
  )]
  pub(crate) mirroring_contract: Option<String>,
  #[arg(long, help = "Do not run the stake mirror job.")]
  pub(crate) no_mirror: bool,
  #[arg(long, help = "Do not run the uptime collector and aggregator jobs.")]
  pub(crate) no_uptime: bool,
  #[arg(long, help = "Do not run the root voting job.")]
  pub(crate) no_voting: bool,
  #[arg(
    long,
    env = "PIN_NODE_URL",
    help = "Connect to the platform node at <NODE_URL>."
  )]
  pub(crate) node_url: Option<String>,
  #[arg(
    long,
    help = "Poll for accepted containers every <POLL_INTERVAL>. [default: 3s]"
  )]
  pub(crate) poll_interval: Option<humantime::Duration>,
  #[arg(
    long,
    env = "PIN_PRIVATE_KEY",
    help = "Sign contract transactions with <PRIVATE_KEY>."
  )]
  pub(crate) private_key: Option<String>,
  #[arg(
    long,
    env = "PIN_RPC_URL",
    help = "Submit contract transactions to the EVM endpoint at <RPC_URL>."
  )]
  pub(crate) rpc_url: Option<String>,
  #[arg(long, help = "Start ingestion at container <START_INDEX>.")]
  pub(crate) start_index: Option<u64>,
  #[arg(
    long,
    help = "Drop uptime probes older than <UPTIME_RETENTION>. [default: 7days]"
  )]
  pub(crate) uptime_retention: Option<humantime::Duration>,
  #[arg(
    long,
    env = "PIN_VOTING_CONTRACT",
    help = "Read roots from and submit votes to the voting contract at <VOTING_CONTRACT>."
  )]
  pub(crate) voting_contract: Option<String>,
  #[arg(
    long,
    help = "Vote only once <VOTING_DELAY> has passed since an epoch ended. [default: 0s]"
  )]
  pub(crate) voting_delay: Option<humantime::Duration>,
}
