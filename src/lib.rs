use {
  anyhow::{anyhow, bail, ensure, Context, Error},
  chrono::{DateTime, TimeDelta, TimeZone, Utc},
  clap::Parser,
  epochs::{Clock, EpochConfig},
  ethers::abi::Token,
  hex::FromHex,
  indicatif::{ProgressBar, ProgressStyle},
  redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition},
  ripemd::Ripemd160,
  secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SECP256K1,
  },
  serde::{Deserialize, Serialize},
  serde_with::{hex::Hex, serde_as, DeserializeFromStr, SerializeDisplay},
  sha2::Sha256,
  sha3::{Digest, Keccak256},
  snafu::Snafu,
  std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    env,
    fmt::{self, Debug, Display, Formatter},
    fs, io, mem,
    path::{Path, PathBuf},
    process, slice,
    str::FromStr,
    sync::{
      atomic::{self, AtomicBool},
      Arc, LazyLock,
    },
    thread,
    time::{Duration, Instant},
  },
};

pub use self::{
  arguments::Arguments,
  chain::Chain,
  client::{
    Container, ContainerApi, IndexClient, PlatformApi, PlatformClient, RewardUtxo, Validator,
  },
  contracts::{BinderApi, ContractClient, MirrorApi, MirrorOutcome, RevertKind, VotingApi},
  error::SnafuError,
  index::{
    entry::{
      BlockKind, BlockRow, InputKind, InputRow, OutputKind, OutputRow, State, TxKind, TxRow,
      UptimeAggregate, UptimeStatus,
    },
    Batch, BatchRows, Index, IndexInfo, Updater, INGEST_STATE, MIRROR_STATE, VOTING_STATE,
  },
  jobs::{Job, MirrorJob, UptimeAggregator, UptimeCollector, VotingJob},
  merkle::{keccak256, verify_proof, MerkleTree, EMPTY_EPOCH_ROOT},
  options::Options,
  platform::{
    AddDelegator, AddSubnetValidator, AddValidator, Address, BaseTx, Block, Credential, Export,
    Import, NodeId, SignedTransaction, Transaction, TransferInput, TransferOutput, TxId,
  },
  settings::Settings,
  stake::{StakeData, StakeTx, StakingKind},
  subcommand::{Output, Subcommand, SubcommandResult},
};

pub mod arguments;
pub mod chain;
pub mod client;
pub mod contracts;
mod error;
pub mod index;
pub mod jobs;
pub mod merkle;
pub mod options;
pub mod platform;
pub mod settings;
pub mod stake;
pub mod subcommand;

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Seconds-precision UTC time, clamping values `chrono` cannot represent to
/// the unix epoch.
pub fn timestamp(seconds: i64) -> DateTime<Utc> {
  Utc
    .timestamp_opt(seconds, 0)
    .single()
    .unwrap_or(DateTime::UNIX_EPOCH)
}

pub(crate) trait SnafuResultExt<T, E>: Sized {
  fn snafu_context<C, E2>(self, context: C) -> Result<T, E2>
  where
    C: snafu::IntoError<E2, Source = E>,
    E2: std::error::Error + snafu::ErrorCompat;
}

impl<T, E> SnafuResultExt<T, E> for Result<T, E> {
  fn snafu_context<C, E2>(self, context: C) -> Result<T, E2>
  where
    C: snafu::IntoError<E2, Source = E>,
    E2: std::error::Error + snafu::ErrorCompat,
  {
    self.map_err(|error| context.into_error(error))
  }
}

pub fn main() {
  env_logger::init();

  ctrlc::set_handler(move || {
    if SHUTTING_DOWN.fetch_or(true, atomic::Ordering::Relaxed) {
      process::exit(1);
    }

    eprintln!("Shutting down gracefully. Press <CTRL-C> again to shutdown immediately.");
  })
  .expect("Error setting <CTRL-C> handler");

  match Arguments::parse().run() {
    Err(err) => {
      eprintln!("error: {err}");

      err
        .chain()
        .skip(1)
        .for_each(|cause| eprintln!("because: {cause}"));

      if env::var_os("RUST_BACKTRACE")
        .map(|val| val == "1")
        .unwrap_or_default()
      {
        eprintln!("{}", err.backtrace());
      }

      process::exit(1);
    }
    Ok(output) => {
      if let Some(output) = output {
        output.print_json();
      }
    }
  }
}
