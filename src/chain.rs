use {super::*, clap::ValueEnum};

#[derive(Default, ValueEnum, Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
  #[default]
  Mainnet,
  Testnet,
  Local,
}

impl Chain {
  /// Human-readable part of bech32 addresses on this chain.
  pub(crate) fn address_hrp(self) -> &'static str {
    match self {
      Self::Mainnet => "pin",
      Self::Testnet => "tpin",
      Self::Local => "lpin",
    }
  }

  pub(crate) fn default_node_url(self) -> &'static str {
    match self {
      Self::Mainnet | Self::Testnet => "http://127.0.0.1:9650",
      Self::Local => "http://127.0.0.1:9654",
    }
  }

  pub(crate) fn join_with_data_dir(self, data_dir: impl AsRef<Path>) -> PathBuf {
    match self {
      Self::Mainnet => data_dir.as_ref().to_owned(),
      Self::Testnet => data_dir.as_ref().join("testnet"),
      Self::Local => data_dir.as_ref().join("local"),
    }
  }
}

impl Display for Chain {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(
      f,
      "{}",
      match self {
        Self::Mainnet => "mainnet",
        Self::Testnet => "testnet",
        Self::Local => "local",
      }
    )
  }
}

impl FromStr for Chain {
  type Err = SnafuError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "mainnet" | "main" => Ok(Self::Mainnet),
      "testnet" | "test" => Ok(Self::Testnet),
      "local" | "regtest" => Ok(Self::Local),
      _ => Err(SnafuError::InvalidChain {
        chain: s.to_string(),
      }),
    }
  }
}
