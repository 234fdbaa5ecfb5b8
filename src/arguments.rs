use super::*;

#[derive(Debug, Parser)]
#[command(
  version,
  about = "◎ Platform chain indexer and attestation daemon",
  args_override_self = true
)]
pub struct Arguments {
  #[command(flatten)]
  pub options: Options,
  #[command(subcommand)]
  pub subcommand: Subcommand,
}

impl Arguments {
  pub fn run(self) -> SubcommandResult {
    self.subcommand.run(Settings::load(self.options)?)
  }
}
