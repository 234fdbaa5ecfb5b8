use super::*;

mod info;
mod update;

#[derive(Debug, Parser)]
pub enum IndexSubcommand {
  #[command(about = "Print index statistics")]
  Info,
  #[command(about = "Catch the index up with the chain", alias = "run")]
  Update,
}

impl IndexSubcommand {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    match self {
      Self::Info => info::run(settings),
      Self::Update => update::run(settings),
    }
  }
}
