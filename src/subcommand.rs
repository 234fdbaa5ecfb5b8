use super::*;

pub mod epochs;
pub mod find;
pub mod index;
pub mod run;

#[derive(Debug, Parser)]
pub enum Subcommand {
  #[command(about = "Print the epoch configuration")]
  Epochs,
  #[command(about = "Look up an indexed transaction")]
  Find(find::Find),
  #[command(subcommand, about = "Index commands")]
  Index(index::IndexSubcommand),
  #[command(about = "Run the indexer and the attestation jobs")]
  Run(run::Run),
}

impl Subcommand {
  pub fn run(self, settings: Settings) -> SubcommandResult {
    match self {
      Self::Epochs => epochs::run(settings),
      Self::Find(find) => find.run(settings),
      Self::Index(index) => index.run(settings),
      Self::Run(run) => run.run(settings),
    }
  }
}

pub trait Output: Send {
  fn print_json(&self);
}

impl<T> Output for T
where
  T: Serialize + Send,
{
  fn print_json(&self) {
    serde_json::to_writer_pretty(io::stdout(), self).ok();
    println!();
  }
}

pub type SubcommandResult = Result<Option<Box<dyn Output>>>;
