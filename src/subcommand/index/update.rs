use super::*;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub containers: usize,
}

pub(crate) fn run(settings: Settings) -> SubcommandResult {
  let node_url = settings.node_url();

  let mut updater = Updater::new(
    settings.chain(),
    Arc::new(Index::open(&settings.index_path()?)?),
    Arc::new(IndexClient::new(&node_url)?),
    Arc::new(PlatformClient::new(&node_url)?),
    settings.start_index(),
    settings.batch_size(),
  );

  Ok(Some(Box::new(Output {
    containers: updater.catch_up()?,
  })))
}
