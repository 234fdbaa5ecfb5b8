use super::*;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub chain: Chain,
  pub epoch_start: i64,
  pub epoch_period: i64,
  pub first_epoch: i64,
  pub current_epoch: i64,
}

pub(crate) fn run(settings: Settings) -> SubcommandResult {
  let config = match settings.epoch_config(None) {
    Ok(config) => config,
    Err(_) => {
      let client = ContractClient::new(
        settings.rpc_url()?,
        settings.private_key()?,
        settings.voting_contract()?,
        settings.mirroring_contract()?,
        settings.binder_contract()?,
      )?;

      settings.epoch_config(Some(&client))?
    }
  };

  Ok(Some(Box::new(Output {
    chain: settings.chain(),
    epoch_start: config.start().timestamp(),
    epoch_period: config.period_seconds(),
    first_epoch: config.first(),
    current_epoch: config.epoch_of(Utc::now()),
  })))
}
