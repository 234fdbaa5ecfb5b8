use super::*;

#[derive(Debug, Parser)]
pub struct Find {
  #[arg(help = "Find transaction <TX_ID>.")]
  tx_id: TxId,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
  pub transaction: TxRow,
  pub outputs: Vec<OutputRow>,
  pub inputs: Vec<InputRow>,
}

impl Find {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    let index = Index::open(&settings.index_path()?)?;

    match index.transaction(self.tx_id)? {
      Some(transaction) => Ok(Some(Box::new(Output {
        transaction,
        outputs: index.outputs_of(self.tx_id)?,
        inputs: index.inputs_of(self.tx_id)?,
      }))),
      None => Err(anyhow!(
        "transaction {} has not been indexed",
        self.tx_id
      )),
    }
  }
}
