use super::*;

/// Output rows a transaction mints, in output order: base transfers first,
/// then staked or exported outputs at the following indices. Reward outputs
/// are not derivable from the transaction and come from the platform API
/// instead.
pub(crate) fn transaction_outputs(
  chain: Chain,
  tx_id: TxId,
  transaction: &Transaction,
) -> Result<Vec<OutputRow>> {
  let mut rows = Vec::new();

  let offset = match transaction.base() {
    Some(base) => {
      push_outputs(chain, tx_id, &base.outputs, 0, OutputKind::Transfer, &mut rows)?;
      u32::try_from(base.outputs.len())?
    }
    None => 0,
  };

  match transaction {
    Transaction::AddValidator(tx) => {
      push_outputs(chain, tx_id, &tx.stake, offset, OutputKind::Stake, &mut rows)?;
    }
    Transaction::AddDelegator(tx) => {
      push_outputs(chain, tx_id, &tx.stake, offset, OutputKind::Stake, &mut rows)?;
    }
    Transaction::Export(tx) => {
      push_outputs(
        chain,
        tx_id,
        &tx.exported_outputs,
        offset,
        OutputKind::Export,
        &mut rows,
      )?;
    }
    _ => {}
  }

  Ok(rows)
}

fn push_outputs(
  chain: Chain,
  tx_id: TxId,
  outputs: &[TransferOutput],
  offset: u32,
  kind: OutputKind,
  rows: &mut Vec<OutputRow>,
) -> Result {
  for (i, output) in outputs.iter().enumerate() {
    let index = offset + u32::try_from(i)?;

    let address = match (kind, output.addresses.as_slice()) {
      (OutputKind::Stake, [address]) => *address,
      (OutputKind::Stake, addresses) => {
        return Err(
          SnafuError::StakeOutputAddresses {
            tx_id,
            index,
            count: addresses.len(),
          }
          .into(),
        );
      }
      (_, [address, ..]) => *address,
      (_, []) => return Err(SnafuError::OutputAddresses { tx_id, index }.into()),
    };

    rows.push(OutputRow {
      tx_id,
      index,
      amount: output.amount,
      address: address.encode(chain.address_hrp())?,
      kind,
    });
  }

  Ok(())
}

/// Input rows a transaction spends, address unresolved: base inputs first,
/// then imported inputs at the following indices.
pub(crate) fn transaction_inputs(tx_id: TxId, transaction: &Transaction) -> Result<Vec<InputRow>> {
  let mut rows = Vec::new();

  if let Some(base) = transaction.base() {
    for (i, input) in base.inputs.iter().enumerate() {
      rows.push(InputRow {
        tx_id,
        index: u32::try_from(i)?,
        amount: input.amount,
        funding_tx_id: input.tx_id,
        funding_index: input.output_index,
        address: None,
        kind: InputKind::Transfer,
      });
    }
  }

  if let Transaction::Import(tx) = transaction {
    let offset = u32::try_from(tx.base.inputs.len())?;
    for (i, input) in tx.imported_inputs.iter().enumerate() {
      rows.push(InputRow {
        tx_id,
        index: offset + u32::try_from(i)?,
        amount: input.amount,
        funding_tx_id: input.tx_id,
        funding_index: input.output_index,
        address: None,
        kind: InputKind::Import,
      });
    }
  }

  Ok(rows)
}

/// Recovers the funded address of every transfer input in a batch from the
/// referenced output, looking in three places in order and querying each at
/// most once per batch: outputs minted by the batch itself, outputs already
/// in the index, and finally the chain. Imported inputs spend outputs of
/// another chain and are left unresolved.
pub(crate) struct Resolver {
  chain: Chain,
  outputs: Vec<OutputRow>,
  inputs: Vec<InputRow>,
}

impl Resolver {
  pub(crate) fn new(chain: Chain) -> Self {
    Self {
      chain,
      outputs: Vec::new(),
      inputs: Vec::new(),
    }
  }

  pub(crate) fn reset(&mut self, estimated_transactions: usize) {
    self.outputs.clear();
    self.inputs.clear();
    self.outputs.reserve(estimated_transactions * 2);
    self.inputs.reserve(estimated_transactions * 2);
  }

  pub(crate) fn add_transaction(&mut self, tx_id: TxId, transaction: &Transaction) -> Result {
    self
      .outputs
      .extend(transaction_outputs(self.chain, tx_id, transaction)?);
    self.inputs.extend(transaction_inputs(tx_id, transaction)?);
    Ok(())
  }

  pub(crate) fn add_reward_utxos(&mut self, utxos: &[RewardUtxo]) -> Result {
    for utxo in utxos {
      let address = utxo.addresses.first().ok_or(SnafuError::OutputAddresses {
        tx_id: utxo.tx_id,
        index: utxo.index,
      })?;

      self.outputs.push(OutputRow {
        tx_id: utxo.tx_id,
        index: utxo.index,
        amount: utxo.amount,
        address: address.encode(self.chain.address_hrp())?,
        kind: OutputKind::Reward,
      });
    }

    Ok(())
  }

  pub(crate) fn process_batch(&mut self, index: &Index, api: &dyn ContainerApi) -> Result {
    let chain = self.chain;

    let cache = self
      .outputs
      .iter()
      .map(|output| ((output.tx_id, output.index), output.address.clone()))
      .collect::<HashMap<(TxId, u32), String>>();

    let mut unresolved = self
      .inputs
      .iter_mut()
      .filter(|input| input.kind == InputKind::Transfer && input.address.is_none())
      .collect::<Vec<&mut InputRow>>();

    fill(&mut unresolved, &cache);

    if !unresolved.is_empty() {
      let keys = unresolved
        .iter()
        .map(|input| (input.funding_tx_id, input.funding_index))
        .collect::<BTreeSet<(TxId, u32)>>()
        .into_iter()
        .collect::<Vec<(TxId, u32)>>();

      let stored = index
        .outputs_for_keys(&keys)?
        .into_iter()
        .map(|(key, output)| (key, output.address))
        .collect();

      fill(&mut unresolved, &stored);
    }

    if !unresolved.is_empty() {
      let mut fetched = HashMap::new();
      for tx_id in unresolved
        .iter()
        .map(|input| input.funding_tx_id)
        .collect::<BTreeSet<TxId>>()
      {
        let Some(container) = api.container(tx_id)? else {
          continue;
        };

        let signed = SignedTransaction::from_bytes(&container.bytes)
          .with_context(|| format!("failed to decode funding transaction {tx_id}"))?;

        for output in transaction_outputs(chain, tx_id, &signed.transaction)? {
          fetched.insert((output.tx_id, output.index), output.address);
        }
      }

      fill(&mut unresolved, &fetched);
    }

    if !unresolved.is_empty() {
      let tx_ids = unresolved
        .iter()
        .map(|input| input.funding_tx_id)
        .collect::<BTreeSet<TxId>>()
        .into_iter()
        .collect();

      return Err(SnafuError::UnresolvedInputs { tx_ids }.into());
    }

    Ok(())
  }

  pub(crate) fn take(&mut self) -> (Vec<OutputRow>, Vec<InputRow>) {
    (mem::take(&mut self.outputs), mem::take(&mut self.inputs))
  }
}

fn fill(unresolved: &mut Vec<&mut InputRow>, addresses: &HashMap<(TxId, u32), String>) {
  unresolved.retain_mut(
    |input| match addresses.get(&(input.funding_tx_id, input.funding_index)) {
      Some(address) => {
        input.address = Some(address.clone());
        false
      }
      None => true,
    },
  );
}
