use {
  self::entry::{Entry, StateValue},
  super::*,
};

pub use self::{
  batch::{Batch, BatchRows},
  updater::Updater,
};
pub(crate) use resolver::Resolver;

pub mod entry;

mod batch;
mod resolver;
mod updater;

const STATES: TableDefinition<&str, StateValue> = TableDefinition::new("states");
const BLOCKS: TableDefinition<u64, &[u8]> = TableDefinition::new("blocks");
const TRANSACTIONS: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("transactions");
const OUTPUTS: TableDefinition<(&[u8; 32], u32), &[u8]> = TableDefinition::new("outputs");
const INPUTS: TableDefinition<(&[u8; 32], u32), &[u8]> = TableDefinition::new("inputs");
const STAKES_BY_START: TableDefinition<(i64, &[u8; 32]), ()> =
  TableDefinition::new("stakes_by_start");
const UPTIMES: TableDefinition<(&[u8; 20], i64), i8> = TableDefinition::new("uptimes");
const UPTIME_AGGREGATES: TableDefinition<(i64, &[u8; 20]), (i64, i64)> =
  TableDefinition::new("uptime_aggregates");

pub const INGEST_STATE: &str = "ingest";
pub(crate) const CHAIN_TIME_STATE: &str = "chain_time";
pub const MIRROR_STATE: &str = "mirror";
pub const VOTING_STATE: &str = "voting";

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexInfo {
  pub states: BTreeMap<String, State>,
  pub blocks: u64,
  pub transactions: u64,
  pub outputs: u64,
  pub inputs: u64,
  pub uptime_probes: u64,
  pub uptime_aggregates: u64,
}

pub struct Index {
  database: Database,
}

impl Index {
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }

    let database = Database::create(path)?;

    let wtx = database.begin_write()?;
    wtx.open_table(STATES)?;
    wtx.open_table(BLOCKS)?;
    wtx.open_table(TRANSACTIONS)?;
    wtx.open_table(OUTPUTS)?;
    wtx.open_table(INPUTS)?;
    wtx.open_table(STAKES_BY_START)?;
    wtx.open_table(UPTIMES)?;
    wtx.open_table(UPTIME_AGGREGATES)?;
    wtx.commit()?;

    Ok(Self { database })
  }

  pub fn state(&self, name: &str) -> Result<Option<State>> {
    let rtx = self.database.begin_read()?;
    Ok(
      rtx
        .open_table(STATES)?
        .get(name)?
        .map(|guard| State::load(guard.value())),
    )
  }

  pub fn set_state(&self, name: &str, state: State) -> Result {
    let wtx = self.database.begin_write()?;
    wtx.open_table(STATES)?.insert(name, state.store())?;
    wtx.commit()?;
    Ok(())
  }

  /// Moves a job cursor. The only sanctioned path that may move one
  /// backwards, for administrative resets.
  pub fn set_job_cursor(&self, name: &str, next_index: u64, now: DateTime<Utc>) -> Result {
    let last_chain_index = self
      .state(name)?
      .map(|state| state.last_chain_index)
      .unwrap_or_default();

    self.set_state(
      name,
      State {
        next_index,
        last_chain_index,
        updated: now.timestamp(),
      },
    )
  }

  /// The chain-time watermark and the height of the container that set it.
  pub(crate) fn chain_time(&self) -> Result<Option<(i64, u64)>> {
    Ok(self.state(CHAIN_TIME_STATE)?.map(|state| {
      (
        i64::try_from(state.next_index).unwrap_or_default(),
        state.last_chain_index,
      )
    }))
  }

  pub fn block(&self, height: u64) -> Result<Option<BlockRow>> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(BLOCKS)?;

    match table.get(&height)? {
      Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
      None => Ok(None),
    }
  }

  pub fn transaction(&self, tx_id: TxId) -> Result<Option<TxRow>> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(TRANSACTIONS)?;

    match table.get(&tx_id.0)? {
      Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
      None => Ok(None),
    }
  }

  pub fn outputs_of(&self, tx_id: TxId) -> Result<Vec<OutputRow>> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(OUTPUTS)?;

    let mut outputs = Vec::new();
    for entry in table.range((&tx_id.0, 0)..=(&tx_id.0, u32::MAX))? {
      let (_, value) = entry?;
      outputs.push(serde_json::from_slice(value.value())?);
    }

    Ok(outputs)
  }

  pub fn inputs_of(&self, tx_id: TxId) -> Result<Vec<InputRow>> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(INPUTS)?;

    let mut inputs = Vec::new();
    for entry in table.range((&tx_id.0, 0)..=(&tx_id.0, u32::MAX))? {
      let (_, value) = entry?;
      inputs.push(serde_json::from_slice(value.value())?);
    }

    Ok(inputs)
  }

  /// Stored outputs for exactly the requested `(transaction, index)` keys.
  pub(crate) fn outputs_for_keys(
    &self,
    keys: &[(TxId, u32)],
  ) -> Result<HashMap<(TxId, u32), OutputRow>> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(OUTPUTS)?;

    let mut outputs = HashMap::new();
    for (tx_id, index) in keys {
      if let Some(guard) = table.get(&(&tx_id.0, *index))? {
        outputs.insert(
          (*tx_id, *index),
          serde_json::from_slice::<OutputRow>(guard.value())?,
        );
      }
    }

    Ok(outputs)
  }

  /// Staking transactions whose stake starts in `[from, to)`, one entry per
  /// funding input. Attestation windows key on the stake start, not on
  /// interval overlap, so every job rebuilds the exact set a root was voted
  /// over.
  pub fn stakes_starting_in(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<StakeTx>> {
    let rtx = self.database.begin_read()?;
    let stakes = rtx.open_table(STAKES_BY_START)?;

    let mut tx_ids = Vec::new();
    for entry in stakes.range((from.timestamp(), &[0; 32])..(to.timestamp(), &[0; 32]))? {
      let (key, _) = entry?;
      tx_ids.push(TxId(*key.value().1));
    }
    drop(stakes);
    drop(rtx);

    let mut joined = Vec::new();
    for tx_id in tx_ids {
      let row = self
        .transaction(tx_id)?
        .with_context(|| format!("stake index references missing transaction {tx_id}"))?;
      joined.extend(self.join_stake_inputs(&row)?);
    }

    Ok(joined)
  }

  fn join_stake_inputs(&self, row: &TxRow) -> Result<Vec<StakeTx>> {
    let Some(kind) = row.kind.staking_kind() else {
      return Ok(Vec::new());
    };

    let node_id = row
      .node_id
      .with_context(|| format!("staking transaction {} has no node id", row.tx_id))?;
    let start_time = row
      .start_time
      .with_context(|| format!("staking transaction {} has no start time", row.tx_id))?;
    let end_time = row
      .end_time
      .with_context(|| format!("staking transaction {} has no end time", row.tx_id))?;

    let mut stakes = Vec::new();
    for input in self.inputs_of(row.tx_id)? {
      let Some(address) = input.address else {
        continue;
      };

      stakes.push(StakeTx {
        tx_id: row.tx_id,
        kind,
        node_id,
        start_time,
        end_time,
        weight: row.weight.unwrap_or_default(),
        input_address: address,
        input_index: input.index,
      });
    }

    Ok(stakes)
  }

  /// Validator staking intervals intersecting `[from, to)`, for uptime
  /// accounting.
  pub fn validators_overlapping(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<(NodeId, i64, i64)>> {
    let rtx = self.database.begin_read()?;
    let stakes = rtx.open_table(STAKES_BY_START)?;

    let mut tx_ids = Vec::new();
    for entry in stakes.range(..(to.timestamp(), &[0; 32]))? {
      let (key, _) = entry?;
      tx_ids.push(TxId(*key.value().1));
    }
    drop(stakes);
    drop(rtx);

    let mut intervals = Vec::new();
    for tx_id in tx_ids {
      let Some(row) = self.transaction(tx_id)? else {
        continue;
      };

      if row.kind != TxKind::AddValidator {
        continue;
      }

      if let (Some(node_id), Some(start), Some(end)) = (row.node_id, row.start_time, row.end_time)
        && end >= from.timestamp()
      {
        intervals.push((node_id, start, end));
      }
    }

    intervals.sort();
    Ok(intervals)
  }

  pub(crate) fn insert_uptimes(&self, probes: &[(NodeId, i64, UptimeStatus)]) -> Result {
    let wtx = self.database.begin_write()?;
    {
      let mut table = wtx.open_table(UPTIMES)?;
      for (node_id, time, status) in probes {
        table.insert((&node_id.0, *time), (*status).store())?;
      }
    }
    wtx.commit()?;
    Ok(())
  }

  pub(crate) fn uptimes_between(
    &self,
    node_id: NodeId,
    from: i64,
    to: i64,
  ) -> Result<Vec<(i64, UptimeStatus)>> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(UPTIMES)?;

    let mut probes = Vec::new();
    for entry in table.range((&node_id.0, from)..(&node_id.0, to))? {
      let (key, value) = entry?;
      probes.push((key.value().1, UptimeStatus::load(value.value())));
    }

    Ok(probes)
  }

  pub(crate) fn prune_uptimes_before(&self, cutoff: i64) -> Result<u64> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(UPTIMES)?;

    let mut stale = Vec::new();
    for entry in table.iter()? {
      let (key, _) = entry?;
      let (node_id, time) = key.value();
      if time < cutoff {
        stale.push((NodeId(*node_id), time));
      }
    }
    drop(table);
    drop(rtx);

    let pruned = stale.len() as u64;
    let wtx = self.database.begin_write()?;
    {
      let mut table = wtx.open_table(UPTIMES)?;
      for (node_id, time) in stale {
        table.remove((&node_id.0, time))?;
      }
    }
    wtx.commit()?;

    Ok(pruned)
  }

  pub(crate) fn last_aggregated_epoch(&self) -> Result<Option<i64>> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(UPTIME_AGGREGATES)?;
    Ok(table.last()?.map(|(key, _)| key.value().0))
  }

  pub(crate) fn insert_aggregates(
    &self,
    epoch: i64,
    aggregates: &[(NodeId, UptimeAggregate)],
  ) -> Result {
    let wtx = self.database.begin_write()?;
    {
      let mut table = wtx.open_table(UPTIME_AGGREGATES)?;
      for (node_id, aggregate) in aggregates {
        table.insert((epoch, &node_id.0), (*aggregate).store())?;
      }
    }
    wtx.commit()?;
    Ok(())
  }

  pub fn aggregates_for_epoch(&self, epoch: i64) -> Result<Vec<(NodeId, UptimeAggregate)>> {
    let rtx = self.database.begin_read()?;
    let table = rtx.open_table(UPTIME_AGGREGATES)?;

    let mut aggregates = Vec::new();
    for entry in table.range((epoch, &[0; 20])..=(epoch, &[u8::MAX; 20]))? {
      let (key, value) = entry?;
      aggregates.push((NodeId(*key.value().1), UptimeAggregate::load(value.value())));
    }

    Ok(aggregates)
  }

  /// Persists a decoded batch and its advanced cursor in one transaction, so
  /// a crash either keeps or discards the whole tick.
  pub(crate) fn commit_batch(&self, rows: BatchRows, state: State) -> Result {
    let wtx = self.database.begin_write()?;
    {
      let mut blocks = wtx.open_table(BLOCKS)?;
      for block in &rows.blocks {
        blocks.insert(block.height, serde_json::to_vec(block)?.as_slice())?;
      }

      let mut transactions = wtx.open_table(TRANSACTIONS)?;
      let mut stakes = wtx.open_table(STAKES_BY_START)?;
      for transaction in &rows.transactions {
        transactions.insert(&transaction.tx_id.0, serde_json::to_vec(transaction)?.as_slice())?;

        if transaction.kind.is_staking()
          && let Some(start) = transaction.start_time
        {
          stakes.insert((start, &transaction.tx_id.0), ())?;
        }
      }

      let mut outputs = wtx.open_table(OUTPUTS)?;
      for output in &rows.outputs {
        outputs.insert(
          (&output.tx_id.0, output.index),
          serde_json::to_vec(output)?.as_slice(),
        )?;
      }

      let mut inputs = wtx.open_table(INPUTS)?;
      for input in &rows.inputs {
        inputs.insert(
          (&input.tx_id.0, input.index),
          serde_json::to_vec(input)?.as_slice(),
        )?;
      }

      let mut states = wtx.open_table(STATES)?;
      states.insert(
        CHAIN_TIME_STATE,
        State {
          next_index: u64::try_from(rows.chain_time).unwrap_or_default(),
          last_chain_index: rows.chain_time_height,
          updated: state.updated,
        }
        .store(),
      )?;
      states.insert(INGEST_STATE, state.store())?;
    }
    wtx.commit()?;

    Ok(())
  }

  pub fn info(&self) -> Result<IndexInfo> {
    let rtx = self.database.begin_read()?;

    let mut states = BTreeMap::new();
    for entry in rtx.open_table(STATES)?.iter()? {
      let (name, value) = entry?;
      states.insert(name.value().to_string(), State::load(value.value()));
    }

    Ok(IndexInfo {
      states,
      blocks: rtx.open_table(BLOCKS)?.len()?,
      transactions: rtx.open_table(TRANSACTIONS)?.len()?,
      outputs: rtx.open_table(OUTPUTS)?.len()?,
      inputs: rtx.open_table(INPUTS)?.len()?,
      uptime_probes: rtx.open_table(UPTIMES)?.len()?,
      uptime_aggregates: rtx.open_table(UPTIME_AGGREGATES)?.len()?,
    })
  }
}
