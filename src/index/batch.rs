use super::*;

/// Everything one ingestion tick writes, committed atomically together with
/// the advanced cursor.
#[derive(Debug, Default)]
pub struct BatchRows {
  pub blocks: Vec<BlockRow>,
  pub transactions: Vec<TxRow>,
  pub outputs: Vec<OutputRow>,
  pub inputs: Vec<InputRow>,
  pub chain_time: i64,
  pub chain_time_height: u64,
}

/// Accumulates the rows of one container batch. Transactions see the
/// chain-time watermark as of their position: an advance-time transaction
/// moves it for every transaction after it, within the batch and beyond.
pub struct Batch<'a> {
  chain: Chain,
  index: &'a Index,
  resolver: &'a mut Resolver,
  blocks: Vec<BlockRow>,
  transactions: Vec<TxRow>,
  chain_time: i64,
  chain_time_height: u64,
}

impl<'a> Batch<'a> {
  pub fn new(
    chain: Chain,
    index: &'a Index,
    resolver: &'a mut Resolver,
    estimated_containers: usize,
  ) -> Result<Self> {
    let (chain_time, chain_time_height) = index.chain_time()?.unwrap_or_default();

    resolver.reset(estimated_containers);

    Ok(Self {
      chain,
      index,
      resolver,
      blocks: Vec::with_capacity(estimated_containers),
      transactions: Vec::with_capacity(estimated_containers),
      chain_time,
      chain_time_height,
    })
  }

  pub fn add_container(&mut self, container: &Container, platform: &dyn PlatformApi) -> Result {
    let block = Block::decode(&container.bytes, container.index)?;

    let block_kind = match &block {
      Block::Proposal { .. } => BlockKind::Proposal,
      Block::Commit { .. } => BlockKind::Commit,
      Block::Abort { .. } => BlockKind::Abort,
      Block::Standard { .. } => BlockKind::Standard,
    };

    self.blocks.push(BlockRow {
      id: container.id,
      kind: block_kind,
      height: container.index,
      timestamp: container.timestamp,
      transactions: u32::try_from(block.transactions().len())?,
      bytes: container.bytes.clone(),
    });

    for signed in block.transactions() {
      self.add_transaction(container, block_kind, signed, platform)?;
    }

    Ok(())
  }

  fn add_transaction(
    &mut self,
    container: &Container,
    block_kind: BlockKind,
    signed: &SignedTransaction,
    platform: &dyn PlatformApi,
  ) -> Result {
    let tx_id = signed.id()?;
    let transaction = &signed.transaction;

    self.resolver.add_transaction(tx_id, transaction)?;

    let mut row = TxRow {
      tx_id,
      kind: transaction_kind(transaction),
      block_id: container.id,
      block_kind,
      block_height: container.index,
      timestamp: container.timestamp,
      chain_time: self.chain_time,
      memo: transaction
        .base()
        .map(|base| base.memo.clone())
        .unwrap_or_default(),
      bytes: signed.to_bytes()?,
      node_id: None,
      start_time: None,
      end_time: None,
      weight: None,
      rewards_owner: None,
      fee_percentage: None,
      chain_id: None,
      reward_tx_id: None,
      new_chain_time: None,
    };

    match transaction {
      Transaction::AddValidator(tx) => {
        row.node_id = Some(tx.node_id);
        row.start_time = Some(tx.start_time);
        row.end_time = Some(tx.end_time);
        row.weight = Some(tx.weight);
        row.rewards_owner = Some(self.rewards_owner(tx_id, &tx.rewards_owner)?);
        row.fee_percentage = Some(tx.shares);
      }
      Transaction::AddDelegator(tx) => {
        row.node_id = Some(tx.node_id);
        row.start_time = Some(tx.start_time);
        row.end_time = Some(tx.end_time);
        row.weight = Some(tx.weight);
        row.rewards_owner = Some(self.rewards_owner(tx_id, &tx.rewards_owner)?);
      }
      Transaction::AddSubnetValidator(tx) => {
        row.node_id = Some(tx.node_id);
        row.start_time = Some(tx.start_time);
        row.end_time = Some(tx.end_time);
        row.weight = Some(tx.weight);
        row.chain_id = Some(tx.subnet);
      }
      Transaction::Import(tx) => {
        row.chain_id = Some(tx.source_chain);
      }
      Transaction::Export(tx) => {
        row.chain_id = Some(tx.destination_chain);
      }
      Transaction::RewardValidator { staking_tx_id } => {
        row.reward_tx_id = Some(*staking_tx_id);
        self
          .resolver
          .add_reward_utxos(&platform.reward_utxos(*staking_tx_id)?)?;
      }
      Transaction::AdvanceTime { time } => {
        row.new_chain_time = Some(*time);
        self.chain_time = *time;
        self.chain_time_height = container.index;
      }
      Transaction::CreateChain { .. } | Transaction::CreateSubnet { .. } => {}
    }

    self.transactions.push(row);
    Ok(())
  }

  fn rewards_owner(&self, tx_id: TxId, owners: &[Address]) -> Result<String> {
    match owners {
      [owner] => owner.encode(self.chain.address_hrp()),
      _ => Err(
        SnafuError::RewardsOwner {
          tx_id,
          count: owners.len(),
        }
        .into(),
      ),
    }
  }

  pub fn resolve(&mut self, api: &dyn ContainerApi) -> Result {
    self.resolver.process_batch(self.index, api)
  }

  pub fn take(&mut self) -> BatchRows {
    let (outputs, inputs) = self.resolver.take();

    BatchRows {
      blocks: mem::take(&mut self.blocks),
      transactions: mem::take(&mut self.transactions),
      outputs,
      inputs,
      chain_time: self.chain_time,
      chain_time_height: self.chain_time_height,
    }
  }
}

fn transaction_kind(transaction: &Transaction) -> TxKind {
  match transaction {
    Transaction::AddValidator(_) => TxKind::AddValidator,
    Transaction::AddDelegator(_) => TxKind::AddDelegator,
    Transaction::AddSubnetValidator(_) => TxKind::AddSubnetValidator,
    Transaction::CreateChain { .. } => TxKind::CreateChain,
    Transaction::CreateSubnet { .. } => TxKind::CreateSubnet,
    Transaction::Import(_) => TxKind::Import,
    Transaction::Export(_) => TxKind::Export,
    Transaction::AdvanceTime { .. } => TxKind::AdvanceTime,
    Transaction::RewardValidator { .. } => TxKind::RewardValidator,
  }
}

#[cfg(test)]
mod tests {
  use {super::*, std::sync::atomic::AtomicUsize};

  struct StubPlatform {
    utxos: Vec<RewardUtxo>,
    calls: AtomicUsize,
  }

  impl StubPlatform {
    fn empty() -> Self {
      Self {
        utxos: Vec::new(),
        calls: AtomicUsize::new(0),
      }
    }
  }

  impl PlatformApi for StubPlatform {
    fn reward_utxos(&self, _tx_id: TxId) -> Result<Vec<RewardUtxo>> {
      self.calls.fetch_add(1, atomic::Ordering::SeqCst);
      Ok(self.utxos.clone())
    }

    fn current_validators(&self) -> Result<Vec<Validator>> {
      panic!("not used by ingestion");
    }
  }

  fn index() -> (tempfile::TempDir, Index) {
    let dir = tempfile::tempdir().unwrap();
    let index = Index::open(&dir.path().join("index.redb")).unwrap();
    (dir, index)
  }

  fn signed(transaction: Transaction) -> SignedTransaction {
    SignedTransaction {
      transaction,
      credentials: Vec::new(),
    }
  }

  fn container(height: u64, timestamp: i64, block: &Block) -> Container {
    Container {
      id: TxId([u8::try_from(height).unwrap(); 32]),
      index: height,
      timestamp,
      bytes: block.to_bytes().unwrap(),
    }
  }

  #[test]
  fn advance_time_moves_the_watermark_for_later_transactions() {
    let (_dir, index) = index();
    let mut resolver = Resolver::new(Chain::Mainnet);
    let mut batch = Batch::new(Chain::Mainnet, &index, &mut resolver, 1).unwrap();

    let block = Block::Standard {
      height: 5,
      transactions: vec![
        signed(Transaction::AdvanceTime { time: 1_000 }),
        signed(Transaction::CreateSubnet {
          base: BaseTx {
            outputs: Vec::new(),
            inputs: Vec::new(),
            memo: vec![0xab],
          },
        }),
      ],
    };

    batch
      .add_container(&container(5, 99, &block), &StubPlatform::empty())
      .unwrap();

    let rows = batch.take();
    assert_eq!(rows.chain_time, 1_000);
    assert_eq!(rows.chain_time_height, 5);

    let advance = &rows.transactions[0];
    assert_eq!(advance.kind, TxKind::AdvanceTime);
    assert_eq!(advance.chain_time, 0);
    assert_eq!(advance.new_chain_time, Some(1_000));

    let create = &rows.transactions[1];
    assert_eq!(create.kind, TxKind::CreateSubnet);
    assert_eq!(create.chain_time, 1_000);
    assert_eq!(create.memo, vec![0xab]);
  }

  #[test]
  fn reward_validator_transactions_pull_their_utxos() {
    let (_dir, index) = index();
    let mut resolver = Resolver::new(Chain::Mainnet);
    let mut batch = Batch::new(Chain::Mainnet, &index, &mut resolver, 1).unwrap();

    let staking_tx_id = TxId([7; 32]);
    let utxo = RewardUtxo {
      tx_id: TxId([8; 32]),
      index: 2,
      amount: 40,
      addresses: vec![Address([9; 20])],
    };

    let platform = StubPlatform {
      utxos: vec![utxo.clone()],
      calls: AtomicUsize::new(0),
    };

    let block = Block::Standard {
      height: 1,
      transactions: vec![signed(Transaction::RewardValidator { staking_tx_id })],
    };

    batch
      .add_container(&container(1, 50, &block), &platform)
      .unwrap();

    let rows = batch.take();
    assert_eq!(platform.calls.load(atomic::Ordering::SeqCst), 1);
    assert_eq!(rows.transactions[0].reward_tx_id, Some(staking_tx_id));
    assert_eq!(rows.outputs.len(), 1);
    assert_eq!(rows.outputs[0].tx_id, utxo.tx_id);
    assert_eq!(rows.outputs[0].index, utxo.index);
    assert_eq!(rows.outputs[0].kind, OutputKind::Reward);
    assert_eq!(
      rows.outputs[0].address,
      Address([9; 20]).encode("pin").unwrap(),
    );
  }

  #[test]
  fn staking_transactions_record_their_terms() {
    let (_dir, index) = index();
    let mut resolver = Resolver::new(Chain::Mainnet);
    let mut batch = Batch::new(Chain::Mainnet, &index, &mut resolver, 1).unwrap();

    let block = Block::Proposal {
      height: 3,
      transaction: signed(Transaction::AddValidator(AddValidator {
        base: BaseTx {
          outputs: Vec::new(),
          inputs: Vec::new(),
          memo: Vec::new(),
        },
        node_id: NodeId([1; 20]),
        start_time: 100,
        end_time: 200,
        weight: 7,
        stake: vec![TransferOutput {
          amount: 7,
          addresses: vec![Address([2; 20])],
        }],
        rewards_owner: vec![Address([3; 20])],
        shares: 20_000,
      })),
    };

    batch
      .add_container(&container(3, 10, &block), &StubPlatform::empty())
      .unwrap();

    let rows = batch.take();
    let row = &rows.transactions[0];
    assert_eq!(row.kind, TxKind::AddValidator);
    assert_eq!(row.block_kind, BlockKind::Proposal);
    assert_eq!(row.node_id, Some(NodeId([1; 20])));
    assert_eq!(row.start_time, Some(100));
    assert_eq!(row.end_time, Some(200));
    assert_eq!(row.weight, Some(7));
    assert_eq!(row.fee_percentage, Some(20_000));
    assert_eq!(
      row.rewards_owner,
      Some(Address([3; 20]).encode("pin").unwrap()),
    );
  }

  #[test]
  fn multiple_rewards_owners_are_an_error() {
    let (_dir, index) = index();
    let mut resolver = Resolver::new(Chain::Mainnet);
    let mut batch = Batch::new(Chain::Mainnet, &index, &mut resolver, 1).unwrap();

    let transaction = signed(Transaction::AddDelegator(AddDelegator {
      base: BaseTx {
        outputs: Vec::new(),
        inputs: Vec::new(),
        memo: Vec::new(),
      },
      node_id: NodeId([1; 20]),
      start_time: 100,
      end_time: 200,
      weight: 7,
      stake: vec![TransferOutput {
        amount: 7,
        addresses: vec![Address([2; 20])],
      }],
      rewards_owner: vec![Address([3; 20]), Address([4; 20])],
    }));
    let tx_id = transaction.id().unwrap();

    let block = Block::Proposal {
      height: 3,
      transaction,
    };

    let err = batch
      .add_container(&container(3, 10, &block), &StubPlatform::empty())
      .unwrap_err();

    assert_eq!(
      err.to_string(),
      format!("staking transaction {tx_id} has 2 rewards owner addresses, expected exactly 1"),
    );
  }

  #[test]
  fn decision_containers_carry_no_transactions() {
    let (_dir, index) = index();
    let mut resolver = Resolver::new(Chain::Mainnet);
    let mut batch = Batch::new(Chain::Mainnet, &index, &mut resolver, 2).unwrap();

    batch
      .add_container(
        &container(8, 60, &Block::Commit { height: 8 }),
        &StubPlatform::empty(),
      )
      .unwrap();
    batch
      .add_container(
        &container(9, 61, &Block::Abort { height: 9 }),
        &StubPlatform::empty(),
      )
      .unwrap();

    let rows = batch.take();
    assert_eq!(rows.blocks.len(), 2);
    assert_eq!(rows.blocks[0].kind, BlockKind::Commit);
    assert_eq!(rows.blocks[0].transactions, 0);
    assert_eq!(rows.blocks[1].kind, BlockKind::Abort);
    assert!(rows.transactions.is_empty());
  }
}
