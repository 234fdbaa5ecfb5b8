use {super::*, pretty_assertions::assert_eq};

fn voting_job(index: &Arc<Index>, contracts: &Arc<TestContracts>, delay: i64) -> VotingJob {
  VotingJob {
    chain: Chain::Local,
    config: config(),
    delay: TimeDelta::seconds(delay),
    epoch_batch: 100,
    index: index.clone(),
    interval: Duration::from_secs(60),
    voting: contracts.clone(),
  }
}

fn commit_only_chain() -> Arc<TestChain> {
  Arc::new(TestChain::new(vec![block_container(
    0,
    EPOCH_START,
    &Block::Commit { height: 0 },
  )]))
}

#[test]
fn finished_epochs_are_voted_with_the_empty_window_sentinel() {
  let (_dir, index) = open_index();
  let chain = commit_only_chain();

  assert_eq!(
    updater(&index, &chain, 0, 10)
      .tick(timestamp(EPOCH_START + 4 * PERIOD))
      .unwrap(),
    1,
  );

  let contracts = Arc::new(TestContracts::default());
  let mut job = voting_job(&index, &contracts, 0);
  job.tick(timestamp(EPOCH_START + 4 * PERIOD)).unwrap();

  assert_eq!(
    *contracts.votes.lock().unwrap(),
    (0..4).map(|epoch| (epoch, *EMPTY_EPOCH_ROOT)).collect::<Vec<(i64, [u8; 32])>>(),
  );
  assert_eq!(
    index.state(VOTING_STATE).unwrap().unwrap().next_index,
    4,
  );
}

#[test]
fn votes_carry_the_root_of_the_epochs_stakes() {
  let (_dir, index) = open_index();
  let signer = key(1);
  let owner = address(&signer);

  let funding = funding(owner, 60);
  let stake = add_validator(
    NodeId([6; 20]),
    EPOCH_START + PERIOD + 10,
    EPOCH_START + 50 * PERIOD,
    60,
    (funding.id().unwrap(), 0, 60),
    owner,
    &signer,
  );
  let stake_id = stake.id().unwrap();

  let chain = Arc::new(TestChain::new(vec![block_container(
    0,
    EPOCH_START,
    &Block::Standard {
      height: 0,
      transactions: vec![funding, stake],
    },
  )]));

  assert_eq!(
    updater(&index, &chain, 0, 10)
      .tick(timestamp(EPOCH_START + 3 * PERIOD))
      .unwrap(),
    1,
  );

  let leaf = StakeData {
    tx_id: stake_id,
    kind: StakingKind::Validator,
    input_address: owner,
    node_id: NodeId([6; 20]),
    start_time: u64::try_from(EPOCH_START + PERIOD + 10).unwrap(),
    end_time: u64::try_from(EPOCH_START + 50 * PERIOD).unwrap(),
    weight: 60,
  }
  .leaf_hash();

  let contracts = Arc::new(TestContracts::default());
  let mut job = voting_job(&index, &contracts, 0);
  job.tick(timestamp(EPOCH_START + 3 * PERIOD)).unwrap();

  assert_eq!(
    *contracts.votes.lock().unwrap(),
    vec![
      (0, *EMPTY_EPOCH_ROOT),
      (1, leaf),
      (2, *EMPTY_EPOCH_ROOT),
    ],
  );
}

#[test]
fn an_epoch_the_ingest_watermark_has_not_passed_is_deferred() {
  let (_dir, index) = open_index();
  let chain = commit_only_chain();

  // Ingestion last ran mid-epoch 0, so no epoch is fully covered yet.
  assert_eq!(
    updater(&index, &chain, 0, 10)
      .tick(timestamp(EPOCH_START + PERIOD / 2))
      .unwrap(),
    1,
  );

  let contracts = Arc::new(TestContracts::default());
  let mut job = voting_job(&index, &contracts, 0);
  job.tick(timestamp(EPOCH_START + 5 * PERIOD)).unwrap();

  assert!(contracts.votes.lock().unwrap().is_empty());
  assert!(index.state(VOTING_STATE).unwrap().is_none());
}

#[test]
fn a_cursor_behind_the_chain_head_defers_voting() {
  let (_dir, index) = open_index();

  let chain = Arc::new(TestChain::new(
    (0..4)
      .map(|height| {
        block_container(height, EPOCH_START, &Block::Commit { height })
      })
      .collect(),
  ));

  // One small batch leaves the cursor behind the head it just observed.
  assert_eq!(
    updater(&index, &chain, 0, 2)
      .tick(timestamp(EPOCH_START + 10 * PERIOD))
      .unwrap(),
    2,
  );

  let contracts = Arc::new(TestContracts::default());
  let mut job = voting_job(&index, &contracts, 0);
  job.tick(timestamp(EPOCH_START + 10 * PERIOD)).unwrap();

  assert!(contracts.votes.lock().unwrap().is_empty());
}

#[test]
fn ineligible_voters_advance_without_submitting() {
  let (_dir, index) = open_index();
  let chain = commit_only_chain();

  assert_eq!(
    updater(&index, &chain, 0, 10)
      .tick(timestamp(EPOCH_START + 3 * PERIOD))
      .unwrap(),
    1,
  );

  let contracts = Arc::new(TestContracts::default());
  contracts.eligible.store(false, Ordering::SeqCst);

  let mut job = voting_job(&index, &contracts, 0);
  job.tick(timestamp(EPOCH_START + 3 * PERIOD)).unwrap();

  assert!(contracts.votes.lock().unwrap().is_empty());
  assert_eq!(
    index.state(VOTING_STATE).unwrap().unwrap().next_index,
    3,
  );
}

#[test]
fn the_voting_delay_widens_the_ingestion_margin() {
  let (_dir, index) = open_index();
  let chain = commit_only_chain();

  assert_eq!(
    updater(&index, &chain, 0, 10)
      .tick(timestamp(EPOCH_START + 4 * PERIOD))
      .unwrap(),
    1,
  );

  let contracts = Arc::new(TestContracts::default());
  let mut job = voting_job(&index, &contracts, 2 * PERIOD);
  job.tick(timestamp(EPOCH_START + 4 * PERIOD)).unwrap();

  // Only epochs ending at least two periods before the watermark qualify.
  assert_eq!(
    *contracts.votes.lock().unwrap(),
    vec![(0, *EMPTY_EPOCH_ROOT), (1, *EMPTY_EPOCH_ROOT)],
  );
  assert_eq!(
    index.state(VOTING_STATE).unwrap().unwrap().next_index,
    2,
  );
}
