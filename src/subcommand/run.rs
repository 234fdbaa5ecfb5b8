use super::*;

#[derive(Debug, Default, Parser)]
pub struct Run {
  #[arg(
    long,
    help = "Reset the mirror cursor to <RESET_MIRROR_EPOCH> before starting."
  )]
  reset_mirror_epoch: Option<i64>,
}

impl Run {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    let index = Arc::new(Index::open(&settings.index_path()?)?);

    let node_url = settings.node_url();
    let containers: Arc<dyn ContainerApi> = Arc::new(IndexClient::new(&node_url)?);
    let platform: Arc<dyn PlatformApi> = Arc::new(PlatformClient::new(&node_url)?);

    let clock = Clock::default();

    if let Some(epoch) = self.reset_mirror_epoch {
      index.set_job_cursor(MIRROR_STATE, u64::try_from(epoch)?, clock.now())?;
      log::info!("mirror cursor reset to epoch {epoch}");
    }

    let contracts = if settings.no_mirror() && settings.no_voting() {
      None
    } else {
      Some(Arc::new(ContractClient::new(
        settings.rpc_url()?,
        settings.private_key()?,
        settings.voting_contract()?,
        settings.mirroring_contract()?,
        settings.binder_contract()?,
      )?))
    };

    let epoch_config = match &contracts {
      Some(client) => Some(settings.epoch_config(Some(client.as_ref()))?),
      None => settings.epoch_config(None).ok(),
    };

    let mut updater = Updater::new(
      settings.chain(),
      index.clone(),
      containers,
      platform.clone(),
      settings.start_index(),
      settings.batch_size(),
    );

    updater.catch_up()?;

    let jitter = settings.job_interval() / 4;
    let mut handles = Vec::new();

    if let (Some(client), Some(config)) = (&contracts, epoch_config) {
      if !settings.no_mirror() {
        handles.push(jobs::spawn(
          Box::new(MirrorJob {
            binder: client.clone(),
            chain: settings.chain(),
            config,
            epoch_batch: settings.epoch_batch(),
            index: index.clone(),
            interval: settings.job_interval(),
            mirror: client.clone(),
            registered: HashSet::new(),
            voting: client.clone(),
          }),
          jitter,
          clock,
        ));
      }

      if !settings.no_voting() {
        handles.push(jobs::spawn(
          Box::new(VotingJob {
            chain: settings.chain(),
            config,
            delay: TimeDelta::from_std(settings.voting_delay())?,
            epoch_batch: settings.epoch_batch(),
            index: index.clone(),
            interval: settings.job_interval(),
            voting: client.clone(),
          }),
          jitter,
          clock,
        ));
      }
    }

    if !settings.no_uptime() {
      handles.push(jobs::spawn(
        Box::new(UptimeCollector {
          index: index.clone(),
          interval: settings.job_interval(),
          platform: platform.clone(),
        }),
        jitter,
        clock,
      ));

      match epoch_config {
        Some(config) => handles.push(jobs::spawn(
          Box::new(UptimeAggregator {
            config,
            epoch_batch: settings.epoch_batch(),
            index: index.clone(),
            interval: settings.job_interval(),
            last_aggregated: None,
            retention: settings.uptime_retention(),
          }),
          jitter,
          clock,
        )),
        None => log::warn!("uptime aggregation disabled: no epoch configuration available"),
      }
    }

    while !SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
      let processed = match updater.tick(clock.now()) {
        Ok(processed) => processed,
        Err(err) => {
          log::error!("ingestion tick failed: {err:#}");
          0
        }
      };

      if processed == 0 {
        let deadline = Instant::now() + settings.poll_interval();
        while Instant::now() < deadline && !SHUTTING_DOWN.load(atomic::Ordering::Relaxed) {
          thread::sleep(Duration::from_millis(100));
        }
      }
    }

    log::info!("shutting down, waiting for jobs to finish");

    for handle in handles {
      if handle.join().is_err() {
        log::error!("a job thread panicked");
      }
    }

    Ok(None)
  }
}
