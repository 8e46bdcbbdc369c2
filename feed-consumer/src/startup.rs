use std::{str::FromStr, sync::Arc, time::Duration};

use async_channel::{Receiver, Sender};
use harbor_core::{DataMessage, StateRepository};
use reqwest::Url;
use tokio::{io::AsyncRead, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};
use tracker::{IngestionPipeline, PositionStore, SubscriptionHub};

use crate::{
    consumer::Consumer,
    error::{Error, Result},
    feed::FeedClient,
    settings::{Environment, Settings},
};

pub struct App {
    consumer: Consumer,
    pipeline: Arc<IngestionPipeline>,
    store: Arc<PositionStore>,
    hub: Arc<SubscriptionHub>,
    sender: Sender<DataMessage>,
    receiver: Receiver<DataMessage>,
    feed: Option<FeedClient>,
    shutdown: CancellationToken,
}

impl App {
    /// Wires the tracking core together: store, hub and pipeline are built
    /// once here and passed to every collaborator explicitly. A repository,
    /// when provided, rehydrates the store before anything else runs.
    pub async fn build(settings: Settings, repository: Option<Arc<dyn StateRepository>>) -> App {
        let (sender, receiver) =
            async_channel::bounded::<DataMessage>(settings.broadcast_buffer_size);

        let store = Arc::new(PositionStore::new(settings.history_capacity));
        let hub = Arc::new(SubscriptionHub::new(
            Arc::clone(&store),
            settings.subscriber_queue_capacity,
        ));

        if let Some(repository) = &repository {
            match repository.load_all().await {
                Ok(states) => {
                    info!(vessels = states.len(), "rehydrated position store");
                    store.rehydrate(states);
                }
                Err(e) => error!("failed to rehydrate position store: {e:?}"),
            }
        }

        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::clone(&store),
            Arc::clone(&hub),
            repository,
        ));

        let feed = if let Environment::Test = settings.environment {
            None
        } else {
            settings
                .api_address
                .as_ref()
                .map(|address| {
                    FeedClient::new(Url::from_str(address).unwrap(), settings.api_token.clone())
                })
        };

        App {
            consumer: Consumer::new(settings.commit_interval),
            pipeline,
            store,
            hub,
            sender,
            receiver,
            feed,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> Arc<PositionStore> {
        Arc::clone(&self.store)
    }

    pub fn hub(&self) -> Arc<SubscriptionHub> {
        Arc::clone(&self.hub)
    }

    pub fn pipeline(&self) -> Arc<IngestionPipeline> {
        Arc::clone(&self.pipeline)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) {
        let receiver = self.receiver.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let shutdown = self.shutdown.clone();

        let mut set = JoinSet::new();

        set.spawn(async move { pipeline.consume_loop(receiver, None).await });

        let signal_shutdown = self.shutdown.clone();
        set.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                signal_shutdown.cancel();
            }
        });

        let feed_shutdown = self.shutdown.clone();
        set.spawn(async move {
            loop {
                if feed_shutdown.is_cancelled() {
                    break;
                }
                // The consumer watches the shutdown token itself and flushes
                // buffered messages before returning, so it is never dropped
                // mid-flush here.
                self.run_feed_once().await;
                // If the feed api is unresponsive we dont want to
                // relentlessly spam it.
                tokio::select! {
                    _ = feed_shutdown.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {}
                }
            }
        });

        while let Some(result) = set.join_next().await {
            if shutdown.is_cancelled() {
                continue;
            }
            panic!("a core loop exited unexpectedly: {:?}", result);
        }
    }

    #[instrument(skip_all)]
    async fn run_feed_once(&self) {
        match self.run_feed_inner().await {
            Ok(()) => {}
            // The apply loop is gone and there is no way to recover.
            Err(e @ Error::ChannelClosed { .. }) => panic!("{e:?}"),
            Err(e) => error!("feed consumer failed: {e:?}"),
        }
    }

    async fn run_feed_inner(&self) -> Result<()> {
        let Some(feed) = &self.feed else {
            // Manual/import only deployment, nothing to stream.
            self.shutdown.cancelled().await;
            return Ok(());
        };
        let source = feed.streamer().await?;
        self.consumer
            .run(source, self.sender.clone(), self.shutdown.clone())
            .await
    }

    pub async fn run_test(
        self,
        source: impl AsyncRead + Unpin,
        process_confirmation: tokio::sync::mpsc::Sender<()>,
    ) -> Result<()> {
        let receiver = self.receiver.clone();
        let pipeline = Arc::clone(&self.pipeline);
        tokio::spawn(async move {
            pipeline
                .consume_loop(receiver, Some(process_confirmation))
                .await
        });
        self.consumer
            .run(source, self.sender.clone(), self.shutdown.clone())
            .await
    }
}
