use async_channel::Sender;
use futures::StreamExt;
use harbor_core::DataMessage;
use snafu::ResultExt;
use tokio::io::AsyncRead;
use tokio_util::{
    codec::{FramedRead, LinesCodec, LinesCodecError},
    sync::CancellationToken,
};
use tracing::{Level, event, instrument};

use crate::{
    error::{
        FeedMessageError, Result,
        error::{ChannelClosedSnafu, StreamClosedSnafu},
        feed_message_error::DeserializeSnafu,
    },
    models::{FeedMessage, FeedMessageType, MessageType, PositionReportWrapper},
};

pub struct Consumer {
    commit_interval: std::time::Duration,
}

impl Consumer {
    pub fn new(commit_interval: std::time::Duration) -> Consumer {
        Consumer { commit_interval }
    }

    /// Reads line-delimited feed messages from `source`, batching them into
    /// one data message per commit interval. Returns an error when the
    /// stream closes; returns cleanly, flushing buffered messages first,
    /// when `shutdown` is cancelled.
    pub async fn run(
        &self,
        source: impl AsyncRead + Unpin,
        sender: Sender<DataMessage>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let codec = LinesCodec::new_with_max_length(1000);
        let mut framed_read = FramedRead::new(source, codec);

        // Retains the capacity of the largest batch seen within a commit
        // interval for the lifetime of the stream.
        let mut buffer = Vec::new();

        let mut interval = tokio::time::interval(self.commit_interval);

        loop {
            tokio::select! {
                message = framed_read.next() => {
                    match message {
                        Some(message) => buffer.push(message),
                        None => return StreamClosedSnafu.fail(),
                    }
                }
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        process_messages(buffer.drain(..), &sender).await?;
                    }
                }
                _ = shutdown.cancelled() => {
                    if !buffer.is_empty() {
                        process_messages(buffer.drain(..), &sender).await?;
                    }
                    return Ok(());
                }
            }
        }
    }
}

#[instrument(skip(messages, sender), fields(app.num_messages))]
async fn process_messages<T>(messages: T, sender: &Sender<DataMessage>) -> Result<()>
where
    T: IntoIterator<Item = std::result::Result<String, LinesCodecError>>,
{
    let mut data_message = DataMessage::default();
    let mut num_messages = 0;
    for message in messages {
        num_messages += 1;
        match message {
            Err(e) => event!(Level::ERROR, "failed to consume feed message: {:?}", e),
            Ok(message) => match parse_message(message) {
                Err(e) => event!(Level::ERROR, "{:?}", e),
                Ok(message) => match message {
                    FeedMessage::Static(m) => data_message.static_updates.push(m.into()),
                    FeedMessage::Position(m) => {
                        if let Some(report) = PositionReportWrapper::from(m).0 {
                            data_message.positions.push(report)
                        }
                    }
                },
            },
        }
    }

    // Can only fail if the channel is closed.
    sender
        .send(data_message)
        .await
        .map_err(|_| ChannelClosedSnafu.build())?;

    tracing::Span::current().record("app.num_messages", num_messages);

    Ok(())
}

fn parse_message(message: String) -> std::result::Result<FeedMessage, FeedMessageError> {
    let message_type: MessageType =
        serde_json::from_str(&message).context(DeserializeSnafu)?;

    match message_type.message_type {
        FeedMessageType::Position => {
            let val = serde_json::from_str(&message).context(DeserializeSnafu)?;
            Ok(FeedMessage::Position(val))
        }
        FeedMessageType::Static => {
            let val = serde_json::from_str(&message).context(DeserializeSnafu)?;
            Ok(FeedMessage::Static(val))
        }
    }
}
