use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Url};
use serde::Serialize;
use snafu::ResultExt;
use tokio::io::AsyncRead;

use crate::error::{
    Result,
    error::{BodySnafu, FailedRequestSnafu, SendingRequestSnafu},
};

/// Streaming client for the upstream position feed.
pub struct FeedClient {
    api_address: Url,
    api_token: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct FeedFilterArgs {
    downsample: bool,
    #[serde(rename = "includePosition")]
    include_position: bool,
    #[serde(rename = "includeStatic")]
    include_static: bool,
}

impl FeedClient {
    pub fn new(api_address: Url, api_token: Option<String>) -> FeedClient {
        FeedClient {
            api_address,
            api_token,
            client: Client::new(),
        }
    }

    /// Returns the feed as a stream which will continuously receive data
    /// from the source.
    pub async fn streamer(&self) -> Result<impl AsyncRead> {
        let args = FeedFilterArgs {
            downsample: true,
            include_position: true,
            include_static: true,
        };

        let mut request = self.client.post(self.api_address.clone()).json(&args);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("bearer {token}"));
        }

        let response = request
            .header("Content-type", "application/json")
            .send()
            .await
            .context(SendingRequestSnafu)?;

        let status = response.status();
        if !status.is_success() {
            return FailedRequestSnafu {
                url: self.api_address.clone(),
                status,
                body: response.text().await.context(BodySnafu)?,
            }
            .fail();
        }

        let stream = response.bytes_stream();

        let stream = stream
            .map(|result| result.map_err(|e| std::io::Error::other(format!("{e:?}"))))
            .into_async_read();

        let compat = tokio_util::compat::FuturesAsyncReadCompatExt::compat(stream);

        Ok(compat)
    }
}
