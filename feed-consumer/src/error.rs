use snafu::{Location, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub))]
pub enum Error {
    #[snafu(display("Feed stream closed unexpectedly"))]
    StreamClosed {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Internal data message channel closed unexpectedly"))]
    ChannelClosed {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("Failed to send request to the feed"))]
    SendingRequest {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: reqwest::Error,
    },
    #[snafu(display("Failed to read the response body"))]
    Body {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: reqwest::Error,
    },
    #[snafu(display(
        "Non-ok response received from the feed, url '{url}', status '{status}', body '{body}'"
    ))]
    FailedRequest {
        #[snafu(implicit)]
        location: Location,
        url: reqwest::Url,
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Snafu)]
#[snafu(module, visibility(pub))]
pub enum FeedMessageError {
    #[snafu(display("Failed to deserialize a feed message"))]
    Deserialize {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: serde_json::Error,
    },
}
