use snafu::{Location, Snafu};

pub type CoreResult<T> = std::result::Result<T, Error>;

/// Errors surfaced by port implementations. Domain rejections (invalid or
/// stale reports) are outcomes, not errors, and never appear here.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Repository operation failed '{error_stringified}'"))]
    Repository {
        #[snafu(implicit)]
        location: Location,
        error_stringified: String,
    },
}
