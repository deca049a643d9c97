use thiserror::Error;

use crate::classify::{ApiError, ApiErrorKind};
use crate::http::TransportError;
use crate::structure::StructureError;

/// Every failure a pipeline call can surface. One terminal outcome per
/// logical call: success, a variant below, never a partial response.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed URL, connection failure, or a broken response stream.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The remote kept answering 429 past the configured retry bound.
    #[error("gave up after {attempts} rate-limited attempts on '{url}'")]
    MaxRetriesReached { url: String, attempts: u32 },

    /// The pagination chain hit the page ceiling without terminating.
    #[error("page ceiling of {pages} reached while paginating '{url}'")]
    MaxPagesReached { url: String, pages: u32 },

    /// Status 200 but the body is not parseable JSON. A protocol violation
    /// by the remote, distinct from any classified API error.
    #[error("status 200 from '{url}' carried a non-json body: {reason}")]
    JsonOn200 { url: String, reason: String },

    /// Error status with an unparseable body: something between us and the
    /// API answered with an opaque error page.
    #[error("http error {status} from '{url}' with a non-json body")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    /// Error status with a parseable body, classified per the API's map.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A fetched resource does not match the caller-supplied schema.
    #[error(transparent)]
    Structure(#[from] StructureError),
}

impl Error {
    /// The classified kind, when this is an application-level error.
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api(error) => Some(error.kind),
            _ => None,
        }
    }

    pub fn is_api_kind(&self, kind: ApiErrorKind) -> bool {
        self.api_kind() == Some(kind)
    }
}
