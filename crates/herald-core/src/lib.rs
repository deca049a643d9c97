//! # Herald Core
//!
//! Shared request pipeline for the herald API wrappers.
//!
//! Every wrapper in this workspace talks to its remote API through the same
//! four layers:
//!
//! 1. a blocking transport ([`HttpTransport`]) that performs one round trip
//!    and separates transport failures from application responses,
//! 2. a bounded rate-limit retry loop ([`RetryPolicy`]) reacting to HTTP 429,
//! 3. an error classifier ([`ErrorMap`]) translating status codes and
//!    embedded error codes into the shared [`ApiErrorKind`] taxonomy,
//! 4. a pagination aggregator ([`PageRules`]) that merges cursor-chained
//!    pages into one logical response.
//!
//! [`ApiClient`] wires the layers together; each wrapper crate configures one
//! instance for its API and builds its resource-oriented surface on top.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Generic rate-limited, classifying, paginating client |
//! | [`classify`] | Error taxonomy and per-API status/code mapping tables |
//! | [`error`] | Unified pipeline error type |
//! | [`http`] | Request/response envelopes and the transport seam |
//! | [`paginate`] | Cursor pagination conventions |
//! | [`retry`] | Rate-limit backoff policies |
//! | [`structure`] | Declared-shape validation of fetched resources |
//!
//! ## Concurrency
//!
//! Clients hold only immutable configuration after construction. Calls are
//! synchronous and block until a terminal outcome; the only pause is the
//! rate-limit sleep. A client behind an `Arc` may be called from any number
//! of threads.

pub mod classify;
pub mod client;
pub mod error;
pub mod http;
pub mod paginate;
pub mod retry;
pub mod structure;

pub use classify::{ApiError, ApiErrorKind, ErrorMap};
pub use client::ApiClient;
pub use error::Error;
pub use http::{
    HttpAuth, HttpMethod, HttpRequest, HttpResponse, HttpTransport, NoopTransport,
    ReqwestTransport, RequestBody, TransportError,
};
pub use paginate::PageRules;
pub use retry::{Backoff, RetryPolicy};
pub use structure::{validate_declared_types, ExpectedField, StructureError};
