//! # Herald Notion
//!
//! Wrapper for private Notion integrations, built on the shared herald
//! pipeline: bearer auth, versioned headers, bounded 429 retry, transparent
//! cursor pagination and the common error taxonomy.
//!
//! Reference: <https://developers.notion.com/reference>, version `2022-06-28`.
//!
//! Responses are returned as [`serde_json::Value`] in the exact shape the
//! API documents; this crate does not re-model Notion's object schemas.
//!
//! ```rust,ignore
//! use herald_notion::{NotionClient, NotionConfig};
//!
//! let client = NotionClient::connect(NotionConfig::new("secret_..."))?;
//! let page = client.get_page("59833787-2cf9-4fdf-8782-e53db20768a5")?;
//! ```

mod client;

pub use client::{
    CommentTarget, FieldUpdate, NewDatabase, NewPage, NotionClient, NotionConfig, Parent,
    SearchFilter, CURRENT_VERSION,
};
