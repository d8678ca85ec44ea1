//! Client core for the RAG admin console.
//!
//! Everything in this crate is platform-independent: typed wire models for
//! the backend's HTTP+SSE surface, the normalization layer for crawler
//! configuration input, the SSE frame decoder, and the view-state machines
//! (crawl config store, chat stream, ingest progress, job/log bookkeeping,
//! validation partitioning, persisted UI preferences). The `frontend` crate
//! wires these to fetch, localStorage, and the DOM.

pub mod chat;
pub mod config_store;
pub mod filename;
pub mod ingest;
pub mod jobs;
pub mod models;
pub mod normalize;
pub mod prefs;
pub mod sse;
pub mod validate;
