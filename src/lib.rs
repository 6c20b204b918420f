//! # Resume RAG
//!
//! Retrieval-augmented question answering over people's resumes.
//!
//! Documents are chunked, embedded, and stored in exact inner-product
//! indexes, either one global index or one index per person. Queries are
//! routed to the people they mention, answered from each person's top
//! chunks by an external model, and merged into a single reply.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌────────────────┐
//! │   data/     │──▶│   Builder    │──▶│   storage/     │
//! │ PDF/TXT/MD  │   │ Chunk+Embed  │   │ index.bin+meta │
//! └─────────────┘   └──────────────┘   └───────┬────────┘
//!                                              │
//!        ┌──────────┐    ┌───────────┐    ┌────▼──────┐
//! query ─▶  Router  │───▶│ Composer  │───▶│ Retriever │
//!        │ (aliases)│    │ +Generator│    │ per person│
//!        └──────────┘    └───────────┘    └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rrag build --people                  # one index per data/<Name>/
//! rrag resolve "what does lucho know?"
//! rrag search "years of experience" --person Ana
//! rrag ask "compare Ana and Luis on backend work"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF/TXT/MD text extraction |
//! | [`corpus`] | Data directory scanning |
//! | [`chunk`] | Text cleaning and chunking |
//! | [`embedding`] | Embedding backends and the shared handle |
//! | [`index`] | Exact inner-product vector index |
//! | [`store`] | Persisted scopes (index + metadata) |
//! | [`ingest`] | Global and per-person index builds |
//! | [`retriever`] | Query-time retrieval |
//! | [`registry`] | People registry and query routing |
//! | [`generation`] | Text generation providers |
//! | [`answer`] | Prompt building and multi-person answers |
//! | [`stats`] | Index statistics |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod registry;
pub mod retriever;
pub mod stats;
pub mod store;
