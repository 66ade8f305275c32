//! # Netelem Architecture
//!
//! Netelem is the **attribute engine** behind a distributed-algorithm editor.
//! Networks, processes, channels and messages are modeled as composite nodes
//! holding typed attributes. The engine walks those trees, keeps an editing
//! session in sync with them and emits Rust source that rebuilds them.
//!
//! It is a library with no UI of its own. Windows, widgets and the runtime
//! that executes algorithms are collaborators that consume what it produces.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Consumers (reconcile/, emit/)                              │
//! │  - Session: links, pending edits, commit                    │
//! │  - CodeEmitter: generated units per target class            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Traversal (scan.rs)                                        │
//! │  - Depth-first scan driven by a Consumer                    │
//! │  - Inclusion policy belongs to the consumer                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Data (attributes/, model/)                                 │
//! │  - Values, types, ordered containers                        │
//! │  - Composite nodes and path addressing                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: The Attribute Tree Has One Owner
//!
//! Attributes never point back at their parents and nothing outside the tree
//! holds a reference into it between calls. Sessions remember attributes by
//! [`model::KeyPath`] and look them up again when needed, so a node can be
//! mutated freely between scans.
//!
//! ## No I/O in the Core
//!
//! The only file access is [`config::EditorConfig`] load/save. Generated code
//! is returned as text; presentation is returned as descriptors.
//!
//! ## Testing Strategy
//!
//! 1. **Unit tests** next to each module cover its own rules.
//! 2. **Integration tests** (`tests/`) cover the cross-module properties:
//!    round-trips, scan idempotence, toggle reversibility, emission
//!    determinism.
//!
//! ## Module Overview
//!
//! - [`attributes`]: Values, type registry, attribute containers
//! - [`model`]: Composite nodes, roles, key paths
//! - [`scan`]: Scan-and-report traversal and reusable consumers
//! - [`functions`]: Validator and presentation-policy registry
//! - [`presentation`]: Descriptors handed to UI collaborators
//! - [`reconcile`]: Editing sessions
//! - [`emit`]: Code generation
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod attributes;
pub mod config;
pub mod emit;
pub mod error;
pub mod functions;
pub mod model;
pub mod presentation;
pub mod reconcile;
pub mod scan;

pub use error::{Error, Result};
