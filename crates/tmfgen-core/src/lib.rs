//! # tmfgen-core
//!
//! A library for turning legacy trace message format (TMF) descriptor files
//! into typed event schemas for manifest-based decoders.
//!
//! This crate provides the core functionality for:
//! - Scanning TMF text, including wrapped headers, `#enumv` blocks and
//!   duplicated PDB sections
//! - Mapping legacy `Item*` field types onto manifest wire types
//! - Allocating collision-free namespace, class and field names
//! - Rendering the resulting schema as C# source
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Line grammars and the event scanning state machine
//! - [`schema`]: Schema model, type mapping and schema construction
//! - [`naming`]: Identifier sanitizing and scoped name allocation
//! - [`render`]: C# output
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tmfgen_core::{CSharpIdentifiers, CSharpRenderer, NamespaceRegistry, TmfParser};
//!
//! // One registry keeps namespace names unique across every file parsed
//! let registry = NamespaceRegistry::shared();
//! let mut parser = TmfParser::new()
//!     .with_registry(registry)
//!     .with_normalizer(Arc::new(CSharpIdentifiers));
//!
//! let schema = parser.parse_file("./traces/matchmakinglocator.tmf")?;
//! println!("{}", CSharpRenderer::new().render(&schema));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`SchemaWriter`]: Visit a finished schema
//! - [`IdentifierNormalizer`]: Target-language identifier rules
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod error;
pub mod naming;
pub mod render;
pub mod scanner;
pub mod schema;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use naming::{IdentifierNormalizer, NameAllocator, NamespaceRegistry, Verbatim};
pub use render::{CSharpIdentifiers, CSharpRenderer, RenderConfig};
pub use scanner::EventScanner;
pub use schema::{
    parse_file, ClassNode, EventRecord, FieldRecord, NamespaceNode, NullWriter, ProviderHeader,
    Schema, SchemaBuilder, SchemaWriter, StatsWriter, TmfParser, TypeMapper, WireType,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
