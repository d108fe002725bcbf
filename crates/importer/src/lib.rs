//! # Archgraph Importer
//!
//! Turns a set of compiled class files into the queryable
//! [`ClassGraph`](archgraph_graph::ClassGraph).
//!
//! ## Architecture
//!
//! ```text
//! sources (directories, archives, buffers)
//!     │
//!     ├──> per file, on a worker pool:
//!     │      ClassReader events
//!     │        ├─> RecordBuilder (raw members, raw accesses)
//!     │        └─> TryCatchCorrelator (block boundaries vs. instructions)
//!     │      ──> frozen RawClass
//!     │
//!     ├──> barrier: every requested file has been read
//!     │
//!     └──> Assembler
//!            ├─ imported name → Resolved descriptor
//!            ├─ external name → one Stub per name (+ optional enrichment
//!            │                  from the auxiliary classpath)
//!            └─ frozen, immutable ClassGraph
//! ```
//!
//! Malformed files are isolated per file (collect-and-continue by default,
//! fail-fast on request); inconsistent exception metadata inside one method
//! degrades to a [`Diagnostic`] instead of failing the run.

mod assembler;
mod builder;
mod correlator;
mod error;
mod importer;
mod raw;
mod source;

pub use error::{Diagnostic, ImportError, ImportFailure, Result};
pub use importer::{ClassFileImporter, ImportOptions, ImportResult, MalformedPolicy};
pub use source::ClassFileSource;
