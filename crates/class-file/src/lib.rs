//! # Archgraph Class File
//!
//! Streaming reader for compiled JVM class files.
//!
//! One class file in, one ordered event sequence out: the reader parses the
//! binary format (constant pool, declarations, code attributes) and drives a
//! [`ClassVisitor`] with class, member, label, line-number and access events
//! in file order. It never buffers cross-file state and never resolves names
//! against other classes; that is the importer's job.
//!
//! ## Architecture
//!
//! ```text
//! class file bytes
//!     │
//!     ├──> Constant Pool (all JVM tags, two-slot Long/Double handling)
//!     │
//!     ├──> Declarations (class, fields, methods + access flags)
//!     │
//!     └──> Code attribute, per method
//!          ├─> exception table  → visit_try_catch_block(start, end, handler, type)
//!          ├─> line number table → labels for referenced offsets
//!          └─> instruction walk  → visit_label / visit_line_number / visit_access
//! ```
//!
//! Malformed input fails with a [`ClassFileError`] scoped to the one file
//! being read; the reader carries no state across calls.

mod constant_pool;
mod error;
mod flags;
mod reader;
mod visitor;

pub use constant_pool::{Constant, ConstantPool};
pub use error::{ClassFileError, Result};
pub use flags::AccessFlags;
pub use reader::ClassReader;
pub use visitor::{
    AccessKind, ClassDeclaration, ClassVisitor, Label, MemberDeclaration, RawTarget,
};
