//! # Archgraph Graph
//!
//! The finished, immutable object graph describing an imported codebase:
//! classes with resolved members, access edges between them, and the
//! exception-handling structure reconstructed from bytecode.
//!
//! Cross-references are name lookups into a name-indexed arena
//! ([`ClassGraph`]) rather than ownership pointers, so the inherently cyclic
//! domain (classes, members and accesses all referencing each other) stays
//! cycle-free in memory. References to classes outside the import set resolve to
//! [`ClassDescriptor::Stub`] entries carrying at least the name; whether a
//! descriptor is a stub is part of the query surface.
//!
//! This crate holds data types and queries only; the importer crate builds
//! and freezes the graph.

mod graph;
mod types;

pub use archgraph_class_file::AccessKind;
pub use graph::{ClassGraph, ClassRef};
pub use types::{
    AccessRecord, AccessTarget, Class, ClassDescriptor, Constructor, Field, MemberId, Method,
    Modifiers, StubClass, TryCatchBlock,
};

/// JVM-internal name of constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";
