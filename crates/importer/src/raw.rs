//! Mutable intermediate records for one class file.
//!
//! Everything in here exists only between a file's first visitor event and
//! the assembly barrier: targets are plain name+descriptor strings, never
//! resolved descriptors. The assembler consumes these and produces the
//! immutable domain model.

use std::collections::BTreeSet;

use archgraph_class_file::{AccessKind, ClassDeclaration, MemberDeclaration, RawTarget};
use archgraph_graph::MemberId;

use crate::error::Diagnostic;

/// One observed access with its target still unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct RawAccessRecord {
    pub origin: MemberId,
    pub kind: AccessKind,
    pub target: RawTarget,
    pub line_number: u32,
}

/// A frozen exception-handling block of one method, with unresolved
/// caught-throwable names. Only blocks whose start boundary received a line
/// number ever reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTryCatchBlock {
    pub caught_throwables: BTreeSet<String>,
    pub line_number: u32,
    pub accesses: Vec<RawAccessRecord>,
}

/// A fully read method or constructor, frozen at its `visit_method_end`.
#[derive(Debug)]
pub(crate) struct RawMember {
    pub declaration: MemberDeclaration,
    pub accesses: Vec<RawAccessRecord>,
    pub try_catch_blocks: Vec<RawTryCatchBlock>,
}

/// Everything one class file produced, frozen when the reader finished the
/// file. Ready for the assembler; no cross-class name has been resolved.
#[derive(Debug)]
pub(crate) struct RawClass {
    pub declaration: ClassDeclaration,
    pub fields: Vec<MemberDeclaration>,
    pub members: Vec<RawMember>,
    pub diagnostics: Vec<Diagnostic>,
}
