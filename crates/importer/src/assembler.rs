//! The resolution barrier: raw per-class records from the whole run are
//! merged into one graph, with every cross-class name decided once as
//! either an imported class or an external stub.

use std::collections::{BTreeMap, BTreeSet};

use archgraph_graph::{
    AccessRecord, AccessTarget, Class, ClassDescriptor, ClassGraph, Constructor, Field, Method,
    Modifiers, StubClass, TryCatchBlock, CONSTRUCTOR_NAME,
};

use crate::raw::{RawAccessRecord, RawClass, RawTryCatchBlock};
use crate::source::AuxiliaryClasspath;

/// Resolves names against the set of imported classes, creating at most one
/// stub per external name for the whole run.
struct Resolver<'a> {
    imported: BTreeSet<String>,
    stubs: BTreeMap<String, StubClass>,
    auxiliary: &'a AuxiliaryClasspath,
}

impl<'a> Resolver<'a> {
    fn new(imported: BTreeSet<String>, auxiliary: &'a AuxiliaryClasspath) -> Self {
        Self { imported, stubs: BTreeMap::new(), auxiliary }
    }

    /// Imported names resolve to the class arena; everything else becomes
    /// (or reuses) a stub. Resolution order is imported-first so external
    /// types never shadow imported ones.
    fn descriptor(&mut self, name: &str) -> ClassDescriptor {
        if self.imported.contains(name) {
            return ClassDescriptor::Resolved(name.to_string());
        }

        if !self.stubs.contains_key(name) {
            let stub = self.enrich(name).unwrap_or_else(|| StubClass::bare(name));
            self.stubs.insert(name.to_string(), stub);
        }
        ClassDescriptor::Stub(name.to_string())
    }

    fn enrich(&self, name: &str) -> Option<StubClass> {
        // array "classes" have no class file to look up
        if name.starts_with('[') {
            return None;
        }
        let declaration = self.auxiliary.find_declaration(name)?;
        Some(StubClass {
            name: name.to_string(),
            superclass_name: declaration.superclass,
            interface_names: declaration.interfaces,
            modifiers: Some(Modifiers::new(declaration.flags.bits())),
        })
    }
}

/// Assemble the frozen graph from every raw class the run produced.
///
/// Must only run after all requested files have been read: the
/// stub-vs-resolved decision needs global knowledge of which names were
/// imported.
pub(crate) fn assemble(raw_classes: Vec<RawClass>, auxiliary: &AuxiliaryClasspath) -> ClassGraph {
    let mut by_name: BTreeMap<String, RawClass> = BTreeMap::new();
    for raw in raw_classes {
        let name = raw.declaration.name.clone();
        if by_name.insert(name.clone(), raw).is_some() {
            log::debug!("class {name} imported more than once, keeping the last record");
        }
    }

    let imported: BTreeSet<String> = by_name.keys().cloned().collect();
    let mut resolver = Resolver::new(imported, auxiliary);

    let mut classes = BTreeMap::new();
    for (name, raw) in by_name {
        let class = assemble_class(raw, &mut resolver);
        classes.insert(name, class);
    }

    let graph = ClassGraph::new(classes, resolver.stubs);
    log::info!(
        "assembled graph with {} imported class(es) and {} external stub(s)",
        graph.class_count(),
        graph.stub_count()
    );
    graph
}

fn assemble_class(raw: RawClass, resolver: &mut Resolver<'_>) -> Class {
    let class_name = raw.declaration.name;

    let superclass = raw
        .declaration
        .superclass
        .map(|superclass| resolver.descriptor(&superclass));
    let interfaces = raw
        .declaration
        .interfaces
        .iter()
        .map(|interface| resolver.descriptor(interface))
        .collect();

    let fields = raw
        .fields
        .into_iter()
        .map(|field| Field {
            owner: class_name.clone(),
            name: field.name,
            descriptor: field.descriptor,
            modifiers: Modifiers::new(field.flags.bits()),
        })
        .collect();

    let mut methods = Vec::new();
    let mut constructors = Vec::new();
    for member in raw.members {
        let accesses: Vec<AccessRecord> = member
            .accesses
            .iter()
            .map(|access| resolve_access(access, resolver))
            .collect();
        let try_catch_blocks: Vec<TryCatchBlock> = member
            .try_catch_blocks
            .iter()
            .map(|block| resolve_block(block, resolver))
            .collect();
        let modifiers = Modifiers::new(member.declaration.flags.bits());

        if member.declaration.name == CONSTRUCTOR_NAME {
            constructors.push(Constructor {
                owner: class_name.clone(),
                descriptor: member.declaration.descriptor,
                modifiers,
                accesses,
                try_catch_blocks,
            });
        } else {
            methods.push(Method {
                owner: class_name.clone(),
                name: member.declaration.name,
                descriptor: member.declaration.descriptor,
                modifiers,
                accesses,
                try_catch_blocks,
            });
        }
    }

    Class {
        name: class_name,
        superclass,
        interfaces,
        modifiers: Modifiers::new(raw.declaration.flags.bits()),
        fields,
        methods,
        constructors,
    }
}

fn resolve_access(raw: &RawAccessRecord, resolver: &mut Resolver<'_>) -> AccessRecord {
    AccessRecord {
        origin: raw.origin.clone(),
        target: AccessTarget {
            owner: resolver.descriptor(&raw.target.owner),
            name: raw.target.name.clone(),
            descriptor: raw.target.descriptor.clone(),
        },
        kind: raw.kind,
        line_number: raw.line_number,
    }
}

fn resolve_block(raw: &RawTryCatchBlock, resolver: &mut Resolver<'_>) -> TryCatchBlock {
    TryCatchBlock {
        caught_throwables: raw
            .caught_throwables
            .iter()
            .map(|throwable| resolver.descriptor(throwable))
            .collect(),
        line_number: raw.line_number,
        accesses: raw
            .accesses
            .iter()
            .map(|access| resolve_access(access, resolver))
            .collect(),
    }
}
