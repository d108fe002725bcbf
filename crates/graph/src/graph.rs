use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Class, ClassDescriptor, StubClass};

/// A resolved descriptor lookup: either a fully imported class or the stub
/// standing in for an external one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassRef<'a> {
    Resolved(&'a Class),
    Stub(&'a StubClass),
}

impl<'a> ClassRef<'a> {
    pub fn name(&self) -> &str {
        match self {
            ClassRef::Resolved(class) => &class.name,
            ClassRef::Stub(stub) => &stub.name,
        }
    }

    pub fn as_class(&self) -> Option<&'a Class> {
        match self {
            ClassRef::Resolved(class) => Some(class),
            ClassRef::Stub(_) => None,
        }
    }
}

/// The finished, immutable object graph of an import run.
///
/// Classes and stubs live in name-indexed arenas; every cross-reference in
/// the model is a name lookup into these maps rather than an ownership
/// pointer, so the cyclic references between classes, members and accesses
/// need no special handling. Both maps are ordered, which makes two imports
/// of identical input compare equal.
///
/// Once constructed the graph never mutates and is safe for unsynchronized
/// concurrent reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassGraph {
    classes: BTreeMap<String, Class>,
    stubs: BTreeMap<String, StubClass>,
}

impl ClassGraph {
    pub fn new(classes: BTreeMap<String, Class>, stubs: BTreeMap<String, StubClass>) -> Self {
        Self { classes, stubs }
    }

    /// Look up a fully imported class by name.
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(name)
    }

    /// Look up a stub by name.
    pub fn stub(&self, name: &str) -> Option<&StubClass> {
        self.stubs.get(name)
    }

    /// Follow a descriptor to whatever it resolved to.
    pub fn resolve(&self, descriptor: &ClassDescriptor) -> Option<ClassRef<'_>> {
        match descriptor {
            ClassDescriptor::Resolved(name) => self.classes.get(name).map(ClassRef::Resolved),
            ClassDescriptor::Stub(name) => self.stubs.get(name).map(ClassRef::Stub),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// All imported classes, in name order.
    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.values()
    }

    /// All external stubs, in name order.
    pub fn stubs(&self) -> impl Iterator<Item = &StubClass> {
        self.stubs.values()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn stub_count(&self) -> usize {
        self.stubs.len()
    }
}
