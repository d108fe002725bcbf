use std::collections::BTreeSet;

use archgraph_class_file::{AccessFlags, AccessKind};
use serde::{Deserialize, Serialize};

/// Reference to a class by name, tagged with its resolution outcome.
///
/// `Resolved` means the class's own bytecode was part of the import set and
/// the name is a key into the graph's class arena. `Stub` means the class
/// was only ever referenced (e.g. a platform library type). The decision is
/// made once, at assembly time, and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassDescriptor {
    Resolved(String),
    Stub(String),
}

impl ClassDescriptor {
    pub fn name(&self) -> &str {
        match self {
            ClassDescriptor::Resolved(name) | ClassDescriptor::Stub(name) => name,
        }
    }

    /// Consumers use this to skip analyzing behavior of external types.
    pub fn is_stub(&self) -> bool {
        matches!(self, ClassDescriptor::Stub(_))
    }
}

/// Modifier word of a class or member, decoded from the JVM access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Modifiers {
    bits: u16,
}

impl Modifiers {
    pub fn new(bits: u16) -> Self {
        Self { bits }
    }

    fn has(&self, flag: AccessFlags) -> bool {
        AccessFlags::from_bits_truncate(self.bits).contains(flag)
    }

    pub fn is_public(&self) -> bool {
        self.has(AccessFlags::PUBLIC)
    }

    pub fn is_private(&self) -> bool {
        self.has(AccessFlags::PRIVATE)
    }

    pub fn is_protected(&self) -> bool {
        self.has(AccessFlags::PROTECTED)
    }

    pub fn is_static(&self) -> bool {
        self.has(AccessFlags::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.has(AccessFlags::FINAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.has(AccessFlags::ABSTRACT)
    }

    pub fn is_interface(&self) -> bool {
        self.has(AccessFlags::INTERFACE)
    }

    pub fn is_enum(&self) -> bool {
        self.has(AccessFlags::ENUM)
    }

    pub fn is_synthetic(&self) -> bool {
        self.has(AccessFlags::SYNTHETIC)
    }
}

impl From<AccessFlags> for Modifiers {
    fn from(flags: AccessFlags) -> Self {
        Self { bits: flags.bits() }
    }
}

/// Identity of a member inside the graph: owning class name plus the exact
/// name/descriptor pair. A name-keyed lookup, not an ownership pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}{}", self.class_name, self.name, self.descriptor)
    }
}

/// Target side of an access: owner descriptor plus the exact member
/// signature. Exact even under overloading, because the descriptor encodes
/// the full parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessTarget {
    pub owner: ClassDescriptor,
    pub name: String,
    pub descriptor: String,
}

/// One observed field/method/constructor use by a member.
///
/// The origin is always a member of a fully imported class; the target may
/// point at a stub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessRecord {
    pub origin: MemberId,
    pub target: AccessTarget,
    pub kind: AccessKind,
    pub line_number: u32,
}

impl AccessRecord {
    /// Human-readable rendering, e.g.
    /// `com.example.A.run()V calls com.example.B.go()V in line 12`.
    pub fn description(&self) -> String {
        format!(
            "{} {} {}.{}{} in line {}",
            self.origin,
            self.kind.description_verb(),
            self.target.owner.name(),
            self.target.name,
            self.target.descriptor,
            self.line_number
        )
    }
}

/// A reconstructed exception-handling region of one method.
///
/// `caught_throwables` is empty only for a pure finally block. The line
/// number comes from the block's start boundary; `accesses` holds every
/// access record whose instruction lexically falls inside the live range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TryCatchBlock {
    pub caught_throwables: BTreeSet<ClassDescriptor>,
    pub line_number: u32,
    pub accesses: BTreeSet<AccessRecord>,
}

impl TryCatchBlock {
    pub fn is_finally(&self) -> bool {
        self.caught_throwables.is_empty()
    }
}

/// A declared field of an imported class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Name of the declaring class (key into the graph)
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub modifiers: Modifiers,
}

/// A declared method of an imported class, with the accesses its
/// instructions generated and the exception-handling blocks reconstructed
/// from its bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub modifiers: Modifiers,
    pub accesses: Vec<AccessRecord>,
    pub try_catch_blocks: Vec<TryCatchBlock>,
}

impl Method {
    pub fn id(&self) -> MemberId {
        MemberId {
            class_name: self.owner.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }

    /// Accesses of one kind, e.g. only constructor calls.
    pub fn accesses_of_kind(&self, kind: AccessKind) -> impl Iterator<Item = &AccessRecord> {
        self.accesses.iter().filter(move |access| access.kind == kind)
    }
}

/// A declared constructor (`<init>`) of an imported class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constructor {
    pub owner: String,
    pub descriptor: String,
    pub modifiers: Modifiers,
    pub accesses: Vec<AccessRecord>,
    pub try_catch_blocks: Vec<TryCatchBlock>,
}

impl Constructor {
    pub fn id(&self) -> MemberId {
        MemberId {
            class_name: self.owner.clone(),
            name: crate::CONSTRUCTOR_NAME.to_string(),
            descriptor: self.descriptor.clone(),
        }
    }
}

/// A fully imported class with resolved members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    /// `None` only for the root object class
    pub superclass: Option<ClassDescriptor>,
    pub interfaces: Vec<ClassDescriptor>,
    pub modifiers: Modifiers,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub constructors: Vec<Constructor>,
}

impl Class {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Exact lookup by name and descriptor; overloads never collide.
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    pub fn constructor(&self, descriptor: &str) -> Option<&Constructor> {
        self.constructors
            .iter()
            .find(|constructor| constructor.descriptor == descriptor)
    }

    /// All access records originating from this class's methods and
    /// constructors.
    pub fn accesses(&self) -> impl Iterator<Item = &AccessRecord> {
        self.methods
            .iter()
            .flat_map(|method| method.accesses.iter())
            .chain(
                self.constructors
                    .iter()
                    .flat_map(|constructor| constructor.accesses.iter()),
            )
    }
}

/// Minimal metadata for a class that was referenced but never imported.
///
/// Everything beyond the name is optional enrichment from an auxiliary
/// resolution source; a bare stub carries the name alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubClass {
    pub name: String,
    pub superclass_name: Option<String>,
    pub interface_names: Vec<String>,
    pub modifiers: Option<Modifiers>,
}

impl StubClass {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass_name: None,
            interface_names: Vec::new(),
            modifiers: None,
        }
    }
}
