use serde::{Deserialize, Serialize};

use crate::flags::AccessFlags;

/// Opaque position marker inside one method's instruction stream.
///
/// Labels are allocated fresh for every method and are only meaningful
/// while that method's events are being delivered; they never appear in
/// the finished graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

/// What an access instruction does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessKind {
    FieldRead,
    FieldWrite,
    MethodCall,
    ConstructorCall,
}

impl AccessKind {
    /// Verb used when rendering the access for humans.
    pub fn description_verb(&self) -> &'static str {
        match self {
            AccessKind::FieldRead => "gets",
            AccessKind::FieldWrite => "sets",
            AccessKind::MethodCall | AccessKind::ConstructorCall => "calls",
        }
    }
}

/// Class-level declaration data, emitted once per file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    /// Fully qualified dotted name (`java.lang.Object` form)
    pub name: String,
    /// `None` only for the root object class
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub flags: AccessFlags,
}

/// Field or method declaration data.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberDeclaration {
    pub name: String,
    /// Raw JVM descriptor, e.g. `(Ljava/lang/String;)V`; exact even under overloading
    pub descriptor: String,
    pub flags: AccessFlags,
}

/// Statically encoded target of an access instruction, not yet resolved
/// against the import set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawTarget {
    /// Dotted owner class name; array owners keep their descriptor form
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

/// Ordered event protocol for one class file.
///
/// `ClassReader::read` drives exactly one visitor per file, in file order:
/// `visit_class`, then fields, then per method `visit_method_start`,
/// all try-catch registrations, the label/line/access stream in bytecode
/// offset order, and `visit_method_end`; finally `visit_end`.
pub trait ClassVisitor {
    fn visit_class(&mut self, declaration: ClassDeclaration);

    fn visit_field(&mut self, field: MemberDeclaration);

    fn visit_method_start(&mut self, method: MemberDeclaration);

    /// One exception-table row. `catch_type` is `None` for a finally handler.
    fn visit_try_catch_block(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<String>,
    );

    /// A labeled position in the instruction stream, not (yet) associated
    /// with a source line.
    fn visit_label(&mut self, label: Label);

    /// A source line association for a previously emitted label.
    fn visit_line_number(&mut self, line: u32, at: Label);

    /// A field/method/constructor access instruction. `line` is the most
    /// recently observed source line, or 0 if none was seen yet.
    fn visit_access(&mut self, kind: AccessKind, target: RawTarget, line: u32);

    fn visit_method_end(&mut self);

    fn visit_end(&mut self) {}
}
