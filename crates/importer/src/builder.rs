//! Conversion of visitor events into raw per-class records.

use archgraph_class_file::{
    AccessKind, ClassDeclaration, ClassVisitor, Label, MemberDeclaration, RawTarget,
};
use archgraph_graph::MemberId;

use crate::correlator::TryCatchCorrelator;
use crate::error::Diagnostic;
use crate::raw::{RawAccessRecord, RawClass, RawMember};

/// Accumulates one class file's events into a [`RawClass`].
///
/// One builder per file; the correlator state is reset for every method so
/// no block state can outlive the method that declared it.
#[derive(Default)]
pub(crate) struct RecordBuilder {
    declaration: Option<ClassDeclaration>,
    fields: Vec<MemberDeclaration>,
    members: Vec<RawMember>,
    current: Option<CurrentMember>,
    diagnostics: Vec<Diagnostic>,
}

struct CurrentMember {
    declaration: MemberDeclaration,
    accesses: Vec<RawAccessRecord>,
    correlator: TryCatchCorrelator,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the accumulated records. Returns `None` if no class
    /// declaration was ever seen (the reader failed before emitting one).
    pub fn finish(self) -> Option<RawClass> {
        let declaration = self.declaration?;
        Some(RawClass {
            declaration,
            fields: self.fields,
            members: self.members,
            diagnostics: self.diagnostics,
        })
    }

    fn class_name(&self) -> &str {
        self.declaration
            .as_ref()
            .map(|declaration| declaration.name.as_str())
            .unwrap_or("")
    }
}

impl ClassVisitor for RecordBuilder {
    fn visit_class(&mut self, declaration: ClassDeclaration) {
        self.declaration = Some(declaration);
    }

    fn visit_field(&mut self, field: MemberDeclaration) {
        self.fields.push(field);
    }

    fn visit_method_start(&mut self, method: MemberDeclaration) {
        self.current = Some(CurrentMember {
            declaration: method,
            accesses: Vec::new(),
            correlator: TryCatchCorrelator::new(),
        });
    }

    fn visit_try_catch_block(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<String>,
    ) {
        if let Some(current) = self.current.as_mut() {
            match catch_type {
                Some(throwable) => {
                    current.correlator.register_try_catch(start, end, handler, throwable)
                }
                None => current.correlator.register_try_finally(start, end, handler),
            }
        }
    }

    fn visit_label(&mut self, label: Label) {
        if let Some(current) = self.current.as_mut() {
            current.correlator.on_label(label);
        }
    }

    fn visit_line_number(&mut self, line: u32, at: Label) {
        if let Some(current) = self.current.as_mut() {
            current.correlator.on_line_number(at, line);
        }
    }

    fn visit_access(&mut self, kind: AccessKind, target: RawTarget, line: u32) {
        let origin_class = self.class_name().to_string();
        let Some(current) = self.current.as_mut() else {
            return;
        };

        let access = RawAccessRecord {
            origin: MemberId {
                class_name: origin_class,
                name: current.declaration.name.clone(),
                descriptor: current.declaration.descriptor.clone(),
            },
            kind,
            target,
            line_number: line,
        };
        if current.correlator.is_active() {
            current.correlator.record_access(&access);
        }
        current.accesses.push(access);
    }

    fn visit_method_end(&mut self) {
        let Some(mut current) = self.current.take() else {
            return;
        };

        let finished = current.correlator.finish_method();
        if finished.dropped > 0 {
            self.diagnostics.push(Diagnostic::UnmatchedTryCatchBlocks {
                class_name: self.class_name().to_string(),
                member: format!(
                    "{}{}",
                    current.declaration.name, current.declaration.descriptor
                ),
                dropped: finished.dropped,
            });
        }

        self.members.push(RawMember {
            declaration: current.declaration,
            accesses: current.accesses,
            try_catch_blocks: finished.blocks,
        });
    }
}
