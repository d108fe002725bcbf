use crate::error::{ClassFileError, Result};

/// One constant pool entry.
///
/// Only the entries the importer consumes carry structured payloads; the
/// rest are parsed for their byte length and kept as opaque markers so
/// indices stay correct.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Second slot of a Long/Double entry, or the unused slot 0
    Unusable,
}

/// The constant pool of one class file, indexed by the 1-based indices the
/// rest of the file uses. Long and Double entries occupy two slots.
#[derive(Debug)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn new(mut entries: Vec<Constant>) -> Self {
        // slot 0 is reserved by the format
        entries.insert(0, Constant::Unusable);
        Self { entries }
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        self.entries
            .get(index as usize)
            .ok_or_else(|| ClassFileError::bad_index(index, "any entry"))
    }

    /// Resolve a `Utf8` entry.
    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            _ => Err(ClassFileError::bad_index(index, "Utf8")),
        }
    }

    /// Resolve a `Class` entry to its binary name (`java/lang/Object` form).
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassFileError::bad_index(index, "Class")),
        }
    }

    /// Resolve a `NameAndType` entry to `(name, descriptor)`.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType { name_index, descriptor_index } => {
                Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            _ => Err(ClassFileError::bad_index(index, "NameAndType")),
        }
    }

    /// Resolve a field/method/interface-method ref to
    /// `(owner binary name, member name, member descriptor)`.
    pub fn member_ref(&self, index: u16) -> Result<(&str, &str, &str)> {
        let (class_index, name_and_type_index) = match self.get(index)? {
            Constant::FieldRef { class_index, name_and_type_index }
            | Constant::MethodRef { class_index, name_and_type_index }
            | Constant::InterfaceMethodRef { class_index, name_and_type_index } => {
                (*class_index, *name_and_type_index)
            }
            _ => Err(ClassFileError::bad_index(index, "Fieldref/Methodref"))?,
        };
        let owner = self.class_name(class_index)?;
        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Ok((owner, name, descriptor))
    }
}
