//! Byte-level builder for synthetic class files.
//!
//! Tests need exact control over constant pool layout, exception tables and
//! line number tables, which no real compiler output gives reliably, so the
//! fixtures encode the binary format directly.

use std::collections::HashMap;

use byteorder::{BigEndian, WriteBytesExt};

const MAGIC: u32 = 0xCAFEBABE;
const MAJOR_VERSION: u16 = 52; // Java 8

pub const RETURN: u8 = 0xb1;

/// Exception-table row: (start_pc, end_pc, handler_pc, catch type).
/// `None` catch type encodes a finally handler.
pub type ExceptionEntry = (u16, u16, u16, Option<String>);

/// Body of a method with a Code attribute.
#[derive(Default)]
pub struct MethodCode {
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionEntry>,
    /// (bytecode offset, source line)
    pub line_numbers: Vec<(u16, u16)>,
}

pub fn getstatic(field_ref: u16) -> Vec<u8> {
    with_index(0xb2, field_ref)
}

pub fn putstatic(field_ref: u16) -> Vec<u8> {
    with_index(0xb3, field_ref)
}

pub fn invokestatic(method_ref: u16) -> Vec<u8> {
    with_index(0xb8, method_ref)
}

pub fn invokespecial(method_ref: u16) -> Vec<u8> {
    with_index(0xb7, method_ref)
}

fn with_index(opcode: u8, index: u16) -> Vec<u8> {
    let mut bytes = vec![opcode];
    bytes.extend_from_slice(&index.to_be_bytes());
    bytes
}

/// Builds one well-formed class file, interning constant pool entries on
/// demand. Names are given in binary form (`com/example/A`).
pub struct ClassFileBuilder {
    constants: Vec<Vec<u8>>,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    this_class: u16,
    super_class: u16,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
}

impl ClassFileBuilder {
    pub fn new(name: &str) -> Self {
        let mut builder = Self {
            constants: Vec::new(),
            utf8: HashMap::new(),
            classes: HashMap::new(),
            this_class: 0,
            super_class: 0,
            fields: Vec::new(),
            methods: Vec::new(),
        };
        builder.this_class = builder.class(name);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    /// Intern a Utf8 entry, returning its pool index.
    pub fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&index) = self.utf8.get(value) {
            return index;
        }
        let mut entry = vec![1u8];
        entry
            .write_u16::<BigEndian>(value.len() as u16)
            .expect("write to vec");
        entry.extend_from_slice(value.as_bytes());
        let index = self.push(entry);
        self.utf8.insert(value.to_string(), index);
        index
    }

    /// Intern a Class entry for a binary name.
    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.classes.get(name) {
            return index;
        }
        let name_index = self.utf8(name);
        let mut entry = vec![7u8];
        entry.write_u16::<BigEndian>(name_index).expect("write to vec");
        let index = self.push(entry);
        self.classes.insert(name.to_string(), index);
        index
    }

    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(9, owner, name, descriptor)
    }

    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(10, owner, name, descriptor)
    }

    fn member_ref(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);

        let mut name_and_type = vec![12u8];
        name_and_type.write_u16::<BigEndian>(name_index).expect("write to vec");
        name_and_type
            .write_u16::<BigEndian>(descriptor_index)
            .expect("write to vec");
        let name_and_type_index = self.push(name_and_type);

        let mut entry = vec![tag];
        entry.write_u16::<BigEndian>(class_index).expect("write to vec");
        entry
            .write_u16::<BigEndian>(name_and_type_index)
            .expect("write to vec");
        self.push(entry)
    }

    pub fn field(&mut self, name: &str, descriptor: &str) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);

        let mut info = Vec::new();
        info.write_u16::<BigEndian>(0x0001).expect("write to vec"); // public
        info.write_u16::<BigEndian>(name_index).expect("write to vec");
        info.write_u16::<BigEndian>(descriptor_index).expect("write to vec");
        info.write_u16::<BigEndian>(0).expect("write to vec"); // no attributes
        self.fields.push(info);
    }

    pub fn method(&mut self, name: &str, descriptor: &str, code: Option<MethodCode>) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);

        // intern catch-type classes and attribute names before encoding
        let code = code.map(|code| {
            let rows: Vec<(u16, u16, u16, u16)> = code
                .exception_table
                .iter()
                .map(|(start, end, handler, catch_type)| {
                    let catch_index = catch_type
                        .as_deref()
                        .map(|name| self.class(name))
                        .unwrap_or(0);
                    (*start, *end, *handler, catch_index)
                })
                .collect();
            let code_name = self.utf8("Code");
            let table_name = self.utf8("LineNumberTable");
            (code, rows, code_name, table_name)
        });

        let mut info = Vec::new();
        info.write_u16::<BigEndian>(0x0001).expect("write to vec"); // public
        info.write_u16::<BigEndian>(name_index).expect("write to vec");
        info.write_u16::<BigEndian>(descriptor_index).expect("write to vec");

        match code {
            None => info.write_u16::<BigEndian>(0).expect("write to vec"),
            Some((code, rows, code_name, table_name)) => {
                info.write_u16::<BigEndian>(1).expect("write to vec");

                let mut payload = Vec::new();
                payload.write_u16::<BigEndian>(8).expect("write to vec"); // max_stack
                payload.write_u16::<BigEndian>(8).expect("write to vec"); // max_locals
                payload
                    .write_u32::<BigEndian>(code.code.len() as u32)
                    .expect("write to vec");
                payload.extend_from_slice(&code.code);
                payload
                    .write_u16::<BigEndian>(rows.len() as u16)
                    .expect("write to vec");
                for (start, end, handler, catch_index) in rows {
                    payload.write_u16::<BigEndian>(start).expect("write to vec");
                    payload.write_u16::<BigEndian>(end).expect("write to vec");
                    payload.write_u16::<BigEndian>(handler).expect("write to vec");
                    payload.write_u16::<BigEndian>(catch_index).expect("write to vec");
                }

                if code.line_numbers.is_empty() {
                    payload.write_u16::<BigEndian>(0).expect("write to vec");
                } else {
                    payload.write_u16::<BigEndian>(1).expect("write to vec");
                    payload.write_u16::<BigEndian>(table_name).expect("write to vec");
                    payload
                        .write_u32::<BigEndian>(2 + code.line_numbers.len() as u32 * 4)
                        .expect("write to vec");
                    payload
                        .write_u16::<BigEndian>(code.line_numbers.len() as u16)
                        .expect("write to vec");
                    for (pc, line) in &code.line_numbers {
                        payload.write_u16::<BigEndian>(*pc).expect("write to vec");
                        payload.write_u16::<BigEndian>(*line).expect("write to vec");
                    }
                }

                info.write_u16::<BigEndian>(code_name).expect("write to vec");
                info.write_u32::<BigEndian>(payload.len() as u32)
                    .expect("write to vec");
                info.extend_from_slice(&payload);
            }
        }

        self.methods.push(info);
    }

    pub fn build(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.write_u32::<BigEndian>(MAGIC).expect("write to vec");
        bytes.write_u16::<BigEndian>(0).expect("write to vec"); // minor
        bytes.write_u16::<BigEndian>(MAJOR_VERSION).expect("write to vec");

        bytes
            .write_u16::<BigEndian>(self.constants.len() as u16 + 1)
            .expect("write to vec");
        for constant in &self.constants {
            bytes.extend_from_slice(constant);
        }

        bytes.write_u16::<BigEndian>(0x0021).expect("write to vec"); // public super
        bytes.write_u16::<BigEndian>(self.this_class).expect("write to vec");
        bytes.write_u16::<BigEndian>(self.super_class).expect("write to vec");
        bytes.write_u16::<BigEndian>(0).expect("write to vec"); // no interfaces

        bytes
            .write_u16::<BigEndian>(self.fields.len() as u16)
            .expect("write to vec");
        for field in &self.fields {
            bytes.extend_from_slice(field);
        }

        bytes
            .write_u16::<BigEndian>(self.methods.len() as u16)
            .expect("write to vec");
        for method in &self.methods {
            bytes.extend_from_slice(method);
        }

        bytes.write_u16::<BigEndian>(0).expect("write to vec"); // no class attributes
        bytes
    }

    fn push(&mut self, entry: Vec<u8>) -> u16 {
        self.constants.push(entry);
        self.constants.len() as u16
    }
}
