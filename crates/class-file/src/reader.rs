use std::collections::BTreeMap;
use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use crate::constant_pool::{Constant, ConstantPool};
use crate::error::{ClassFileError, Result};
use crate::flags::AccessFlags;
use crate::visitor::{
    AccessKind, ClassDeclaration, ClassVisitor, Label, MemberDeclaration, RawTarget,
};

type Endian = BigEndian;

const MAGIC: u32 = 0xCAFEBABE;

// Field/method access opcodes
const GETSTATIC: u8 = 0xb2;
const PUTSTATIC: u8 = 0xb3;
const GETFIELD: u8 = 0xb4;
const PUTFIELD: u8 = 0xb5;
const INVOKEVIRTUAL: u8 = 0xb6;
const INVOKESPECIAL: u8 = 0xb7;
const INVOKESTATIC: u8 = 0xb8;
const INVOKEINTERFACE: u8 = 0xb9;
const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const WIDE: u8 = 0xc4;
const IINC: u8 = 0x84;

const CONSTRUCTOR_NAME: &str = "<init>";

/// Streaming reader for a single class file.
///
/// Stateless across files: every call to [`ClassReader::read`] parses one
/// byte buffer and drives one visitor with the full ordered event sequence.
pub struct ClassReader<'a> {
    r: Cursor<&'a [u8]>,
}

#[derive(Debug)]
struct ExceptionTableEntry {
    start_pc: u16,
    end_pc: u16,
    handler_pc: u16,
    catch_type: u16,
}

impl<'a> ClassReader<'a> {
    /// Parse `bytes` and emit the full event sequence into `visitor`.
    pub fn read(bytes: &'a [u8], visitor: &mut impl ClassVisitor) -> Result<()> {
        let mut reader = Self { r: Cursor::new(bytes) };
        reader.read_class(visitor)
    }

    /// Parse only the class declaration (name, superclass, interfaces,
    /// flags), stopping before fields and methods. Used to enrich stub
    /// descriptors without triggering a full import.
    pub fn read_declaration(bytes: &'a [u8]) -> Result<ClassDeclaration> {
        let mut reader = Self { r: Cursor::new(bytes) };
        reader.parse_header()?;
        let pool = reader.parse_constant_pool()?;
        reader.parse_declaration(&pool)
    }

    fn read_class(&mut self, visitor: &mut impl ClassVisitor) -> Result<()> {
        self.parse_header()?;
        let pool = self.parse_constant_pool()?;

        let declaration = self.parse_declaration(&pool)?;
        log::debug!("reading class {}", declaration.name);
        visitor.visit_class(declaration);

        let fields_count = self.read_u16()?;
        for _ in 0..fields_count {
            let field = self.parse_member_declaration(&pool, |_, _| Ok(()))?;
            visitor.visit_field(field);
        }

        let methods_count = self.read_u16()?;
        for _ in 0..methods_count {
            let mut code: Option<Vec<u8>> = None;
            let method = self.parse_member_declaration(&pool, |name, bytes| {
                if name == "Code" {
                    code = Some(bytes.to_vec());
                }
                Ok(())
            })?;
            visitor.visit_method_start(method);
            if let Some(code) = code {
                emit_code_events(&pool, &code, visitor)?;
            }
            visitor.visit_method_end();
        }

        // class-level attributes carry nothing the graph needs
        visitor.visit_end();
        Ok(())
    }

    fn parse_header(&mut self) -> Result<()> {
        match self.read_u32()? {
            MAGIC => {}
            magic => return Err(ClassFileError::InvalidMagic(magic)),
        }
        let _minor = self.read_u16()?;
        let _major = self.read_u16()?;
        Ok(())
    }

    fn parse_declaration(&mut self, pool: &ConstantPool) -> Result<ClassDeclaration> {
        let flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let this_class = self.read_u16()?;
        let super_class = self.read_u16()?;

        let name = dotted(pool.class_name(this_class)?);
        let superclass = if super_class == 0 {
            None
        } else {
            Some(dotted(pool.class_name(super_class)?))
        };

        let interfaces_count = self.read_u16()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            let index = self.read_u16()?;
            interfaces.push(dotted(pool.class_name(index)?));
        }

        Ok(ClassDeclaration { name, superclass, interfaces, flags })
    }

    /// Parse one field_info/method_info record. `on_attribute` sees every
    /// attribute's resolved name and raw payload.
    fn parse_member_declaration(
        &mut self,
        pool: &ConstantPool,
        mut on_attribute: impl FnMut(&str, &[u8]) -> Result<()>,
    ) -> Result<MemberDeclaration> {
        let flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        let attributes_count = self.read_u16()?;
        for _ in 0..attributes_count {
            let attribute_name_index = self.read_u16()?;
            let length = self.read_u32()? as usize;
            let bytes = self.take(length)?;
            on_attribute(pool.utf8(attribute_name_index)?, bytes)?;
        }

        Ok(MemberDeclaration {
            name: pool.utf8(name_index)?.to_string(),
            descriptor: pool.utf8(descriptor_index)?.to_string(),
            flags,
        })
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.read_u16()?;
        if constant_pool_count == 0 {
            return Err(ClassFileError::malformed("constant pool count is zero"));
        }

        let mut remaining = constant_pool_count as usize - 1;
        let mut entries = Vec::with_capacity(remaining);
        while remaining > 0 {
            let (constant, slots) = self.parse_constant()?;
            if slots > remaining {
                return Err(ClassFileError::malformed("constant pool overrun"));
            }
            entries.push(constant);
            // Long/Double take a second, unusable slot
            for _ in 1..slots {
                entries.push(Constant::Unusable);
            }
            remaining -= slots;
        }
        Ok(ConstantPool::new(entries))
    }

    fn parse_constant(&mut self) -> Result<(Constant, usize)> {
        let tag = self.read_u8()?;
        let constant = match tag {
            1 => {
                let length = self.read_u16()? as usize;
                let bytes = self.take(length)?;
                Constant::Utf8(modified_utf8(bytes)?)
            }
            3 => Constant::Integer(self.r.read_i32::<Endian>()?),
            4 => Constant::Float(f32::from_bits(self.read_u32()?)),
            5 => {
                let constant = Constant::Long(self.r.read_i64::<Endian>()?);
                return Ok((constant, 2));
            }
            6 => {
                let constant = Constant::Double(f64::from_bits(self.r.read_u64::<Endian>()?));
                return Ok((constant, 2));
            }
            7 => Constant::Class { name_index: self.read_u16()? },
            8 => Constant::String { string_index: self.read_u16()? },
            9 => Constant::FieldRef {
                class_index: self.read_u16()?,
                name_and_type_index: self.read_u16()?,
            },
            10 => Constant::MethodRef {
                class_index: self.read_u16()?,
                name_and_type_index: self.read_u16()?,
            },
            11 => Constant::InterfaceMethodRef {
                class_index: self.read_u16()?,
                name_and_type_index: self.read_u16()?,
            },
            12 => Constant::NameAndType {
                name_index: self.read_u16()?,
                descriptor_index: self.read_u16()?,
            },
            15 => Constant::MethodHandle {
                reference_kind: self.read_u8()?,
                reference_index: self.read_u16()?,
            },
            16 => Constant::MethodType { descriptor_index: self.read_u16()? },
            17 => Constant::Dynamic {
                bootstrap_method_attr_index: self.read_u16()?,
                name_and_type_index: self.read_u16()?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method_attr_index: self.read_u16()?,
                name_and_type_index: self.read_u16()?,
            },
            19 => Constant::Module { name_index: self.read_u16()? },
            20 => Constant::Package { name_index: self.read_u16()? },
            tag => return Err(ClassFileError::UnsupportedConstantTag(tag)),
        };
        Ok((constant, 1))
    }

    /// Borrow `length` bytes at the current position and advance past them.
    fn take(&mut self, length: usize) -> Result<&'a [u8]> {
        let start = self.r.position() as usize;
        let buf = *self.r.get_ref();
        let end = start
            .checked_add(length)
            .filter(|end| *end <= buf.len())
            .ok_or_else(|| ClassFileError::malformed("truncated class file"))?;
        self.r.set_position(end as u64);
        Ok(&buf[start..end])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }
}

/// Parse a `Code` attribute payload and emit the per-method event stream:
/// try-catch registrations first, then labels, line numbers and accesses in
/// bytecode offset order.
fn emit_code_events(
    pool: &ConstantPool,
    code_attribute: &[u8],
    visitor: &mut impl ClassVisitor,
) -> Result<()> {
    let mut r = Cursor::new(code_attribute);
    let _max_stack = r.read_u16::<Endian>()?;
    let _max_locals = r.read_u16::<Endian>()?;
    let code_length = r.read_u32::<Endian>()? as usize;

    let code_start = r.position() as usize;
    let code = code_attribute
        .get(code_start..code_start + code_length)
        .ok_or_else(|| ClassFileError::malformed("truncated code attribute"))?;
    r.set_position((code_start + code_length) as u64);

    let exception_table_length = r.read_u16::<Endian>()?;
    let mut exception_table = Vec::with_capacity(exception_table_length as usize);
    for _ in 0..exception_table_length {
        exception_table.push(ExceptionTableEntry {
            start_pc: r.read_u16::<Endian>()?,
            end_pc: r.read_u16::<Endian>()?,
            handler_pc: r.read_u16::<Endian>()?,
            catch_type: r.read_u16::<Endian>()?,
        });
    }

    // line number table(s) live in the code attribute's own attribute list
    let mut line_by_pc: BTreeMap<u32, u32> = BTreeMap::new();
    let attributes_count = r.read_u16::<Endian>()?;
    for _ in 0..attributes_count {
        let name_index = r.read_u16::<Endian>()?;
        let length = r.read_u32::<Endian>()? as usize;
        if pool.utf8(name_index)? == "LineNumberTable" {
            let table_length = r.read_u16::<Endian>()?;
            for _ in 0..table_length {
                let start_pc = r.read_u16::<Endian>()? as u32;
                let line_number = r.read_u16::<Endian>()? as u32;
                line_by_pc.entry(start_pc).or_insert(line_number);
            }
        } else {
            let position = r.position() + length as u64;
            if position > code_attribute.len() as u64 {
                return Err(ClassFileError::malformed("truncated code attribute"));
            }
            r.set_position(position);
        }
    }

    // one label per referenced offset, numbered in ascending offset order
    let mut labels: BTreeMap<u32, Label> = BTreeMap::new();
    for entry in &exception_table {
        labels.entry(entry.start_pc as u32).or_insert(Label(0));
        labels.entry(entry.end_pc as u32).or_insert(Label(0));
        labels.entry(entry.handler_pc as u32).or_insert(Label(0));
    }
    for pc in line_by_pc.keys() {
        labels.entry(*pc).or_insert(Label(0));
    }
    for (next, label) in labels.values_mut().enumerate() {
        *label = Label(next as u32);
    }

    for entry in &exception_table {
        let catch_type = if entry.catch_type == 0 {
            None
        } else {
            Some(dotted(pool.class_name(entry.catch_type)?))
        };
        visitor.visit_try_catch_block(
            labels[&(entry.start_pc as u32)],
            labels[&(entry.end_pc as u32)],
            labels[&(entry.handler_pc as u32)],
            catch_type,
        );
    }

    walk_instructions(pool, code, &labels, &line_by_pc, visitor)
}

/// Walk the instruction stream front to back, emitting label, line-number
/// and access events at the right offsets.
fn walk_instructions(
    pool: &ConstantPool,
    code: &[u8],
    labels: &BTreeMap<u32, Label>,
    line_by_pc: &BTreeMap<u32, u32>,
    visitor: &mut impl ClassVisitor,
) -> Result<()> {
    let mut pc: usize = 0;
    let mut current_line: u32 = 0;

    while pc < code.len() {
        if let Some(&label) = labels.get(&(pc as u32)) {
            visitor.visit_label(label);
            if let Some(&line) = line_by_pc.get(&(pc as u32)) {
                current_line = line;
                visitor.visit_line_number(line, label);
            }
        }

        let opcode = code[pc];
        if let Some(kind) = access_kind(opcode) {
            let index = u16_at(code, pc + 1)?;
            let (owner, name, descriptor) = pool.member_ref(index)?;
            let kind = match kind {
                AccessKind::MethodCall if name == CONSTRUCTOR_NAME => AccessKind::ConstructorCall,
                kind => kind,
            };
            let target = RawTarget {
                owner: dotted(owner),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            };
            visitor.visit_access(kind, target, current_line);
        }

        pc += instruction_length(code, pc)?;
    }

    // an exception range may end exactly at the end of the code array
    for (&offset, &label) in labels.range(code.len() as u32..) {
        visitor.visit_label(label);
        if let Some(&line) = line_by_pc.get(&offset) {
            visitor.visit_line_number(line, label);
        }
    }

    Ok(())
}

fn access_kind(opcode: u8) -> Option<AccessKind> {
    match opcode {
        GETSTATIC | GETFIELD => Some(AccessKind::FieldRead),
        PUTSTATIC | PUTFIELD => Some(AccessKind::FieldWrite),
        INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE => {
            Some(AccessKind::MethodCall)
        }
        _ => None,
    }
}

/// Total encoded length of the instruction at `pc`, including the opcode
/// byte, per the JVM instruction set encoding.
fn instruction_length(code: &[u8], pc: usize) -> Result<usize> {
    let opcode = code[pc];
    let length = match opcode {
        // nop..dconst_1, loads/stores with implicit index, array ops,
        // stack ops, arithmetic, conversions, comparisons, returns
        0x00..=0x0f | 0x1a..=0x35 | 0x3b..=0x83 | 0x85..=0x98 | 0xac..=0xb1 => 1,
        0xbe | 0xbf | 0xc2 | 0xc3 => 1,
        // bipush, ldc, local-variable loads/stores, ret, newarray
        0x10 | 0x12 | 0x15..=0x19 | 0x36..=0x3a | 0xa9 | 0xbc => 2,
        // sipush, ldc_w, ldc2_w, iinc, branches, field/method refs,
        // new, anewarray, checkcast, instanceof, ifnull, ifnonnull
        0x11 | 0x13 | 0x14 | IINC | 0x99..=0xa8 | 0xb2..=0xb8 | 0xbb | 0xbd | 0xc0 | 0xc1
        | 0xc6 | 0xc7 => 3,
        // multianewarray
        0xc5 => 4,
        // invokeinterface, invokedynamic, goto_w, jsr_w
        INVOKEINTERFACE | 0xba | 0xc8 | 0xc9 => 5,
        WIDE => {
            let widened = *code
                .get(pc + 1)
                .ok_or_else(|| ClassFileError::malformed("truncated wide instruction"))?;
            if widened == IINC {
                6
            } else {
                4
            }
        }
        TABLESWITCH => {
            let base = aligned_payload_start(pc);
            let low = i64::from(i32_at(code, base + 4)?);
            let high = i64::from(i32_at(code, base + 8)?);
            if high < low {
                return Err(ClassFileError::malformed("tableswitch with high < low"));
            }
            // the case count can span the whole i32 range, so the length
            // arithmetic must not run in i32 or usize
            let length = (base - pc) as i64 + 12 + (high - low + 1) * 4;
            return checked_length(length, code, pc);
        }
        LOOKUPSWITCH => {
            let base = aligned_payload_start(pc);
            let npairs = i64::from(i32_at(code, base + 4)?);
            if npairs < 0 {
                return Err(ClassFileError::malformed("lookupswitch with negative npairs"));
            }
            let length = (base - pc) as i64 + 8 + npairs * 8;
            return checked_length(length, code, pc);
        }
        opcode => {
            return Err(ClassFileError::malformed(format!(
                "reserved opcode {opcode:#04x} at offset {pc}"
            )));
        }
    };

    if pc + length > code.len() {
        return Err(ClassFileError::malformed(format!(
            "instruction at offset {pc} overruns the code array"
        )));
    }
    Ok(length)
}

/// Validate a switch instruction's encoded length against the code array;
/// the length is carried in `i64` because hostile payload counts overflow
/// narrower types before the range check can reject them.
fn checked_length(length: i64, code: &[u8], pc: usize) -> Result<usize> {
    if length > (code.len() - pc) as i64 {
        return Err(ClassFileError::malformed(format!(
            "instruction at offset {pc} overruns the code array"
        )));
    }
    Ok(length as usize)
}

/// Switch payloads are padded so their first operand is 4-byte aligned
/// relative to the start of the code array.
fn aligned_payload_start(pc: usize) -> usize {
    (pc + 1 + 3) & !3
}

fn u16_at(code: &[u8], at: usize) -> Result<u16> {
    let bytes: [u8; 2] = code
        .get(at..at + 2)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| ClassFileError::malformed("truncated instruction operand"))?;
    Ok(u16::from_be_bytes(bytes))
}

fn i32_at(code: &[u8], at: usize) -> Result<i32> {
    let bytes: [u8; 4] = code
        .get(at..at + 4)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| ClassFileError::malformed("truncated switch payload"))?;
    Ok(i32::from_be_bytes(bytes))
}

/// Decode the class-file format's modified UTF-8: no raw NUL bytes
/// (`0xC0 0x80` encodes U+0000), no four-byte sequences (supplementary
/// characters arrive as two three-byte-encoded UTF-16 surrogates).
/// Every one/two/three-byte sequence yields one UTF-16 code unit.
fn modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut at = 0;
    while at < bytes.len() {
        let first = bytes[at];
        let unit = match first {
            0x01..=0x7f => {
                at += 1;
                u16::from(first)
            }
            0xc0..=0xdf => {
                let second = continuation_byte(bytes, at + 1)?;
                at += 2;
                (u16::from(first & 0x1f) << 6) | u16::from(second & 0x3f)
            }
            0xe0..=0xef => {
                let second = continuation_byte(bytes, at + 1)?;
                let third = continuation_byte(bytes, at + 2)?;
                at += 3;
                (u16::from(first & 0x0f) << 12)
                    | (u16::from(second & 0x3f) << 6)
                    | u16::from(third & 0x3f)
            }
            _ => return Err(ClassFileError::malformed("invalid modified UTF-8 byte")),
        };
        units.push(unit);
    }

    String::from_utf16(&units)
        .map_err(|_| ClassFileError::malformed("unpaired surrogate in modified UTF-8"))
}

fn continuation_byte(bytes: &[u8], at: usize) -> Result<u8> {
    bytes
        .get(at)
        .copied()
        .filter(|byte| byte & 0xc0 == 0x80)
        .ok_or_else(|| ClassFileError::malformed("truncated modified UTF-8 sequence"))
}

/// Convert a binary class name (`java/lang/Object`) to dotted form.
/// Array owners (`[Ljava/lang/String;`) keep their descriptor form.
fn dotted(binary_name: &str) -> String {
    if binary_name.starts_with('[') {
        binary_name.to_string()
    } else {
        binary_name.replace('/', ".")
    }
}
