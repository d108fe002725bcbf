use bitflags::bitflags;

bitflags! {
    /// JVM access flags as encoded in class, field and method records.
    ///
    /// The same 16-bit word is used for all three, with context-dependent
    /// meaning for a few bits (e.g. `VOLATILE` on fields is `BRIDGE` on
    /// methods); `from_bits_truncate` keeps unknown bits from failing the
    /// parse.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u16 {
        const PUBLIC       = 0x0001;
        const PRIVATE      = 0x0002;
        const PROTECTED    = 0x0004;
        const STATIC       = 0x0008;
        const FINAL        = 0x0010;
        const SUPER        = 0x0020;
        const VOLATILE     = 0x0040;
        const TRANSIENT    = 0x0080;
        const NATIVE       = 0x0100;
        const INTERFACE    = 0x0200;
        const ABSTRACT     = 0x0400;
        const STRICT       = 0x0800;
        const SYNTHETIC    = 0x1000;
        const ANNOTATION   = 0x2000;
        const ENUM         = 0x4000;
    }
}

impl AccessFlags {
    /// `SYNCHRONIZED` shares its bit with `SUPER`; it only makes sense on methods.
    pub const SYNCHRONIZED: AccessFlags = AccessFlags::SUPER;

    /// `BRIDGE` shares its bit with `VOLATILE`; it only makes sense on methods.
    pub const BRIDGE: AccessFlags = AccessFlags::VOLATILE;

    /// `VARARGS` shares its bit with `TRANSIENT`; it only makes sense on methods.
    pub const VARARGS: AccessFlags = AccessFlags::TRANSIENT;
}
