use crate::jvm::class_file::{Attribute, AttributeLike};
use crate::jvm::{read_bytes, Deserialize, Error, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::borrow::Cow;
use std::collections::HashMap;

/// Class file constants pool
///
/// A pool read from an existing class keeps every entry at its original index, so that attributes
/// we don't understand stay valid when copied through untouched. New entries are only ever
/// appended, and requesting a constant that already exists returns the existing index.
#[derive(Debug, Clone)]
pub struct ConstantsPool {
    /// Indexed by constant pool index (index 0 and the slot after wide constants are `None`)
    entries: Vec<Option<Constant>>,

    /// Reverse lookup for deduplication
    indices: HashMap<Constant, ConstantIndex>,
}

impl Default for ConstantsPool {
    fn default() -> Self {
        ConstantsPool::new()
    }
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool {
            entries: vec![None],
            indices: HashMap::new(),
        }
    }

    /// Number of slots, as written in the `constant_pool_count` field
    pub fn count(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let offset = self.entries.len();
        if offset + constant.width() > u16::MAX as usize {
            return Err(Error::ConstantPoolOverflow {
                constant: Box::new(constant),
                offset,
            });
        }

        let wide = constant.width() == 2;
        let idx = ConstantIndex(offset as u16);
        self.indices.entry(constant.clone()).or_insert(idx);
        self.entries.push(Some(constant));
        if wide {
            self.entries.push(None);
        }
        Ok(idx)
    }

    fn get_or_push(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        match self.indices.get(&constant) {
            Some(idx) => Ok(*idx),
            None => self.push_constant(constant),
        }
    }

    /// Look up a constant by index
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        self.entries
            .get(index.0 as usize)
            .and_then(|entry| entry.as_ref())
            .ok_or(Error::BadConstantIndex(index.0))
    }

    /// Read a utf8 constant
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<String, Error> {
        match self.get(index.0)? {
            Constant::Utf8(bytes) => Ok(decode_modified_utf8(bytes).into_owned()),
            _ => Err(Error::UnexpectedConstant(index.0 .0, "Utf8")),
        }
    }

    /// Read the name out of a class constant
    pub fn class_name(&self, index: ClassConstantIndex) -> Result<String, Error> {
        match self.get(index.0)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(Error::UnexpectedConstant(index.0 .0, "Class")),
        }
    }

    /// Read a name and type constant
    pub fn name_and_type(&self, index: NameAndTypeConstantIndex) -> Result<(String, String), Error> {
        match self.get(index.0)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(Error::UnexpectedConstant(index.0 .0, "NameAndType")),
        }
    }

    /// Read a field or method reference
    pub fn member_ref(&self, index: ConstantIndex) -> Result<MemberRef, Error> {
        let (class, name_and_type, is_interface) = match self.get(index)? {
            Constant::FieldRef(class, name_and_type) => (*class, *name_and_type, false),
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => (*class, *name_and_type, *is_interface),
            _ => return Err(Error::UnexpectedConstant(index.0, "Fieldref or Methodref")),
        };
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok(MemberRef {
            owner: self.class_name(class)?,
            name,
            descriptor,
            is_interface,
        })
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8<'a, S: Into<Cow<'a, str>>>(
        &mut self,
        utf8: S,
    ) -> Result<Utf8ConstantIndex, Error> {
        let bytes = encode_modified_utf8(&utf8.into());
        self.get_or_push(Constant::Utf8(bytes)).map(Utf8ConstantIndex)
    }

    /// Get or insert a class constant (arrays use their descriptor as the name)
    pub fn get_class(&mut self, name: &str) -> Result<ClassConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        self.get_or_push(Constant::Class(name))
            .map(ClassConstantIndex)
    }

    /// Get or insert a string constant from the constant pool
    pub fn get_string(&mut self, string: &str) -> Result<ConstantIndex, Error> {
        let utf8 = self.get_utf8(string)?;
        self.get_or_push(Constant::String(utf8))
    }

    pub fn get_integer(&mut self, integer: i32) -> Result<ConstantIndex, Error> {
        self.get_or_push(Constant::Integer(integer))
    }

    pub fn get_float(&mut self, float: f32) -> Result<ConstantIndex, Error> {
        self.get_or_push(Constant::Float(float.to_bits()))
    }

    pub fn get_long(&mut self, long: i64) -> Result<ConstantIndex, Error> {
        self.get_or_push(Constant::Long(long))
    }

    pub fn get_double(&mut self, double: f64) -> Result<ConstantIndex, Error> {
        self.get_or_push(Constant::Double(double.to_bits()))
    }

    pub fn get_method_type(&mut self, descriptor: &str) -> Result<ConstantIndex, Error> {
        let descriptor = self.get_utf8(descriptor)?;
        self.get_or_push(Constant::MethodType { descriptor })
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        self.get_or_push(Constant::NameAndType { name, descriptor })
            .map(NameAndTypeConstantIndex)
    }

    /// Get or insert a `CONSTANT_Fieldref_info`
    pub fn get_field_ref(&mut self, member: &MemberRef) -> Result<ConstantIndex, Error> {
        let class = self.get_class(&member.owner)?;
        let name_and_type = self.get_name_and_type(&member.name, &member.descriptor)?;
        self.get_or_push(Constant::FieldRef(class, name_and_type))
    }

    /// Get or insert a `CONSTANT_Methodref_info` or `CONSTANT_InterfaceMethodref_info`
    pub fn get_method_ref(&mut self, member: &MemberRef) -> Result<ConstantIndex, Error> {
        let class = self.get_class(&member.owner)?;
        let name_and_type = self.get_name_and_type(&member.name, &member.descriptor)?;
        self.get_or_push(Constant::MethodRef {
            class,
            name_and_type,
            is_interface: member.is_interface,
        })
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: &A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];

        attribute.serialize(&mut info).map_err(Error::IoError)?;

        Ok(Attribute { name_index, info })
    }
}

impl Serialize for ConstantsPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.count().serialize(writer)?;
        for constant in self.entries.iter().flatten() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl Deserialize for ConstantsPool {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let count = u16::deserialize(reader)? as usize;
        let mut pool = ConstantsPool::new();
        while pool.entries.len() < count {
            let constant = Constant::deserialize(reader)?;
            let idx = ConstantIndex(pool.entries.len() as u16);
            let wide = constant.width() == 2;

            // Duplicates are legal, the first one wins for reuse
            pool.indices.entry(constant.clone()).or_insert(idx);
            pool.entries.push(Some(constant));
            if wide {
                pool.entries.push(None);
            }
        }
        Ok(pool)
    }
}

/// Symbolic reference to a field or method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    /// Internal name of the owning class (or array descriptor, eg. for `clone` on arrays)
    pub owner: String,
    pub name: String,
    pub descriptor: String,

    /// Only meaningful for methods: whether the owner is an interface
    pub is_interface: bool,
}

impl MemberRef {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> MemberRef {
        MemberRef {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            is_interface: false,
        }
    }
}

/// Constants as in the constant pool
///
/// Floating point constants are stored as raw bits so that constants can be hashed and compared
/// for deduplication.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float` (raw bits)
    Float(u32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double` (raw bits)
    Double(u64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant string value, kept in its encoded form
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(Vec<u8>),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: u8,
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    Module(Utf8ConstantIndex),
    Package(Utf8ConstantIndex),
}

impl Constant {
    /// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`.
    /// From the JVM class file format (§4.4.5):
    ///
    /// > All 8-byte constants take up two entries in the constant_pool table of the class file.
    /// > If a CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the
    /// > constant_pool table at index n, then the next usable item in the pool is located at
    /// > index n+2.
    pub fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(bytes) => {
                1u8.serialize(writer)?;
                (bytes.len() as u16).serialize(writer)?;
                writer.write_all(bytes)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(bits) => {
                4u8.serialize(writer)?;
                bits.serialize(writer)?;
            }
            Constant::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(bits) => {
                6u8.serialize(writer)?;
                bits.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(utf8) => {
                8u8.serialize(writer)?;
                utf8.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                (if !is_interface { 10u8 } else { 11u8 }).serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                15u8.serialize(writer)?;
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => {
                16u8.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            } => {
                17u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                name_and_type,
            } => {
                18u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::Module(name) => {
                19u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::Package(name) => {
                20u8.serialize(writer)?;
                name.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Deserialize for Constant {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        let tag = u8::deserialize(reader)?;
        let constant = match tag {
            1 => {
                let len = u16::deserialize(reader)?;
                Constant::Utf8(read_bytes(reader, len as usize)?)
            }
            3 => Constant::Integer(i32::deserialize(reader)?),
            4 => Constant::Float(u32::deserialize(reader)?),
            5 => Constant::Long(i64::deserialize(reader)?),
            6 => Constant::Double(u64::deserialize(reader)?),
            7 => Constant::Class(Utf8ConstantIndex::deserialize(reader)?),
            8 => Constant::String(Utf8ConstantIndex::deserialize(reader)?),
            9 => Constant::FieldRef(
                ClassConstantIndex::deserialize(reader)?,
                NameAndTypeConstantIndex::deserialize(reader)?,
            ),
            10 | 11 => Constant::MethodRef {
                class: ClassConstantIndex::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::deserialize(reader)?,
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            15 => Constant::MethodHandle {
                handle_kind: u8::deserialize(reader)?,
                member: ConstantIndex::deserialize(reader)?,
            },
            16 => Constant::MethodType {
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            19 => Constant::Module(Utf8ConstantIndex::deserialize(reader)?),
            20 => Constant::Package(Utf8ConstantIndex::deserialize(reader)?),
            other => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Unknown constant pool tag {}", other),
                ))
            }
        };
        Ok(constant)
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for c in string.chars() {
        // Handle the exception for how `\u{0000}` is represented
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }

            // Supplementary characters: main divergence from unicode
            _ => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x1F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

/// Inverse of [`encode_modified_utf8`]
///
/// Unpaired surrogates and malformed sequences decode to `U+FFFD`. The pool keeps the original
/// bytes, so this only affects how names are seen, never how they are written back.
pub fn decode_modified_utf8(bytes: &[u8]) -> Cow<'_, str> {
    if bytes.iter().all(|b| *b != 0 && *b < 0x80) {
        if let Ok(ascii) = std::str::from_utf8(bytes) {
            return Cow::Borrowed(ascii);
        }
    }

    // First decode into UTF-16 code units, then let the standard library pair up surrogates
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let b0 = bytes[idx] as u16;
        let continuation = |offset: usize| -> Option<u16> {
            bytes
                .get(idx + offset)
                .filter(|b| *b & 0b1100_0000 == 0b1000_0000)
                .map(|b| (*b & 0x3F) as u16)
        };
        if b0 & 0x80 == 0 {
            units.push(b0);
            idx += 1;
        } else if b0 & 0b1110_0000 == 0b1100_0000 {
            match continuation(1) {
                Some(b1) => {
                    units.push((b0 & 0x1F) << 6 | b1);
                    idx += 2;
                }
                None => {
                    units.push(0xFFFD);
                    idx += 1;
                }
            }
        } else if b0 & 0b1111_0000 == 0b1110_0000 {
            match (continuation(1), continuation(2)) {
                (Some(b1), Some(b2)) => {
                    units.push((b0 & 0x0F) << 12 | b1 << 6 | b2);
                    idx += 3;
                }
                _ => {
                    units.push(0xFFFD);
                    idx += 1;
                }
            }
        } else {
            units.push(0xFFFD);
            idx += 1;
        }
    }
    Cow::Owned(String::from_utf16_lossy(&units))
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug, PartialOrd, Ord)]
pub struct ConstantIndex(pub u16);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct Utf8ConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct NameAndTypeConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ClassConstantIndex(pub ConstantIndex);

impl From<Utf8ConstantIndex> for ConstantIndex {
    fn from(index: Utf8ConstantIndex) -> ConstantIndex {
        index.0
    }
}

impl From<NameAndTypeConstantIndex> for ConstantIndex {
    fn from(index: NameAndTypeConstantIndex) -> ConstantIndex {
        index.0
    }
}

impl From<ClassConstantIndex> for ConstantIndex {
    fn from(index: ClassConstantIndex) -> ConstantIndex {
        index.0
    }
}

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        u16::deserialize(reader).map(ConstantIndex)
    }
}

macro_rules! typed_index {
    ($typ:ident) => {
        impl Serialize for $typ {
            fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                self.0.serialize(writer)
            }
        }

        impl Deserialize for $typ {
            fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
                ConstantIndex::deserialize(reader).map($typ)
            }
        }
    };
}

typed_index!(Utf8ConstantIndex);
typed_index!(NameAndTypeConstantIndex);
typed_index!(ClassConstantIndex);

#[cfg(test)]
mod encode_modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
        assert_eq!(decode_modified_utf8(&[97, 192, 128, 97]), "a\x00a");
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert!(
            matches!(decode_modified_utf8(b"foo"), Cow::Borrowed("foo")),
            "ascii decodes without copying"
        );
    }

    #[test]
    fn two_and_three_byte_encodings() {
        let text = "ĄǍǞǠǺȀȂȦȺӐӒऄअॲঅਅઅଅஅఅಅഅะະ༁ཨ";
        assert_eq!(decode_modified_utf8(&encode_modified_utf8(text)), text);
    }

    #[test]
    fn supplementary_characters() {
        let encoded = vec![
            237, 160, 128, 237, 176, 128, 237, 172, 191, 237, 191, 191, 237, 175, 191, 237, 191,
            191,
        ];
        assert_eq!(
            encode_modified_utf8("\u{10000}\u{dffff}\u{10FFFF}"),
            encoded
        );
        assert_eq!(decode_modified_utf8(&encoded), "\u{10000}\u{dffff}\u{10FFFF}");
    }

    #[test]
    fn malformed_sequences() {
        assert_eq!(decode_modified_utf8(&[0xC0]), "\u{FFFD}");
        assert_eq!(
            decode_modified_utf8(&[237, 160, 128]),
            "\u{FFFD}",
            "unpaired high surrogate"
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn constants_are_deduplicated() {
        let mut pool = ConstantsPool::new();
        let a = pool.get_class("a/B").unwrap();
        let b = pool.get_class("a/B").unwrap();
        assert_eq!(a, b, "same class gives the same index");
        assert_eq!(pool.count(), 3, "one utf8 and one class, plus the unused zero slot");
        assert_eq!(pool.class_name(a).unwrap(), "a/B");
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantsPool::new();
        let long = pool.get_long(42).unwrap();
        let int = pool.get_integer(42).unwrap();
        assert_eq!(long, ConstantIndex(1));
        assert_eq!(int, ConstantIndex(3));
        assert!(pool.get(ConstantIndex(2)).is_err(), "slot after a long is unusable");
    }

    #[test]
    fn parsed_pool_keeps_indices() {
        let mut pool = ConstantsPool::new();
        pool.get_double(1.5).unwrap();
        let method = MemberRef {
            owner: String::from("a/B"),
            name: String::from("run"),
            descriptor: String::from("()V"),
            is_interface: true,
        };
        let method_idx = pool.get_method_ref(&method).unwrap();

        let mut bytes = vec![];
        pool.serialize(&mut bytes).unwrap();
        let mut parsed = ConstantsPool::deserialize(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(parsed.count(), pool.count());
        assert_eq!(parsed.member_ref(method_idx).unwrap(), method);
        assert_eq!(
            parsed.get_method_ref(&method).unwrap(),
            method_idx,
            "reparsed pool reuses the existing entry"
        );
        assert_eq!(parsed.count(), pool.count(), "nothing was appended");
    }

    #[test]
    fn wrong_constant_kind() {
        let mut pool = ConstantsPool::new();
        let int = pool.get_integer(1).unwrap();
        assert!(matches!(
            pool.class_name(ClassConstantIndex(int)),
            Err(Error::UnexpectedConstant(1, "Class"))
        ));
    }
}
