use crate::jvm::class_file::ClassConstantIndex;
use crate::jvm::{BaseType, FieldType, RenderDescriptor, Serialize};
use crate::util::Width;
use byteorder::WriteBytesExt;

/// These types are from [this hierarchy][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType<Cls, U> {
    /// Unusable slot: never written, holding conflicting types, or the second half of a `long`
    /// or `double` local
    Top,

    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Object type
    Object(Cls),

    /// State of an object after `new` has been called but `<init>` has not been called
    ///
    ///   - during frame computation, `U` is the position of the `new` instruction in the
    ///     instruction list
    ///   - when serializing into a classfile, `U` is `u16`, the offset of the `new` instruction
    ///     from the start of the method body
    Uninitialized(U),
}

impl<Cls, U> VerificationType<Cls, U> {
    /// Is this type is a reference type?
    pub fn is_reference(&self) -> bool {
        match self {
            VerificationType::Top
            | VerificationType::Integer
            | VerificationType::Float
            | VerificationType::Double
            | VerificationType::Long => false,

            VerificationType::Null
            | VerificationType::UninitializedThis
            | VerificationType::Object(_)
            | VerificationType::Uninitialized(_) => true,
        }
    }

    pub fn map<C2, U2>(
        &self,
        map_class: impl Fn(&Cls) -> C2,
        map_uninitialized: impl Fn(&U) -> U2,
    ) -> VerificationType<C2, U2> {
        match self {
            VerificationType::Top => VerificationType::Top,
            VerificationType::Integer => VerificationType::Integer,
            VerificationType::Float => VerificationType::Float,
            VerificationType::Long => VerificationType::Long,
            VerificationType::Double => VerificationType::Double,
            VerificationType::Null => VerificationType::Null,
            VerificationType::UninitializedThis => VerificationType::UninitializedThis,
            VerificationType::Object(cls) => VerificationType::Object(map_class(cls)),
            VerificationType::Uninitialized(uninit) => {
                VerificationType::Uninitialized(map_uninitialized(uninit))
            }
        }
    }
}

impl<U> VerificationType<String, U> {
    /// Type of a value of the given field type, once it is on the stack or in a local
    ///
    /// Classes are identified by their class constant name (internal name, or descriptor for
    /// arrays).
    pub fn from_field_type(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Object(name) => VerificationType::Object(name.clone()),
            FieldType::Array(_) => VerificationType::Object(field_type.render()),
        }
    }

    pub fn object(class_name: impl Into<String>) -> Self {
        VerificationType::Object(class_name.into())
    }
}

impl Serialize for VerificationType<ClassConstantIndex, u16> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            VerificationType::Top => 0u8.serialize(writer)?,
            VerificationType::Integer => 1u8.serialize(writer)?,
            VerificationType::Float => 2u8.serialize(writer)?,
            VerificationType::Double => 3u8.serialize(writer)?,
            VerificationType::Long => 4u8.serialize(writer)?,
            VerificationType::Null => 5u8.serialize(writer)?,
            VerificationType::UninitializedThis => 6u8.serialize(writer)?,
            VerificationType::Object(cls) => {
                7u8.serialize(writer)?;
                cls.serialize(writer)?;
            }
            VerificationType::Uninitialized(off) => {
                8u8.serialize(writer)?;
                off.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl<Cls, A> Width for VerificationType<Cls, A> {
    fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantIndex;
    use crate::jvm::ParseDescriptor;

    type VType = VerificationType<String, usize>;

    #[test]
    fn field_types_to_verification_types() {
        let boolean = FieldType::Base(BaseType::Boolean);
        assert_eq!(VType::from_field_type(&boolean), VType::Integer, "booleans are ints");
        let array = FieldType::parse("[Ljava/lang/String;").unwrap();
        assert_eq!(
            VType::from_field_type(&array),
            VType::object("[Ljava/lang/String;"),
            "arrays use their descriptor"
        );
        assert_eq!(VType::Long.width(), 2);
        assert!(VType::Null.is_reference());
        assert!(!VType::Top.is_reference());
    }

    #[test]
    fn tags() {
        let mut bytes = vec![];
        let types: Vec<VerificationType<ClassConstantIndex, u16>> = vec![
            VerificationType::Top,
            VerificationType::Object(ClassConstantIndex(ConstantIndex(9))),
            VerificationType::Uninitialized(3),
        ];
        for typ in types {
            typ.serialize(&mut bytes).unwrap();
        }
        assert_eq!(bytes, vec![0, 7, 0, 9, 8, 0, 3]);
    }
}
