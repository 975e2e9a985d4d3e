//! Annotations, as stored in `Runtime(In)VisibleAnnotations` and `AnnotationDefault` attributes
//!
//! Element values are resolved out of the constant pool when read and interned again when
//! written, so annotations can be inspected and removed without tracking pool indices.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16

use crate::jvm::class_file::{Attribute, Constant, ConstantIndex, ConstantsPool, Utf8ConstantIndex};
use crate::jvm::{Deserialize, Error, Serialize};
use std::io::Cursor;

pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";

/// One annotation on a class, method, or nested inside another annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationNode {
    /// Field descriptor of the annotation interface (eg. `Lcom/example/Marker;`)
    pub descriptor: String,

    /// Explicitly given properties, in class file order
    pub values: Vec<(String, ElementValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// `byte`, `char`, `int`, `short` and `boolean` values all live in `CONSTANT_Integer` and are
    /// told apart by their tag (`B`, `C`, `I`, `S`, `Z`)
    Int(u8, i32),

    Long(i64),

    /// Raw bits
    Float(u32),

    /// Raw bits
    Double(u64),

    String(String),

    Enum {
        type_descriptor: String,
        constant: String,
    },

    /// Return descriptor of the class (`V` for `void.class`)
    Class(String),

    Annotation(AnnotationNode),

    Array(Vec<ElementValue>),
}

impl ElementValue {
    /// Integer value, if this is an `int` (or narrower) property
    pub fn as_int(&self) -> Option<i32> {
        match self {
            ElementValue::Int(_, value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ElementValue::String(string) => Some(string),
            _ => None,
        }
    }

    fn read(reader: &mut Cursor<&[u8]>, constants: &ConstantsPool) -> Result<ElementValue, Error> {
        let tag = u8::deserialize(reader)?;
        let value = match tag {
            b'B' | b'C' | b'I' | b'S' | b'Z' => match constants.get(ConstantIndex::deserialize(reader)?)? {
                Constant::Integer(value) => ElementValue::Int(tag, *value),
                _ => return Err(Error::MalformedAttribute("annotation int value")),
            },
            b'J' => match constants.get(ConstantIndex::deserialize(reader)?)? {
                Constant::Long(value) => ElementValue::Long(*value),
                _ => return Err(Error::MalformedAttribute("annotation long value")),
            },
            b'F' => match constants.get(ConstantIndex::deserialize(reader)?)? {
                Constant::Float(bits) => ElementValue::Float(*bits),
                _ => return Err(Error::MalformedAttribute("annotation float value")),
            },
            b'D' => match constants.get(ConstantIndex::deserialize(reader)?)? {
                Constant::Double(bits) => ElementValue::Double(*bits),
                _ => return Err(Error::MalformedAttribute("annotation double value")),
            },
            b's' => ElementValue::String(constants.utf8(Utf8ConstantIndex::deserialize(reader)?)?),
            b'e' => ElementValue::Enum {
                type_descriptor: constants.utf8(Utf8ConstantIndex::deserialize(reader)?)?,
                constant: constants.utf8(Utf8ConstantIndex::deserialize(reader)?)?,
            },
            b'c' => ElementValue::Class(constants.utf8(Utf8ConstantIndex::deserialize(reader)?)?),
            b'@' => ElementValue::Annotation(AnnotationNode::read(reader, constants)?),
            b'[' => {
                let len = u16::deserialize(reader)?;
                let mut elements = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    elements.push(ElementValue::read(reader, constants)?);
                }
                ElementValue::Array(elements)
            }
            _ => return Err(Error::MalformedAttribute("annotation element value")),
        };
        Ok(value)
    }

    fn write(&self, out: &mut Vec<u8>, constants: &mut ConstantsPool) -> Result<(), Error> {
        match self {
            ElementValue::Int(tag, value) => {
                tag.serialize(out)?;
                constants.get_integer(*value)?.serialize(out)?;
            }
            ElementValue::Long(value) => {
                b'J'.serialize(out)?;
                constants.get_long(*value)?.serialize(out)?;
            }
            ElementValue::Float(bits) => {
                b'F'.serialize(out)?;
                constants.get_float(f32::from_bits(*bits))?.serialize(out)?;
            }
            ElementValue::Double(bits) => {
                b'D'.serialize(out)?;
                constants.get_double(f64::from_bits(*bits))?.serialize(out)?;
            }
            ElementValue::String(string) => {
                b's'.serialize(out)?;
                constants.get_utf8(string.as_str())?.serialize(out)?;
            }
            ElementValue::Enum {
                type_descriptor,
                constant,
            } => {
                b'e'.serialize(out)?;
                constants.get_utf8(type_descriptor.as_str())?.serialize(out)?;
                constants.get_utf8(constant.as_str())?.serialize(out)?;
            }
            ElementValue::Class(descriptor) => {
                b'c'.serialize(out)?;
                constants.get_utf8(descriptor.as_str())?.serialize(out)?;
            }
            ElementValue::Annotation(annotation) => {
                b'@'.serialize(out)?;
                annotation.write(out, constants)?;
            }
            ElementValue::Array(elements) => {
                b'['.serialize(out)?;
                (elements.len() as u16).serialize(out)?;
                for element in elements {
                    element.write(out, constants)?;
                }
            }
        }
        Ok(())
    }

    /// Decode an `AnnotationDefault` attribute
    pub fn from_default_attribute(
        attribute: &Attribute,
        constants: &ConstantsPool,
    ) -> Result<ElementValue, Error> {
        let mut reader = Cursor::new(attribute.info.as_slice());
        let value = ElementValue::read(&mut reader, constants)?;
        if reader.position() as usize != attribute.info.len() {
            return Err(Error::MalformedAttribute(ANNOTATION_DEFAULT));
        }
        Ok(value)
    }

    /// Encode as an `AnnotationDefault` attribute
    pub fn to_default_attribute(&self, constants: &mut ConstantsPool) -> Result<Attribute, Error> {
        let mut info = vec![];
        self.write(&mut info, constants)?;
        Ok(Attribute {
            name_index: constants.get_utf8(ANNOTATION_DEFAULT)?,
            info,
        })
    }
}

impl AnnotationNode {
    pub fn new(descriptor: impl Into<String>) -> AnnotationNode {
        AnnotationNode {
            descriptor: descriptor.into(),
            values: vec![],
        }
    }

    /// Property given explicitly on this annotation
    pub fn value(&self, property: &str) -> Option<&ElementValue> {
        self.values
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    fn read(reader: &mut Cursor<&[u8]>, constants: &ConstantsPool) -> Result<AnnotationNode, Error> {
        let descriptor = constants.utf8(Utf8ConstantIndex::deserialize(reader)?)?;
        let pairs = u16::deserialize(reader)?;
        let mut values = Vec::with_capacity(pairs as usize);
        for _ in 0..pairs {
            let name = constants.utf8(Utf8ConstantIndex::deserialize(reader)?)?;
            values.push((name, ElementValue::read(reader, constants)?));
        }
        Ok(AnnotationNode { descriptor, values })
    }

    fn write(&self, out: &mut Vec<u8>, constants: &mut ConstantsPool) -> Result<(), Error> {
        constants.get_utf8(self.descriptor.as_str())?.serialize(out)?;
        (self.values.len() as u16).serialize(out)?;
        for (name, value) in &self.values {
            constants.get_utf8(name.as_str())?.serialize(out)?;
            value.write(out, constants)?;
        }
        Ok(())
    }

    /// Decode a `RuntimeVisibleAnnotations` or `RuntimeInvisibleAnnotations` attribute
    pub fn from_attribute(
        attribute: &Attribute,
        constants: &ConstantsPool,
    ) -> Result<Vec<AnnotationNode>, Error> {
        let mut reader = Cursor::new(attribute.info.as_slice());
        let count = u16::deserialize(&mut reader)?;
        let mut annotations = Vec::with_capacity(count as usize);
        for _ in 0..count {
            annotations.push(AnnotationNode::read(&mut reader, constants)?);
        }
        if reader.position() as usize != attribute.info.len() {
            return Err(Error::MalformedAttribute(RUNTIME_VISIBLE_ANNOTATIONS));
        }
        Ok(annotations)
    }

    /// Encode a list of annotations, or `None` if there are none to write
    pub fn to_attribute(
        name: &str,
        annotations: &[AnnotationNode],
        constants: &mut ConstantsPool,
    ) -> Result<Option<Attribute>, Error> {
        if annotations.is_empty() {
            return Ok(None);
        }
        let mut info = vec![];
        (annotations.len() as u16).serialize(&mut info)?;
        for annotation in annotations {
            annotation.write(&mut info, constants)?;
        }
        Ok(Some(Attribute {
            name_index: constants.get_utf8(name)?,
            info,
        }))
    }
}

/// Remove the first annotation with the given descriptor, returning it
pub fn remove_annotation(
    annotations: &mut Vec<AnnotationNode>,
    descriptor: &str,
) -> Option<AnnotationNode> {
    let position = annotations
        .iter()
        .position(|annotation| annotation.descriptor == descriptor)?;
    Some(annotations.remove(position))
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample() -> AnnotationNode {
        AnnotationNode {
            descriptor: String::from("Lcom/example/Benchmark;"),
            values: vec![
                (String::from("warnAtMillis"), ElementValue::Int(b'I', 10)),
                (String::from("label"), ElementValue::String(String::from("fast path"))),
                (
                    String::from("policy"),
                    ElementValue::Enum {
                        type_descriptor: String::from("Ljava/lang/annotation/RetentionPolicy;"),
                        constant: String::from("CLASS"),
                    },
                ),
                (
                    String::from("tags"),
                    ElementValue::Array(vec![
                        ElementValue::Class(String::from("Ljava/lang/String;")),
                        ElementValue::Annotation(AnnotationNode::new("Lcom/example/Nested;")),
                    ]),
                ),
            ],
        }
    }

    #[test]
    fn attribute_contents() {
        let mut constants = ConstantsPool::new();
        let annotation = sample();
        let attribute =
            AnnotationNode::to_attribute(RUNTIME_INVISIBLE_ANNOTATIONS, &[annotation.clone()], &mut constants)
                .unwrap()
                .unwrap();
        assert_eq!(attribute.name(&constants).unwrap(), RUNTIME_INVISIBLE_ANNOTATIONS);
        assert_eq!(&attribute.info[..2], &[0, 1], "one annotation");

        let read_back = AnnotationNode::from_attribute(&attribute, &constants).unwrap();
        assert_eq!(read_back, vec![annotation]);
        assert_eq!(read_back[0].value("warnAtMillis").and_then(ElementValue::as_int), Some(10));
        assert_eq!(read_back[0].value("label").and_then(ElementValue::as_str), Some("fast path"));
        assert_eq!(read_back[0].value("missing"), None);
    }

    #[test]
    fn empty_lists_produce_no_attribute() {
        let mut constants = ConstantsPool::new();
        let attribute =
            AnnotationNode::to_attribute(RUNTIME_VISIBLE_ANNOTATIONS, &[], &mut constants).unwrap();
        assert!(attribute.is_none());
    }

    #[test]
    fn defaults() {
        let mut constants = ConstantsPool::new();
        let attribute = ElementValue::Int(b'I', -1)
            .to_default_attribute(&mut constants)
            .unwrap();
        let value = ElementValue::from_default_attribute(&attribute, &constants).unwrap();
        assert_eq!(value.as_int(), Some(-1));
    }

    #[test]
    fn removal_takes_first_match() {
        let mut annotations = vec![
            AnnotationNode::new("La/A;"),
            AnnotationNode::new("La/B;"),
            AnnotationNode::new("La/A;"),
        ];
        assert!(remove_annotation(&mut annotations, "La/A;").is_some());
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[1].descriptor, "La/A;", "only the first one goes");
        assert!(remove_annotation(&mut annotations, "La/C;").is_none());
    }
}
