//! Symbolic view of a class file that injectors edit
//!
//! Names are resolved out of the constant pool, annotations are decoded, and method bodies are
//! decoded into [`CodeNode`]s only when someone asks for them. Everything else stays raw, and the
//! pool keeps its original layout, so an untouched class serializes back to the same bytes.

use crate::jvm::annotation::{
    AnnotationNode, ElementValue, ANNOTATION_DEFAULT, RUNTIME_INVISIBLE_ANNOTATIONS,
    RUNTIME_VISIBLE_ANNOTATIONS,
};
use crate::jvm::class_file::{
    Attribute, ClassFile, Code, ConstantsPool, Field, Method, Version,
};
use crate::jvm::code::CodeNode;
use crate::jvm::frames::{ClassHierarchy, MethodContext};
use crate::jvm::{ClassAccessFlags, Error, MethodAccessFlags};

#[derive(Debug, Clone)]
pub struct ClassNode {
    pub version: Version,
    pub constants: ConstantsPool,
    pub access_flags: ClassAccessFlags,

    /// Internal name
    pub name: String,

    /// Internal name of the superclass (`None` only for `java/lang/Object`)
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<MethodNode>,
    pub visible_annotations: Vec<AnnotationNode>,
    pub invisible_annotations: Vec<AnnotationNode>,

    /// Other attributes, copied through as they are
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone)]
pub struct MethodNode {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
    pub visible_annotations: Vec<AnnotationNode>,
    pub invisible_annotations: Vec<AnnotationNode>,

    /// Default value of an annotation interface element
    pub annotation_default: Option<ElementValue>,
    body: MethodBody,

    /// Other attributes, copied through as they are
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone)]
enum MethodBody {
    /// Abstract and native methods
    Absent,

    /// Original `Code` attribute, not yet looked at
    Raw(Attribute),

    Edited(CodeNode),
}

impl ClassNode {
    /// Parse a class file
    pub fn parse(bytes: &[u8]) -> Result<ClassNode, Error> {
        ClassNode::from_class_file(ClassFile::parse(bytes)?)
    }

    pub fn from_class_file(class: ClassFile) -> Result<ClassNode, Error> {
        let constants = class.constants;
        let name = constants.class_name(class.this_class)?;
        let super_name = match class.super_class {
            None => None,
            Some(super_class) => Some(constants.class_name(super_class)?),
        };
        let interfaces = class
            .interfaces
            .iter()
            .map(|interface| constants.class_name(*interface))
            .collect::<Result<Vec<_>, _>>()?;

        let mut visible_annotations = vec![];
        let mut invisible_annotations = vec![];
        let mut attributes = vec![];
        for attribute in class.attributes {
            match attribute.name(&constants)?.as_str() {
                RUNTIME_VISIBLE_ANNOTATIONS => {
                    visible_annotations.extend(AnnotationNode::from_attribute(&attribute, &constants)?)
                }
                RUNTIME_INVISIBLE_ANNOTATIONS => invisible_annotations
                    .extend(AnnotationNode::from_attribute(&attribute, &constants)?),
                _ => attributes.push(attribute),
            }
        }

        let methods = class
            .methods
            .into_iter()
            .map(|method| MethodNode::from_method(method, &constants))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ClassNode {
            version: class.version,
            constants,
            access_flags: class.access_flags,
            name,
            super_name,
            interfaces,
            fields: class.fields,
            methods,
            visible_annotations,
            invisible_annotations,
            attributes,
        })
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_annotation(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::ANNOTATION)
    }

    /// Body of the method at `index`, decoded on first access
    ///
    /// Returns `None` for methods without code. Asking for the body marks it as edited: it will be
    /// reassembled (and its frames recomputed) on serialization.
    pub fn code_mut(&mut self, index: usize) -> Result<Option<&mut CodeNode>, Error> {
        let constants = &self.constants;
        self.methods[index].code_mut(constants)
    }

    /// Lay the class back out as a class file, assembling the edited method bodies
    pub fn into_class_file(self, hierarchy: &dyn ClassHierarchy) -> Result<ClassFile, Error> {
        let mut constants = self.constants;
        let this_class = constants.get_class(&self.name)?;
        let super_class = match &self.super_name {
            None => None,
            Some(super_name) => Some(constants.get_class(super_name)?),
        };
        let mut interfaces = vec![];
        for interface in &self.interfaces {
            interfaces.push(constants.get_class(interface)?);
        }

        let mut methods = vec![];
        for method in self.methods {
            methods.push(method.into_method(
                &self.name,
                &mut constants,
                self.version,
                hierarchy,
            )?);
        }

        let mut attributes = self.attributes;
        attributes.extend(AnnotationNode::to_attribute(
            RUNTIME_VISIBLE_ANNOTATIONS,
            &self.visible_annotations,
            &mut constants,
        )?);
        attributes.extend(AnnotationNode::to_attribute(
            RUNTIME_INVISIBLE_ANNOTATIONS,
            &self.invisible_annotations,
            &mut constants,
        )?);

        Ok(ClassFile {
            version: self.version,
            constants,
            access_flags: self.access_flags,
            this_class,
            super_class,
            interfaces,
            fields: self.fields,
            methods,
            attributes,
        })
    }

    /// Serialize into class file bytes
    pub fn to_bytes(self, hierarchy: &dyn ClassHierarchy) -> Result<Vec<u8>, Error> {
        self.into_class_file(hierarchy)?.to_bytes()
    }
}

impl MethodNode {
    /// Method with no body and no annotations
    pub fn new(
        access_flags: MethodAccessFlags,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> MethodNode {
        MethodNode {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
            visible_annotations: vec![],
            invisible_annotations: vec![],
            annotation_default: None,
            body: MethodBody::Absent,
            attributes: vec![],
        }
    }

    fn from_method(method: Method, constants: &ConstantsPool) -> Result<MethodNode, Error> {
        let mut node = MethodNode::new(
            method.access_flags,
            constants.utf8(method.name_index)?,
            constants.utf8(method.descriptor_index)?,
        );
        for attribute in method.attributes {
            match attribute.name(constants)?.as_str() {
                "Code" => node.body = MethodBody::Raw(attribute),
                RUNTIME_VISIBLE_ANNOTATIONS => node
                    .visible_annotations
                    .extend(AnnotationNode::from_attribute(&attribute, constants)?),
                RUNTIME_INVISIBLE_ANNOTATIONS => node
                    .invisible_annotations
                    .extend(AnnotationNode::from_attribute(&attribute, constants)?),
                ANNOTATION_DEFAULT => {
                    node.annotation_default =
                        Some(ElementValue::from_default_attribute(&attribute, constants)?)
                }
                _ => node.attributes.push(attribute),
            }
        }
        Ok(node)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_private(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::PRIVATE)
    }

    pub fn has_code(&self) -> bool {
        !matches!(self.body, MethodBody::Absent)
    }

    /// Has the body been handed out for editing?
    pub fn is_edited(&self) -> bool {
        matches!(self.body, MethodBody::Edited(_))
    }

    /// Every annotation on the method, visible ones first
    pub fn annotations(&self) -> impl Iterator<Item = &AnnotationNode> {
        self.visible_annotations
            .iter()
            .chain(self.invisible_annotations.iter())
    }

    /// Body for editing, decoded on first access
    ///
    /// `constants` must be the pool of the class that declares the method.
    pub fn code_mut(&mut self, constants: &ConstantsPool) -> Result<Option<&mut CodeNode>, Error> {
        if let MethodBody::Raw(attribute) = &self.body {
            let code: Code = attribute.decode()?;
            self.body = MethodBody::Edited(CodeNode::decode(&code, constants)?);
        }
        match &mut self.body {
            MethodBody::Edited(code) => Ok(Some(code)),
            _ => Ok(None),
        }
    }

    /// Replace the body
    pub fn set_code(&mut self, code: CodeNode) {
        self.body = MethodBody::Edited(code);
    }

    /// Decoded copy of the body, leaving the method as it is
    ///
    /// Use this to look before deciding to edit: an untouched body is written back unchanged,
    /// while one handed out by [`Self::code_mut`] is always reassembled.
    pub fn decode_code(&self, constants: &ConstantsPool) -> Result<Option<CodeNode>, Error> {
        match &self.body {
            MethodBody::Absent => Ok(None),
            MethodBody::Raw(attribute) => {
                let code: Code = attribute.decode()?;
                Ok(Some(CodeNode::decode(&code, constants)?))
            }
            MethodBody::Edited(code) => Ok(Some(code.clone())),
        }
    }

    /// Take the body out, leaving the method without code
    pub fn take_code(&mut self, constants: &ConstantsPool) -> Result<Option<CodeNode>, Error> {
        self.code_mut(constants)?;
        match std::mem::replace(&mut self.body, MethodBody::Absent) {
            MethodBody::Edited(code) => Ok(Some(code)),
            _ => Ok(None),
        }
    }

    fn into_method(
        self,
        owner: &str,
        constants: &mut ConstantsPool,
        version: Version,
        hierarchy: &dyn ClassHierarchy,
    ) -> Result<Method, Error> {
        let mut attributes = vec![];
        match self.body {
            MethodBody::Absent => (),
            MethodBody::Raw(attribute) => attributes.push(attribute),
            MethodBody::Edited(code) => {
                let context = MethodContext {
                    owner,
                    name: &self.name,
                    descriptor: &self.descriptor,
                    is_static: self.access_flags.contains(MethodAccessFlags::STATIC),
                };
                let code = code.assemble(context, constants, version, hierarchy)?;
                attributes.push(constants.get_attribute(&code)?);
            }
        }
        attributes.extend(self.attributes);
        attributes.extend(AnnotationNode::to_attribute(
            RUNTIME_VISIBLE_ANNOTATIONS,
            &self.visible_annotations,
            constants,
        )?);
        attributes.extend(AnnotationNode::to_attribute(
            RUNTIME_INVISIBLE_ANNOTATIONS,
            &self.invisible_annotations,
            constants,
        )?);
        if let Some(default) = &self.annotation_default {
            attributes.push(default.to_default_attribute(constants)?);
        }

        Ok(Method {
            access_flags: self.access_flags,
            name_index: constants.get_utf8(self.name.as_str())?,
            descriptor_index: constants.get_utf8(self.descriptor.as_str())?,
            attributes,
        })
    }
}

impl ClassNode {
    /// Minimal class with no members, used to build classes from scratch
    pub fn new(
        version: Version,
        access_flags: ClassAccessFlags,
        name: impl Into<String>,
        super_name: Option<String>,
    ) -> ClassNode {
        ClassNode {
            version,
            constants: ConstantsPool::new(),
            access_flags,
            name: name.into(),
            super_name,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            visible_annotations: vec![],
            invisible_annotations: vec![],
            attributes: vec![],
        }
    }

    /// Every annotation on the class, visible ones first
    pub fn annotations(&self) -> impl Iterator<Item = &AnnotationNode> {
        self.visible_annotations
            .iter()
            .chain(self.invisible_annotations.iter())
    }
}
