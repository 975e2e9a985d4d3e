use crate::jvm::{
    AnnotationNode, ClassAccessFlags, ClassNode, ElementValue, MethodAccessFlags, MethodNode,
};
use std::collections::BTreeMap;
use std::fmt;

/// Structural facts about one class, captured when it is first registered
#[derive(Debug, Clone)]
pub struct ClassFact {
    pub access_flags: ClassAccessFlags,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub annotations: Vec<AnnotationFact>,
    pub methods: Vec<MethodFact>,
}

#[derive(Debug, Clone)]
pub struct MethodFact {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
    pub annotations: Vec<AnnotationFact>,

    /// Declared default, for elements of annotation interfaces
    pub default_value: Option<ElementValue>,
}

/// Annotation by descriptor, with the properties given explicitly where it is used
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationFact {
    pub descriptor: String,
    pub values: BTreeMap<String, ElementValue>,
}

/// Name, descriptor, and access of a method: enough to look it up in an override chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSig<'a> {
    pub name: &'a str,
    pub descriptor: &'a str,
    pub access_flags: MethodAccessFlags,
}

impl<'a> MethodSig<'a> {
    pub fn new(name: &'a str, descriptor: &'a str, access_flags: MethodAccessFlags) -> Self {
        MethodSig {
            name,
            descriptor,
            access_flags,
        }
    }

    pub fn of(method: &'a MethodNode) -> Self {
        MethodSig::new(&method.name, &method.descriptor, method.access_flags)
    }

    /// Do two methods occupy the same override slot?
    ///
    /// Visibility and the other modifiers can change between an overridden method and its
    /// override, but privacy and staticness can't.
    pub fn matches(&self, name: &str, descriptor: &str, access_flags: MethodAccessFlags) -> bool {
        self.name == name
            && self.descriptor == descriptor
            && (self.access_flags & MethodAccessFlags::OVERRIDE_RELEVANT)
                == (access_flags & MethodAccessFlags::OVERRIDE_RELEVANT)
    }
}

/// Renders as `name + descriptor` (eg. `run()V`)
impl<'a> fmt::Display for MethodSig<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.descriptor)
    }
}

impl ClassFact {
    pub fn from_class(class: &ClassNode) -> ClassFact {
        ClassFact {
            access_flags: class.access_flags,
            name: class.name.clone(),
            super_name: class.super_name.clone(),
            interfaces: class.interfaces.clone(),
            annotations: AnnotationFact::collect(class.annotations()),
            methods: class.methods.iter().map(MethodFact::from_method).collect(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_annotation(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::ANNOTATION)
    }

    /// First method in the same override slot as `sig`
    pub fn find_method(&self, sig: &MethodSig) -> Option<&MethodFact> {
        self.methods
            .iter()
            .find(|method| sig.matches(&method.name, &method.descriptor, method.access_flags))
    }

    pub fn find_annotation(&self, descriptor: &str) -> Option<&AnnotationFact> {
        find_annotation(&self.annotations, descriptor)
    }
}

impl MethodFact {
    pub fn from_method(method: &MethodNode) -> MethodFact {
        MethodFact {
            access_flags: method.access_flags,
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            annotations: AnnotationFact::collect(method.annotations()),
            default_value: method.annotation_default.clone(),
        }
    }

    pub fn find_annotation(&self, descriptor: &str) -> Option<&AnnotationFact> {
        find_annotation(&self.annotations, descriptor)
    }

    /// Return descriptor (`V` for `void`)
    pub fn return_descriptor(&self) -> &str {
        match self.descriptor.rsplit_once(')') {
            Some((_, ret)) => ret,
            None => &self.descriptor,
        }
    }
}

impl AnnotationFact {
    pub fn from_node(annotation: &AnnotationNode) -> AnnotationFact {
        AnnotationFact {
            descriptor: annotation.descriptor.clone(),
            values: annotation.values.iter().cloned().collect(),
        }
    }

    /// Snapshot a list of annotations, keeping only the first occurrence of each descriptor
    fn collect<'a>(annotations: impl Iterator<Item = &'a AnnotationNode>) -> Vec<AnnotationFact> {
        let mut facts: Vec<AnnotationFact> = vec![];
        for annotation in annotations {
            if find_annotation(&facts, &annotation.descriptor).is_none() {
                facts.push(AnnotationFact::from_node(annotation));
            }
        }
        facts
    }
}

fn find_annotation<'a>(
    annotations: &'a [AnnotationFact],
    descriptor: &str,
) -> Option<&'a AnnotationFact> {
    annotations
        .iter()
        .find(|annotation| annotation.descriptor == descriptor)
}
