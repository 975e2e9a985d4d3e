//! Shape checks on the user classes named by the configuration
//!
//! Handlers, receivers, and annotations are looked up on the classpath and checked before any
//! class is transformed, so that a typo in the configuration fails the whole run up front instead
//! of producing classes that call into nothing.

use crate::classpath::{ClassHeader, Classpath};
use crate::jvm::{
    java_to_internal, ClassAccessFlags, ElementValue, Error, MethodAccessFlags, MethodDescriptor,
    ParseDescriptor, ANNOTATION,
};
use crate::ConfigError;

const RETENTION: &str = "Ljava/lang/annotation/Retention;";

pub struct Validator<'a> {
    classpath: &'a Classpath,
}

impl<'a> Validator<'a> {
    pub fn new(classpath: &'a Classpath) -> Validator<'a> {
        Validator { classpath }
    }

    /// Load a class by java name, failing if it is missing or not public
    pub fn check_class_exists_and_is_public(&self, java_name: &str) -> Result<&'a ClassHeader, ConfigError> {
        let class = self.load(java_name)?;
        if !class.is_public() {
            return Err(ConfigError::ClassNotPublic(java_name.to_owned()));
        }
        Ok(class)
    }

    /// Check that the class declares a public static method with exactly the parameters of
    /// `descriptor`
    ///
    /// Only parameters are compared: the return type is not part of the lookup.
    pub fn check_method_is_public_static(
        &self,
        class: &ClassHeader,
        name: &str,
        descriptor: &str,
    ) -> Result<(), ConfigError> {
        let wanted = parameters_of(descriptor);
        let method = class
            .methods
            .iter()
            .find(|method| method.name == name && parameters_of(&method.descriptor) == wanted)
            .ok_or_else(|| ConfigError::MethodNotFound {
                class: crate::jvm::internal_to_java(&class.name),
                name: name.to_owned(),
                parameters: parameter_java_names(descriptor),
            })?;

        let public_static = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;
        if !method.access_flags.contains(public_static) {
            return Err(ConfigError::MethodNotPublicStatic {
                class: crate::jvm::internal_to_java(&class.name),
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    /// Load an annotation interface by java name
    ///
    /// The annotation must be retained in class files, so it needs `@Retention` with either
    /// `CLASS` or `RUNTIME`. Leaving `@Retention` out is rejected too.
    pub fn load_annotation(&self, java_name: &str) -> Result<&'a ClassHeader, ConfigError> {
        let class = self.load(java_name)?;
        let is_annotation = class.access_flags.contains(ClassAccessFlags::ANNOTATION)
            || class.interfaces.iter().any(|interface| interface == ANNOTATION);
        if !is_annotation {
            return Err(ConfigError::NotAnAnnotation(java_name.to_owned()));
        }

        let retained = class
            .find_annotation(RETENTION)
            .and_then(|retention| retention.value("value"))
            .map_or(false, |policy| match policy {
                ElementValue::Enum { constant, .. } => constant == "CLASS" || constant == "RUNTIME",
                _ => false,
            });
        if !retained {
            return Err(ConfigError::BadRetention(java_name.to_owned()));
        }
        Ok(class)
    }

    /// Check that an annotation declares a property
    pub fn check_annotation_declares(
        &self,
        annotation: &ClassHeader,
        property: &str,
    ) -> Result<(), ConfigError> {
        let declared = annotation
            .methods
            .iter()
            .any(|method| method.name == property && method.descriptor.starts_with("()"));
        if declared {
            Ok(())
        } else {
            Err(ConfigError::MissingAnnotationProperty {
                annotation: crate::jvm::internal_to_java(&annotation.name),
                property: property.to_owned(),
            })
        }
    }

    fn load(&self, java_name: &str) -> Result<&'a ClassHeader, ConfigError> {
        match self.classpath.load(&java_to_internal(java_name)) {
            Ok(class) => Ok(class),
            Err(Error::TypeNotFound(_)) => Err(ConfigError::ClassNotFound(java_name.to_owned())),
            Err(err) => Err(ConfigError::Class(err)),
        }
    }
}

/// Parameter part of a method descriptor, parenthesis included
fn parameters_of(descriptor: &str) -> &str {
    match descriptor.find(')') {
        Some(end) => &descriptor[..=end],
        None => descriptor,
    }
}

fn parameter_java_names(descriptor: &str) -> Vec<String> {
    match MethodDescriptor::parse(descriptor) {
        Ok(parsed) => parsed.parameters.iter().map(|param| param.java_name()).collect(),
        Err(_) => vec![descriptor.to_owned()],
    }
}
