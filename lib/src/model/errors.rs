use std::fmt;

/// Query about a class, method, or annotation that was never registered
///
/// The injectors only ask about things they have seen, so these indicate a bug rather than bad
/// input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownClass(String),
    UnknownMethod {
        class: String,
        name: String,
        descriptor: String,
        access: u16,
    },
    MissingClassAnnotation {
        class: String,
        annotation: String,
    },
    MissingMethodAnnotation {
        name: String,
        descriptor: String,
        access: u16,
        annotation: String,
    },
    NotAnAnnotation(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownClass(class) => {
                write!(f, "Class '{}' is not known to the model", class)
            }
            ModelError::UnknownMethod {
                class,
                name,
                descriptor,
                access,
            } => write!(
                f,
                "Class '{}' does not contain method {}{} with access {}",
                class, name, descriptor, access
            ),
            ModelError::MissingClassAnnotation { class, annotation } => write!(
                f,
                "Class '{}' does not have annotation with descriptor '{}'",
                class, annotation
            ),
            ModelError::MissingMethodAnnotation {
                name,
                descriptor,
                access,
                annotation,
            } => write!(
                f,
                "Method '{}{}' (access {}) does not have annotation with descriptor '{}'",
                name, descriptor, access, annotation
            ),
            ModelError::NotAnAnnotation(descriptor) => {
                write!(f, "Class {} is not an annotation", descriptor)
            }
        }
    }
}

impl std::error::Error for ModelError {}
