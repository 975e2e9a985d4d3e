use crate::jvm;
use crate::model::ModelError;
use std::fmt;
use std::path::PathBuf;
use zip::result::ZipError;

/// Problems with the configuration, found before any class is touched
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Zip(ZipError),

    /// A class on the classpath could not be read
    Class(jvm::Error),

    UnknownDirective {
        path: String,
        line: usize,
        directive: String,
    },
    NotSingleValue {
        path: String,
        line: usize,
        directive: String,
    },
    WrongValueCount {
        path: String,
        line: usize,
        directive: String,
        expected: usize,
    },
    AlreadyDefined {
        path: String,
        line: usize,
        directive: String,
        previous: String,
    },
    NotDefined {
        path: String,
        directive: String,
    },
    NotBoolean(String),

    /// Java name of a class that isn't on the classpath
    ClassNotFound(String),
    ClassNotPublic(String),
    MethodNotFound {
        class: String,
        name: String,
        parameters: Vec<String>,
    },
    MethodNotPublicStatic {
        class: String,
        name: String,
    },
    NotAnAnnotation(String),
    BadRetention(String),
    MissingAnnotationProperty {
        annotation: String,
        property: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "{}", err),
            ConfigError::Zip(err) => write!(f, "{}", err),
            ConfigError::Class(err) => write!(f, "{}", err),
            ConfigError::UnknownDirective {
                path,
                line,
                directive,
            } => write!(f, "{}:{}: Unknown directive: '{}'", path, line, directive),
            ConfigError::NotSingleValue {
                path,
                line,
                directive,
            } => write!(
                f,
                "{}:{}: directive '{}' should have a single value",
                path, line, directive
            ),
            ConfigError::WrongValueCount {
                path,
                line,
                directive,
                expected,
            } => write!(
                f,
                "{}:{}: directive '{}' should have {} values",
                path, line, directive, expected
            ),
            ConfigError::AlreadyDefined {
                path,
                line,
                directive,
                previous,
            } => write!(
                f,
                "{}:{}: Setting '{}' already defined (previous value '{}')",
                path, line, directive, previous
            ),
            ConfigError::NotDefined { path, directive } => {
                write!(f, "{}: Setting '{}' not defined", path, directive)
            }
            ConfigError::NotBoolean(value) => {
                write!(f, "'{}' is not 'true' or 'false'", value)
            }
            ConfigError::ClassNotFound(class) => write!(f, "Failed to load class '{}'", class),
            ConfigError::ClassNotPublic(class) => write!(f, "Class '{}' is not public", class),
            ConfigError::MethodNotFound {
                class,
                name,
                parameters,
            } => write!(
                f,
                "Method '{}' with parameters ({}) not found in class '{}'",
                name,
                parameters.join(", "),
                class
            ),
            ConfigError::MethodNotPublicStatic { class, name } => write!(
                f,
                "Method '{}' of class '{}' is not public static",
                name, class
            ),
            ConfigError::NotAnAnnotation(class) => write!(
                f,
                "'{}' is not a subclass of 'java.lang.annotation.Annotation'",
                class
            ),
            ConfigError::BadRetention(class) => write!(
                f,
                "Annotation '{}' must have @Retention with RetentionPolicy.CLASS or RetentionPolicy.RUNTIME",
                class
            ),
            ConfigError::MissingAnnotationProperty {
                annotation,
                property,
            } => write!(
                f,
                "Annotation '{}' must declare a method {}",
                annotation, property
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Zip(err) => Some(err),
            ConfigError::Class(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> ConfigError {
        ConfigError::Io(err)
    }
}

impl From<ZipError> for ConfigError {
    fn from(err: ZipError) -> ConfigError {
        ConfigError::Zip(err)
    }
}

impl From<jvm::Error> for ConfigError {
    fn from(err: jvm::Error) -> ConfigError {
        ConfigError::Class(err)
    }
}

/// Where a thread annotation was found, and under which name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedClasses {
    pub classes: Vec<String>,
    pub annotation: String,
}

/// Failure to process one class or one file
#[derive(Debug)]
pub enum ProcessError {
    Io(std::io::Error),
    Zip(ZipError),
    Class(jvm::Error),
    Model(ModelError),

    AnnotationNotKnown(String),
    MissingProperty {
        annotation: String,
        property: String,
    },
    PropertyNotInt {
        annotation: String,
        property: String,
        found: String,
    },

    /// Classes up the hierarchy disagree on a property of a method annotation
    InconsistentInheritedValues {
        class: String,
        name: String,
        descriptor: String,
        access: u16,
        property: String,
        annotation: String,

        /// Classes giving a value, with the value each one gives
        values: Vec<(String, i32)>,
    },

    /// A constructor whose delegating call can't be singled out
    UnsupportedConstructor {
        class: String,
        name: String,
        descriptor: String,
    },

    /// More than one thread requirement applies to a class (or to a method, when `method` is set)
    InconsistentThreadAnnotations {
        method: Option<(String, String, u16)>,
        ui: AnnotatedClasses,
        worker: AnnotatedClasses,
        any: AnnotatedClasses,
    },

    CreateDirectory {
        directory: PathBuf,
        source: std::io::Error,
    },

    /// Another error, with what was being processed when it happened
    Context {
        context: String,
        source: Box<ProcessError>,
    },

    /// Every failure in a batch
    Batch(Vec<ProcessError>),
}

impl ProcessError {
    /// Wrap with a description of what was being processed
    pub fn context(self, context: impl Into<String>) -> ProcessError {
        ProcessError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Io(err) => write!(f, "{}", err),
            ProcessError::Zip(err) => write!(f, "{}", err),
            ProcessError::Class(err) => write!(f, "{}", err),
            ProcessError::Model(err) => write!(f, "{}", err),
            ProcessError::AnnotationNotKnown(annotation) => {
                write!(f, "Annotation not known: {}", annotation)
            }
            ProcessError::MissingProperty {
                annotation,
                property,
            } => write!(
                f,
                "Annotation {} does not contain property {}",
                annotation, property
            ),
            ProcessError::PropertyNotInt {
                annotation,
                property,
                found,
            } => write!(
                f,
                "Annotation {} property {} has type {} instead of int",
                annotation, property, found
            ),
            ProcessError::InconsistentInheritedValues {
                class,
                name,
                descriptor,
                access,
                property,
                annotation,
                values,
            } => {
                write!(
                    f,
                    "Class {}, method {}{} (access {}) has multiple different inherited values for property {} of annotation {} from ",
                    class, name, descriptor, access, property, annotation
                )?;
                let values: Vec<String> = values
                    .iter()
                    .map(|(class, value)| format!("{}={}", class, value))
                    .collect();
                write!(f, "[{}]", values.join(","))
            }
            ProcessError::UnsupportedConstructor {
                class,
                name,
                descriptor,
            } => write!(
                f,
                "Don't know what to do to transform method {}{} of class {} for benchmarking",
                name, descriptor, class
            ),
            ProcessError::InconsistentThreadAnnotations {
                method,
                ui,
                worker,
                any,
            } => {
                write!(f, "Inconsistent annotations in class hierarchy")?;
                if let Some((name, descriptor, access)) = method {
                    write!(
                        f,
                        " when analyzing method {}{} (access {})",
                        name, descriptor, access
                    )?;
                }
                write!(
                    f,
                    ": [{}] have UI annotation ({}), [{}] have worker annotation ({}) and [{}] have any annotation ({})",
                    ui.classes.join(","),
                    ui.annotation,
                    worker.classes.join(","),
                    worker.annotation,
                    any.classes.join(","),
                    any.annotation
                )
            }
            ProcessError::CreateDirectory { directory, source } => write!(
                f,
                "Failed to create directory '{}': {}",
                directory.display(),
                source
            ),
            ProcessError::Context { context, source } => write!(f, "{}: {}", context, source),
            ProcessError::Batch(errors) => {
                write!(f, "Error running annotation processor:")?;
                for error in errors {
                    write!(f, "\n{}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessError::Io(err) => Some(err),
            ProcessError::Zip(err) => Some(err),
            ProcessError::Class(err) => Some(err),
            ProcessError::Model(err) => Some(err),
            ProcessError::CreateDirectory { source, .. } => Some(source),
            ProcessError::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProcessError {
    fn from(err: std::io::Error) -> ProcessError {
        ProcessError::Io(err)
    }
}

impl From<ZipError> for ProcessError {
    fn from(err: ZipError) -> ProcessError {
        ProcessError::Zip(err)
    }
}

impl From<jvm::Error> for ProcessError {
    fn from(err: jvm::Error) -> ProcessError {
        ProcessError::Class(err)
    }
}

impl From<ModelError> for ProcessError {
    fn from(err: ModelError) -> ProcessError {
        ProcessError::Model(err)
    }
}
