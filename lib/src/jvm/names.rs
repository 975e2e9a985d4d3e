//! Conversions between the ways a class can be named
//!
//!   - java names use dots: `java.lang.Object`
//!   - internal names use slashes: `java/lang/Object`
//!   - descriptors wrap the internal name: `Ljava/lang/Object;`
//!
//! See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.2.1>

/// Name of instance initializers
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name of class initializers
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// Root of the class hierarchy
pub const OBJECT: &str = "java/lang/Object";

/// Root of everything that can be thrown
pub const THROWABLE: &str = "java/lang/Throwable";

pub const STRING: &str = "java/lang/String";
pub const CLASS: &str = "java/lang/Class";

/// Every annotation interface extends this
pub const ANNOTATION: &str = "java/lang/annotation/Annotation";

pub fn java_to_internal(java_name: &str) -> String {
    java_name.replace('.', "/")
}

pub fn internal_to_java(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

pub fn internal_to_descriptor(internal_name: &str) -> String {
    format!("L{};", internal_name)
}

pub fn java_to_descriptor(java_name: &str) -> String {
    internal_to_descriptor(&java_to_internal(java_name))
}

/// Extract the internal name out of an object descriptor
///
/// Returns `None` for primitive or array descriptors.
pub fn descriptor_to_internal(descriptor: &str) -> Option<&str> {
    descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
}

pub fn is_constructor_name(name: &str) -> bool {
    name == CONSTRUCTOR_NAME
}

pub fn is_static_initializer_name(name: &str) -> bool {
    name == STATIC_INITIALIZER_NAME
}

/// Package of a class, in java form (empty for the default package)
pub fn package_of_internal(internal_name: &str) -> String {
    match internal_name.rfind('/') {
        Some(idx) => internal_to_java(&internal_name[..idx]),
        None => String::new(),
    }
}

/// Method names may contain `<` and `>` only for the two initializers, so generated names derived
/// from them replace those characters
pub fn sanitize_method_name(name: &str) -> String {
    name.replace(['<', '>'], "$")
}
