//! Instrumentation policies
//!
//! Each injector rewrites one class at a time, consulting the [`Model`] of the whole batch for
//! anything that depends on the hierarchy. Injectors run in a fixed order (see
//! [`crate::process`]) and always strip their marker annotations, even when they are disabled and
//! inject nothing.

mod benchmark;
mod call_logger;
mod crash_shield;
pub mod edit;
mod thread_check;

pub use benchmark::*;
pub use call_logger::*;
pub use crash_shield::*;
pub use thread_check::*;

use crate::jvm::{internal_to_java, package_of_internal, ClassNode};
use crate::model::Model;
use crate::ProcessError;

/// One instrumentation policy
pub trait Injector {
    /// Packages (java names) whose classes are left alone
    fn ignored_packages(&self) -> &[String] {
        &[]
    }

    /// Rewrite a class that passed the package filter
    fn process_class(&self, class: &mut ClassNode, model: &Model) -> Result<(), ProcessError>;

    /// Rewrite a class, unless it is a `package-info` or lives in an ignored package
    fn process(&self, class: &mut ClassNode, model: &Model) -> Result<(), ProcessError> {
        if internal_to_java(&class.name).ends_with(".package-info") || class.name == "package-info" {
            return Ok(());
        }
        let package = package_of_internal(&class.name);
        if self.ignored_packages().iter().any(|ignored| *ignored == package) {
            return Ok(());
        }
        self.process_class(class, model)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::jvm::class_file::Version;
    use crate::jvm::code::opcodes::*;
    use crate::jvm::code::{CodeNode, Insn};
    use crate::jvm::{ClassAccessFlags, MethodAccessFlags, MethodNode, OBJECT};

    /// Class with no methods
    pub(crate) fn class(name: &str, super_name: &str) -> ClassNode {
        ClassNode::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            name,
            Some(super_name.to_owned()),
        )
    }

    /// Method with the given body
    pub(crate) fn method(
        access_flags: MethodAccessFlags,
        name: &str,
        descriptor: &str,
        instructions: Vec<Insn>,
    ) -> MethodNode {
        let mut method = MethodNode::new(access_flags, name, descriptor);
        let mut code = CodeNode::new();
        code.instructions = instructions;
        method.set_code(code);
        method
    }

    /// `super()` followed by `return`
    pub(crate) fn default_constructor(super_name: &str) -> MethodNode {
        method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            "()V",
            vec![
                Insn::aload(0),
                Insn::Method(
                    INVOKESPECIAL,
                    crate::jvm::class_file::MemberRef::new(super_name, "<init>", "()V"),
                ),
                Insn::Simple(RETURN),
            ],
        )
    }

    struct Counting;

    impl Injector for Counting {
        fn ignored_packages(&self) -> &[String] {
            std::slice::from_ref(&IGNORED)
        }

        fn process_class(&self, class: &mut ClassNode, _: &Model) -> Result<(), ProcessError> {
            class.interfaces.push(String::from("a/Seen"));
            Ok(())
        }
    }

    static IGNORED: String = String::new();

    #[test]
    fn package_filter() {
        let model = Model::new();

        let mut info = class("a/b/package-info", OBJECT);
        Counting.process(&mut info, &model).unwrap();
        assert!(info.interfaces.is_empty(), "package-info classes are skipped");

        let mut default_package = class("Top", OBJECT);
        Counting.process(&mut default_package, &model).unwrap();
        assert!(
            default_package.interfaces.is_empty(),
            "the default package is ignored by this injector"
        );

        let mut regular = class("a/b/C", OBJECT);
        Counting.process(&mut regular, &model).unwrap();
        assert_eq!(regular.interfaces, vec!["a/Seen"]);
    }
}
