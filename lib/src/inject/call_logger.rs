use super::edit::strip_first_annotation;
use super::Injector;
use crate::jvm::code::opcodes::ACONST_NULL;
use crate::jvm::code::Insn;
use crate::jvm::{AnnotationNode, ClassNode};
use crate::model::Model;
use crate::ProcessError;
use log::debug;

pub const LOG_CALL: (&str, &str) = (
    "logCall",
    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;)V",
);

/// Property of the annotation passed on to the logger
pub const DESCRIPTION: &str = "description";

/// Logs calls to annotated methods
///
/// Each annotated method starts by passing its name, the annotation's `description` and a hash
/// identifying the method to the logger's `logCall`.
#[derive(Debug, Clone)]
pub struct CallLoggerInjector {
    /// Descriptor of the marker annotation
    pub annotation: String,

    /// Logger class (internal name), `None` to only strip the annotation
    pub logger: Option<String>,

    pub ignored_packages: Vec<String>,
}

/// Stable identifier of a method: 32-bit FNV-1a over owner, name and descriptor
pub fn method_hash(owner: &str, name: &str, descriptor: &str) -> String {
    let mut hash: u32 = 0x811c9dc5;
    for byte in owner.bytes().chain(name.bytes()).chain(descriptor.bytes()) {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    format!("{:x}", hash)
}

fn description(annotation: &AnnotationNode) -> Option<&str> {
    annotation
        .values
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(DESCRIPTION))
        .and_then(|(_, value)| value.as_str())
}

impl Injector for CallLoggerInjector {
    fn ignored_packages(&self) -> &[String] {
        &self.ignored_packages
    }

    fn process_class(&self, class: &mut ClassNode, _model: &Model) -> Result<(), ProcessError> {
        for method in &mut class.methods {
            let found = strip_first_annotation(
                &mut method.visible_annotations,
                &mut method.invisible_annotations,
                &self.annotation,
            );
            let (annotation, logger) = match (found, &self.logger) {
                (Some(annotation), Some(logger)) => (annotation, logger),
                _ => continue,
            };

            debug!("Logging calls to {}.{}{}", class.name, method.name, method.descriptor);
            let call = vec![
                Insn::ldc_string(method.name.as_str()),
                match description(&annotation) {
                    Some(description) => Insn::ldc_string(description),
                    None => Insn::Simple(ACONST_NULL),
                },
                Insn::ldc_string(method_hash(&class.name, &method.name, &method.descriptor)),
                Insn::invoke_static(logger, LOG_CALL.0, LOG_CALL.1),
            ];
            if let Some(code) = method.code_mut(&class.constants)? {
                code.insert_all(0, call);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::inject::test::{class, method};
    use crate::jvm::code::opcodes::RETURN;
    use crate::jvm::{ElementValue, MethodAccessFlags, OBJECT};
    use crate::model::test::annotated;

    const LOGGED: &str = "Ldebug/Logged;";

    fn injector(logger: Option<&str>) -> CallLoggerInjector {
        CallLoggerInjector {
            annotation: LOGGED.to_owned(),
            logger: logger.map(String::from),
            ignored_packages: vec![],
        }
    }

    #[test]
    fn hashes() {
        assert_eq!(method_hash("", "", ""), "811c9dc5");
        assert_eq!(method_hash("a", "", ""), "e40c292c");
        assert_eq!(method_hash("a/B", "c", "()V"), method_hash("a/", "Bc", "()V"));
        assert_ne!(method_hash("a/B", "c", "()V"), method_hash("a/B", "c", "()I"));
    }

    #[test]
    fn logging() {
        let mut logged = class("a/Api", OBJECT);
        let mut load = method(MethodAccessFlags::PUBLIC, "load", "()V", vec![Insn::Simple(RETURN)]);
        load.invisible_annotations.push(annotated(
            LOGGED,
            &[(DESCRIPTION, ElementValue::String(String::from("Loads things")))],
        ));
        logged.methods.push(load);
        let mut bare = method(MethodAccessFlags::PUBLIC, "bare", "()V", vec![Insn::Simple(RETURN)]);
        bare.visible_annotations.push(AnnotationNode::new(LOGGED));
        logged.methods.push(bare);

        injector(Some("debug/Logger"))
            .process(&mut logged, &Model::new())
            .unwrap();

        let load = logged.methods[0].decode_code(&logged.constants).unwrap().unwrap();
        assert_eq!(
            load.instructions,
            vec![
                Insn::ldc_string("load"),
                Insn::ldc_string("Loads things"),
                Insn::ldc_string(method_hash("a/Api", "load", "()V")),
                Insn::invoke_static("debug/Logger", LOG_CALL.0, LOG_CALL.1),
                Insn::Simple(RETURN),
            ]
        );
        assert!(logged.methods[0].invisible_annotations.is_empty());

        let bare = logged.methods[1].decode_code(&logged.constants).unwrap().unwrap();
        assert_eq!(bare.instructions[1], Insn::Simple(ACONST_NULL), "no description");
    }

    #[test]
    fn stripping_only() {
        let mut logged = class("a/Api", OBJECT);
        let mut load = method(MethodAccessFlags::PUBLIC, "load", "()V", vec![Insn::Simple(RETURN)]);
        load.visible_annotations.push(AnnotationNode::new(LOGGED));
        logged.methods.push(load);

        injector(None).process(&mut logged, &Model::new()).unwrap();
        assert!(logged.methods[0].visible_annotations.is_empty());
        let code = logged.methods[0].decode_code(&logged.constants).unwrap().unwrap();
        assert_eq!(code.instructions, vec![Insn::Simple(RETURN)]);
    }
}
