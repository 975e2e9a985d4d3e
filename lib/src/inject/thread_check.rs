use super::edit::strip_first_annotation;
use super::{Injector, RENAME_PREFIX};
use crate::jvm::code::opcodes::*;
use crate::jvm::code::{Insn, SynLabel};
use crate::jvm::{
    is_static_initializer_name, java_to_descriptor, AnnotationNode, ClassNode, MethodAccessFlags,
};
use crate::model::{MethodSig, Model};
use crate::{AnnotatedClasses, ProcessError};
use log::debug;
use std::collections::BTreeSet;

pub const UI_VIOLATION: &str = "uiThreadViolationDetected";
pub const WORKER_VIOLATION: &str = "workerThreadViolationDetected";
pub const VIOLATION_DESCRIPTOR: &str = "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/String;)V";

const LOOPER: &str = "android/os/Looper";
const GET_LOOPER_DESCRIPTOR: &str = "()Landroid/os/Looper;";

/// Thread a method expects to be called on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Checking {
    Ui,
    Worker,
    Any,
}

/// Reports methods called on the wrong thread
///
/// Classes and methods are annotated as UI-only, worker-only, or callable from any thread.
/// Annotations are inherited through the hierarchy, and a method's own requirement takes
/// precedence over its class's. UI and worker methods get a guard comparing the current looper
/// with the main one, which calls the handler on a mismatch and then carries on.
#[derive(Debug, Clone, Default)]
pub struct ThreadCheckInjector {
    /// Violation handler (internal name), `None` to only strip the annotations
    pub handler: Option<String>,

    /// Java names of the annotation classes
    pub ui_annotation: Option<String>,
    pub worker_annotation: Option<String>,
    pub any_annotation: Option<String>,

    pub ignored_packages: Vec<String>,
}

impl ThreadCheckInjector {
    fn annotations(&self) -> [(Checking, &Option<String>); 3] {
        [
            (Checking::Ui, &self.ui_annotation),
            (Checking::Worker, &self.worker_annotation),
            (Checking::Any, &self.any_annotation),
        ]
    }

    fn strip(&self, visible: &mut Vec<AnnotationNode>, invisible: &mut Vec<AnnotationNode>) {
        for (_, annotation) in self.annotations() {
            if let Some(annotation) = annotation {
                strip_first_annotation(visible, invisible, &java_to_descriptor(annotation));
            }
        }
    }

    /// Pick the one requirement the closures agree on
    fn resolve(
        &self,
        closures: [BTreeSet<String>; 3],
        method: Option<(String, String, u16)>,
    ) -> Result<Option<Checking>, ProcessError> {
        let [ui, worker, any] = closures;
        let found = [(Checking::Ui, &ui), (Checking::Worker, &worker), (Checking::Any, &any)];
        let mut defined = found.iter().filter(|(_, classes)| !classes.is_empty());
        let checking = defined.next().map(|(checking, _)| *checking);
        if defined.next().is_none() {
            return Ok(checking);
        }

        let named = |classes: BTreeSet<String>, annotation: &Option<String>| AnnotatedClasses {
            classes: classes.into_iter().collect(),
            annotation: annotation.clone().unwrap_or_default(),
        };
        Err(ProcessError::InconsistentThreadAnnotations {
            method,
            ui: named(ui, &self.ui_annotation),
            worker: named(worker, &self.worker_annotation),
            any: named(any, &self.any_annotation),
        })
    }

    fn class_checking(&self, class: &ClassNode, model: &Model) -> Result<Option<Checking>, ProcessError> {
        let closures = self.annotations().map(|(_, annotation)| match annotation {
            Some(annotation) => {
                model.closure_with_annotation_filter(&class.name, &java_to_descriptor(annotation))
            }
            None => BTreeSet::new(),
        });
        self.resolve(closures, None)
    }

    fn method_checking(
        &self,
        class: &ClassNode,
        sig: &MethodSig,
        model: &Model,
    ) -> Result<Option<Checking>, ProcessError> {
        let closures = self.annotations().map(|(_, annotation)| match annotation {
            Some(annotation) => model.method_closure_with_annotation_filter(
                &class.name,
                sig,
                &java_to_descriptor(annotation),
            ),
            None => BTreeSet::new(),
        });
        let method = (
            sig.name.to_owned(),
            sig.descriptor.to_owned(),
            sig.access_flags.bits(),
        );
        self.resolve(closures, Some(method))
    }
}

/// Call the handler unless the current thread is the expected one
fn looper_check(
    class_name: &str,
    name: &str,
    descriptor: &str,
    handler: &str,
    ui: bool,
    ok: SynLabel,
) -> Vec<Insn> {
    let (jump, violation) = if ui {
        (IF_ACMPEQ, UI_VIOLATION)
    } else {
        (IF_ACMPNE, WORKER_VIOLATION)
    };
    vec![
        Insn::invoke_static(LOOPER, "myLooper", GET_LOOPER_DESCRIPTOR),
        Insn::invoke_static(LOOPER, "getMainLooper", GET_LOOPER_DESCRIPTOR),
        Insn::Jump(jump, ok),
        Insn::ldc_class(class_name),
        Insn::ldc_string(name),
        Insn::ldc_string(descriptor),
        Insn::invoke_static(handler, violation, VIOLATION_DESCRIPTOR),
        Insn::Label(ok),
    ]
}

impl Injector for ThreadCheckInjector {
    fn ignored_packages(&self) -> &[String] {
        &self.ignored_packages
    }

    fn process_class(&self, class: &mut ClassNode, model: &Model) -> Result<(), ProcessError> {
        let class_checking = self.class_checking(class, model)?;
        self.strip(&mut class.visible_annotations, &mut class.invisible_annotations);
        let allow_injection = !class.is_interface();

        for index in 0..class.methods.len() {
            let checking = {
                let method = &class.methods[index];
                self.method_checking(class, &MethodSig::of(method), model)?
                    .or(class_checking)
            };
            let method = &mut class.methods[index];
            self.strip(&mut method.visible_annotations, &mut method.invisible_annotations);

            let handler = match &self.handler {
                Some(handler) => handler,
                None => continue,
            };
            let ui = match checking {
                Some(Checking::Ui) => true,
                Some(Checking::Worker) => false,
                Some(Checking::Any) | None => continue,
            };
            // A benchmarked body is only reached through its forwarder, which is checked already
            if !allow_injection
                || is_static_initializer_name(&method.name)
                || method.name.starts_with(RENAME_PREFIX)
                || method.access_flags.contains(MethodAccessFlags::ABSTRACT)
            {
                continue;
            }

            debug!(
                "Checking {} thread in {}.{}{}",
                if ui { "UI" } else { "worker" },
                class.name,
                method.name,
                method.descriptor
            );
            let name = method.name.clone();
            let descriptor = method.descriptor.clone();
            if let Some(code) = method.code_mut(&class.constants)? {
                let ok = code.fresh_label();
                code.insert_all(0, looper_check(&class.name, &name, &descriptor, handler, ui, ok));
            }
        }
        Ok(())
    }
}
