use super::edit::{
    extract_delegating_constructor_call, first_free_local, load_parameters, return_opcode,
    strip_annotations,
};
use super::Injector;
use crate::jvm::class_file::MemberRef;
use crate::jvm::code::opcodes::*;
use crate::jvm::code::{CodeNode, Insn, TryCatchBlock};
use crate::jvm::{
    descriptor_to_internal, internal_to_java, is_constructor_name, sanitize_method_name, ClassNode,
    ElementValue, MethodAccessFlags, MethodNode, THROWABLE,
};
use crate::model::{MethodSig, Model};
use crate::ProcessError;
use log::debug;
use std::cell::Cell;

pub const WARN_AT_MILLIS: &str = "warnAtMillis";
pub const FAIL_AT_MILLIS: &str = "failAtMillis";

pub const EXECUTED: (&str, &str) = (
    "executed",
    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;J)V",
);
pub const EXECUTED_WITH_WARNING: (&str, &str) = (
    "executedWithWarning",
    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;JJ)V",
);
pub const FAILED: (&str, &str) = (
    "failed",
    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;JJ)V",
);
pub const THROWN: (&str, &str) = (
    "thrown",
    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Ljava/lang/Throwable;J)V",
);

/// Prefix of the method that keeps the original body of a benchmarked method
pub const RENAME_PREFIX: &str = "__benchmark_";

/// Threshold value meaning "no threshold"
const UNSET: i32 = -1;

/// Thresholds of one benchmarked method, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub warn_at_millis: i32,
    pub fail_at_millis: i32,
}

impl Metrics {
    fn get(&self, property: &str) -> i32 {
        if property == WARN_AT_MILLIS {
            self.warn_at_millis
        } else {
            self.fail_at_millis
        }
    }
}

/// Times methods and reports the durations to a receiver class
///
/// The body of a benchmarked method moves to a private method named with [`RENAME_PREFIX`]. A
/// forwarder takes the original name: it times a call to the moved body, then reports to the
/// receiver's `executed`, `executedWithWarning`, `failed` or (when the body throws) `thrown`.
/// Constructors keep their delegating call in the forwarder, since the object has to be
/// initialized before the moved body can be called on it.
pub struct BenchmarkInjector {
    /// Descriptor of the annotation carrying the thresholds
    annotation: String,

    /// Receiver class (internal name), `None` to only strip the annotation
    receiver: Option<String>,

    /// Thresholds declared as defaults of the annotation, read on first use
    default_metrics: Cell<Option<Metrics>>,
}

impl BenchmarkInjector {
    pub fn new(annotation: impl Into<String>, receiver: Option<String>) -> BenchmarkInjector {
        BenchmarkInjector {
            annotation: annotation.into(),
            receiver,
            default_metrics: Cell::new(None),
        }
    }

    fn default_metrics(&self, model: &Model) -> Result<Metrics, ProcessError> {
        if let Some(metrics) = self.default_metrics.get() {
            return Ok(metrics);
        }
        let metrics = Metrics {
            warn_at_millis: self.declared_default(model, WARN_AT_MILLIS)?,
            fail_at_millis: self.declared_default(model, FAIL_AT_MILLIS)?,
        };
        self.default_metrics.set(Some(metrics));
        Ok(metrics)
    }

    /// Declared default of an `int` property of the annotation ([`UNSET`] without a default)
    fn declared_default(&self, model: &Model, property: &str) -> Result<i32, ProcessError> {
        if !model.knows_annotation(&self.annotation) {
            return Err(ProcessError::AnnotationNotKnown(self.annotation.clone()));
        }
        let properties = model.annotation_properties(&self.annotation)?;
        let typ = properties
            .get(property)
            .ok_or_else(|| ProcessError::MissingProperty {
                annotation: self.annotation.clone(),
                property: property.to_owned(),
            })?;
        if *typ != "I" {
            return Err(ProcessError::PropertyNotInt {
                annotation: self.annotation.clone(),
                property: property.to_owned(),
                found: descriptor_to_internal(typ).unwrap_or(typ).to_owned(),
            });
        }
        Ok(model
            .annotation_default_value(&self.annotation, property)?
            .and_then(ElementValue::as_int)
            .unwrap_or(UNSET))
    }

    /// Thresholds for a method, `None` if it isn't benchmarked
    fn metrics(
        &self,
        class: &ClassNode,
        method: &MethodNode,
        model: &Model,
    ) -> Result<Option<Metrics>, ProcessError> {
        let sig = MethodSig::of(method);
        if model
            .method_closure_with_annotation_filter(&class.name, &sig, &self.annotation)
            .is_empty()
        {
            return Ok(None);
        }

        let defaults = self.default_metrics(model)?;
        let metrics = Metrics {
            warn_at_millis: self.threshold(class, &sig, model, WARN_AT_MILLIS, &defaults)?,
            fail_at_millis: self.threshold(class, &sig, model, FAIL_AT_MILLIS, &defaults)?,
        };
        if metrics.warn_at_millis == UNSET && metrics.fail_at_millis == UNSET {
            Ok(None)
        } else {
            Ok(Some(metrics))
        }
    }

    /// Resolve a threshold over the classes that annotate the method
    ///
    /// A single value (or several equal ones) is used as is. When the classes disagree, a value
    /// given by the class itself settles it.
    fn threshold(
        &self,
        class: &ClassNode,
        sig: &MethodSig,
        model: &Model,
        property: &str,
        defaults: &Metrics,
    ) -> Result<i32, ProcessError> {
        let values = model.method_closure_with_annotation_filter_and_value(
            &class.name,
            sig,
            &self.annotation,
            property,
        )?;
        let mut ints = Vec::with_capacity(values.len());
        for (name, value) in &values {
            let int = value.as_int().ok_or_else(|| ProcessError::PropertyNotInt {
                annotation: self.annotation.clone(),
                property: property.to_owned(),
                found: format!("{:?}", value),
            })?;
            ints.push((name.as_str(), int));
        }

        match ints.as_slice() {
            [] => Ok(defaults.get(property)),
            [(_, value)] => Ok(*value),
            _ => {
                if let Some((_, own)) = ints.iter().find(|(name, _)| *name == class.name) {
                    return Ok(*own);
                }
                let first = ints[0].1;
                if ints.iter().all(|(_, value)| *value == first) {
                    Ok(first)
                } else {
                    Err(ProcessError::InconsistentInheritedValues {
                        class: class.name.clone(),
                        name: sig.name.to_owned(),
                        descriptor: sig.descriptor.to_owned(),
                        access: sig.access_flags.bits(),
                        property: property.to_owned(),
                        annotation: self.annotation.clone(),
                        values: ints
                            .iter()
                            .map(|(name, value)| (name.to_string(), *value))
                            .collect(),
                    })
                }
            }
        }
    }

    /// Move the body of a method out and return the timing forwarder that replaces it
    fn benchmark(
        &self,
        class: &mut ClassNode,
        index: usize,
        receiver: &str,
        metrics: Metrics,
    ) -> Result<MethodNode, ProcessError> {
        let method = &mut class.methods[index];
        let name = method.name.clone();
        let descriptor = method.descriptor.clone();
        let is_static = method.is_static();
        debug!("Benchmarking {}.{}{} with {:?}", class.name, name, descriptor, metrics);

        let delegating_call = if is_constructor_name(&name) {
            let code = method
                .code_mut(&class.constants)?
                .ok_or_else(|| unsupported(&class.name, &name, &descriptor))?;
            let call =
                extract_delegating_constructor_call(code, &class.name, class.super_name.as_deref())
                    .ok_or_else(|| unsupported(&class.name, &name, &descriptor))?;
            Some(call)
        } else {
            None
        };

        let mut forwarder = MethodNode::new(method.access_flags, name.as_str(), descriptor.as_str());
        for attribute in &method.attributes {
            let attribute_name = attribute.name(&class.constants)?;
            if attribute_name == "Exceptions" || attribute_name == "Signature" {
                forwarder.attributes.push(attribute.clone());
            }
        }

        let renamed = format!("{}{}", RENAME_PREFIX, sanitize_method_name(&name));
        method.name = renamed.clone();
        method.access_flags.remove(MethodAccessFlags::PUBLIC | MethodAccessFlags::PROTECTED);
        method.access_flags.insert(MethodAccessFlags::PRIVATE);

        let target = MemberRef::new(class.name.as_str(), renamed.as_str(), descriptor.as_str());
        let forward = ForwardCall {
            owner: &class.name,
            name: &name,
            descriptor: &descriptor,
            is_static,
            receiver,
        };
        forwarder.set_code(forward.timed_call(target, delegating_call.unwrap_or_default(), metrics)?);
        Ok(forwarder)
    }
}

fn unsupported(class: &str, name: &str, descriptor: &str) -> ProcessError {
    ProcessError::UnsupportedConstructor {
        class: class.to_owned(),
        name: name.to_owned(),
        descriptor: descriptor.to_owned(),
    }
}

/// What the forwarder reports about
struct ForwardCall<'a> {
    owner: &'a str,
    name: &'a str,
    descriptor: &'a str,
    is_static: bool,
    receiver: &'a str,
}

impl<'a> ForwardCall<'a> {
    /// Owner, name and descriptor: the first three arguments of every receiver callback
    fn push_identity(&self, insns: &mut Vec<Insn>, swap_under: bool) {
        for string in [internal_to_java(self.owner), self.name.to_owned(), self.descriptor.to_owned()] {
            insns.push(Insn::ldc_string(string));
            if swap_under {
                insns.push(Insn::Simple(SWAP));
            }
        }
    }

    /// Nanoseconds since the start time saved in `start_slot`
    fn push_elapsed(insns: &mut Vec<Insn>, start_slot: u16) {
        insns.push(Insn::Var(LLOAD, start_slot));
        insns.push(nano_time());
        insns.push(Insn::Simple(LSUB));
        insns.push(Insn::Simple(LNEG));
    }

    fn callback(&self, callback: (&str, &str)) -> Insn {
        Insn::invoke_static(self.receiver, callback.0, callback.1)
    }

    fn timed_call(
        &self,
        target: MemberRef,
        delegating_call: Vec<Insn>,
        metrics: Metrics,
    ) -> Result<CodeNode, ProcessError> {
        let start_slot = first_free_local(self.descriptor, self.is_static)?;
        let mut code = CodeNode::new();
        let call_start = code.fresh_label();
        let call_end = code.fresh_label();
        let done = code.fresh_label();
        let catch = code.fresh_label();

        let mut insns = delegating_call;
        insns.push(nano_time());
        insns.push(Insn::Var(LSTORE, start_slot));

        insns.push(Insn::Label(call_start));
        if !self.is_static {
            insns.push(Insn::aload(0));
        }
        insns.extend(load_parameters(self.descriptor, self.is_static)?);
        insns.push(if self.is_static {
            Insn::Method(INVOKESTATIC, target)
        } else {
            Insn::Method(INVOKESPECIAL, target)
        });
        insns.push(Insn::Label(call_end));

        self.push_identity(&mut insns, false);
        Self::push_elapsed(&mut insns, start_slot);

        let mut limits = vec![];
        for (millis, callback) in [
            (metrics.fail_at_millis, FAILED),
            (metrics.warn_at_millis, EXECUTED_WITH_WARNING),
        ] {
            if millis == UNSET {
                continue;
            }
            let nanos = millis as i64 * 1_000_000;
            let over = code.fresh_label();
            insns.push(Insn::Simple(DUP2));
            insns.push(Insn::push_long(nanos));
            insns.push(Insn::Simple(LCMP));
            insns.push(Insn::Jump(IFGE, over));
            limits.push((over, nanos, callback));
        }
        insns.push(self.callback(EXECUTED));
        insns.push(Insn::Label(done));
        insns.push(Insn::Simple(return_opcode(self.descriptor)));

        for (over, nanos, callback) in limits {
            insns.push(Insn::Label(over));
            insns.push(Insn::push_long(nanos));
            insns.push(self.callback(callback));
            insns.push(Insn::Jump(GOTO, done));
        }

        // Keep the throwable under the callback arguments so it can be rethrown
        insns.push(Insn::Label(catch));
        insns.push(Insn::Simple(DUP));
        self.push_identity(&mut insns, true);
        Self::push_elapsed(&mut insns, start_slot);
        insns.push(self.callback(THROWN));
        insns.push(Insn::Simple(ATHROW));

        code.instructions = insns;
        code.try_catch_blocks.push(TryCatchBlock {
            start: call_start,
            end: call_end,
            handler: catch,
            catch_type: Some(THROWABLE.to_owned()),
        });
        Ok(code)
    }
}

fn nano_time() -> Insn {
    Insn::invoke_static("java/lang/System", "nanoTime", "()J")
}

impl Injector for BenchmarkInjector {
    fn process_class(&self, class: &mut ClassNode, model: &Model) -> Result<(), ProcessError> {
        let receiver = match &self.receiver {
            Some(receiver) if !class.is_interface() => Some(receiver.as_str()),
            _ => None,
        };

        let mut forwarders = vec![];
        for index in 0..class.methods.len() {
            let method = &mut class.methods[index];
            strip_annotations(
                &mut method.visible_annotations,
                &mut method.invisible_annotations,
                &self.annotation,
            );

            let receiver = match receiver {
                Some(receiver) if method.has_code() => receiver,
                _ => continue,
            };
            if let Some(metrics) = self.metrics(class, &class.methods[index], model)? {
                forwarders.push(self.benchmark(class, index, receiver, metrics)?);
            }
        }
        class.methods.extend(forwarders);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::inject::test::{class, method};
    use crate::jvm::class_file::Version;
    use crate::jvm::{AnnotationNode, ClassAccessFlags, OBJECT};
    use crate::model::test::annotated;

    const BENCHMARK: &str = "Lbench/Benchmark;";
    const RECEIVER: &str = "bench/Receiver";

    /// `@interface Benchmark { int warnAtMillis() default <warn>; int failAtMillis(); }`
    fn annotation_interface(warn: Option<i32>) -> ClassNode {
        let mut annotation = ClassNode::new(
            Version::JAVA8,
            ClassAccessFlags::PUBLIC
                | ClassAccessFlags::INTERFACE
                | ClassAccessFlags::ABSTRACT
                | ClassAccessFlags::ANNOTATION,
            "bench/Benchmark",
            Some(OBJECT.to_owned()),
        );
        let abstract_flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::ABSTRACT;
        let mut warn_property = MethodNode::new(abstract_flags, WARN_AT_MILLIS, "()I");
        warn_property.annotation_default = warn.map(|warn| ElementValue::Int(b'I', warn));
        annotation.methods.push(warn_property);
        annotation
            .methods
            .push(MethodNode::new(abstract_flags, FAIL_AT_MILLIS, "()I"));
        annotation
    }

    fn thresholds(warn: i32, fail: i32) -> AnnotationNode {
        annotated(
            BENCHMARK,
            &[
                (WARN_AT_MILLIS, ElementValue::Int(b'I', warn)),
                (FAIL_AT_MILLIS, ElementValue::Int(b'I', fail)),
            ],
        )
    }

    fn sum(annotation: Option<AnnotationNode>) -> MethodNode {
        let mut sum = method(
            MethodAccessFlags::PUBLIC,
            "sum",
            "(JI)J",
            vec![
                Insn::Var(LLOAD, 1),
                Insn::Var(ILOAD, 3),
                Insn::Simple(I2L),
                Insn::Simple(LADD),
                Insn::Simple(LRETURN),
            ],
        );
        sum.visible_annotations.extend(annotation);
        sum
    }

    fn model_of(classes: &[&ClassNode]) -> Model {
        let mut model = Model::new();
        for class in classes {
            model.update(class);
        }
        model
    }

    fn injector() -> BenchmarkInjector {
        BenchmarkInjector::new(BENCHMARK, Some(RECEIVER.to_owned()))
    }

    fn forwarder_code(class: &ClassNode, index: usize) -> CodeNode {
        class.methods[index]
            .decode_code(&class.constants)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn forwarder_shape() {
        let mut timed = class("a/Timed", OBJECT);
        timed.methods.push(sum(Some(thresholds(10, 30))));
        let model = model_of(&[&annotation_interface(None), &timed]);
        injector().process(&mut timed, &model).unwrap();

        assert_eq!(timed.methods.len(), 2);
        let renamed = &timed.methods[0];
        assert_eq!(renamed.name, "__benchmark_sum");
        assert_eq!(renamed.access_flags, MethodAccessFlags::PRIVATE);
        assert!(renamed.visible_annotations.is_empty(), "annotation is stripped");

        let forwarder = &timed.methods[1];
        assert_eq!(forwarder.name, "sum");
        assert_eq!(forwarder.descriptor, "(JI)J");
        assert_eq!(forwarder.access_flags, MethodAccessFlags::PUBLIC);

        let code = forwarder_code(&timed, 1);
        let insns = &code.instructions;
        assert_eq!(insns[0], nano_time());
        assert_eq!(insns[1], Insn::Var(LSTORE, 4), "start time goes after the parameters");
        assert_eq!(
            &insns[3..7],
            &[
                Insn::aload(0),
                Insn::Var(LLOAD, 1),
                Insn::Var(ILOAD, 3),
                Insn::Method(INVOKESPECIAL, MemberRef::new("a/Timed", "__benchmark_sum", "(JI)J")),
            ]
        );
        assert_eq!(
            &insns[8..11],
            &[
                Insn::ldc_string("a.Timed"),
                Insn::ldc_string("sum"),
                Insn::ldc_string("(JI)J")
            ]
        );
        assert!(insns.contains(&Insn::push_long(30_000_000)));
        assert!(insns.contains(&Insn::push_long(10_000_000)));
        assert!(insns.contains(&Insn::invoke_static(RECEIVER, FAILED.0, FAILED.1)));
        assert!(insns.contains(&Insn::invoke_static(
            RECEIVER,
            EXECUTED_WITH_WARNING.0,
            EXECUTED_WITH_WARNING.1
        )));
        assert!(insns.contains(&Insn::Simple(LRETURN)));
        assert_eq!(
            &insns[insns.len() - 2..],
            &[
                Insn::invoke_static(RECEIVER, THROWN.0, THROWN.1),
                Insn::Simple(ATHROW)
            ]
        );

        assert_eq!(code.try_catch_blocks.len(), 1);
        let block = &code.try_catch_blocks[0];
        assert_eq!(code.label_position(block.start), Some(2));
        assert_eq!(code.label_position(block.end), Some(7));
        assert_eq!(block.catch_type.as_deref(), Some(THROWABLE));
    }

    #[test]
    fn fail_comparison_comes_first() {
        let mut timed = class("a/Timed", OBJECT);
        timed.methods.push(sum(Some(thresholds(10, 30))));
        let model = model_of(&[&annotation_interface(None), &timed]);
        injector().process(&mut timed, &model).unwrap();

        let code = forwarder_code(&timed, 1);
        let fail = code
            .instructions
            .iter()
            .position(|insn| *insn == Insn::push_long(30_000_000))
            .unwrap();
        let warn = code
            .instructions
            .iter()
            .position(|insn| *insn == Insn::push_long(10_000_000))
            .unwrap();
        assert!(fail < warn);
        assert_eq!(code.instructions[fail - 1], Insn::Simple(DUP2));
        assert_eq!(code.instructions[fail + 1], Insn::Simple(LCMP));
        assert!(matches!(code.instructions[fail + 2], Insn::Jump(IFGE, _)));
    }

    #[test]
    fn unset_thresholds() {
        let mut timed = class("a/Timed", OBJECT);
        timed.methods.push(sum(Some(annotated(
            BENCHMARK,
            &[(FAIL_AT_MILLIS, ElementValue::Int(b'I', 30))],
        ))));
        timed.methods.push(sum(Some(AnnotationNode::new(BENCHMARK))));
        timed.methods[1].name = String::from("other");
        let model = model_of(&[&annotation_interface(None), &timed]);
        injector().process(&mut timed, &model).unwrap();

        assert_eq!(
            timed.methods.len(),
            3,
            "a method with neither threshold set isn't benchmarked"
        );
        assert_eq!(timed.methods[1].name, "other");
        assert!(timed.methods[1].visible_annotations.is_empty());

        let code = forwarder_code(&timed, 2);
        assert!(code.instructions.contains(&Insn::push_long(30_000_000)));
        assert!(!code.instructions.contains(&Insn::invoke_static(
            RECEIVER,
            EXECUTED_WITH_WARNING.0,
            EXECUTED_WITH_WARNING.1
        )));
    }

    #[test]
    fn declared_defaults() {
        let mut timed = class("a/Timed", OBJECT);
        timed.methods.push(sum(Some(AnnotationNode::new(BENCHMARK))));
        let model = model_of(&[&annotation_interface(Some(5)), &timed]);
        injector().process(&mut timed, &model).unwrap();

        let code = forwarder_code(&timed, 1);
        assert!(code.instructions.contains(&Insn::push_long(5_000_000)));
    }

    #[test]
    fn inherited_thresholds() {
        let mut base = class("a/Base", OBJECT);
        base.methods.push(sum(Some(thresholds(10, 30))));
        let mut other = crate::model::test::interface("a/Other", &[]);
        other.methods.push(sum(Some(thresholds(20, 30))));
        let mut derived = class("a/Derived", "a/Base");
        derived.interfaces.push(String::from("a/Other"));
        derived.methods.push(sum(None));
        let annotation = annotation_interface(None);

        let model = model_of(&[&annotation, &base, &other, &derived]);
        let err = injector().process(&mut derived.clone(), &model).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Class a/Derived, method sum(JI)J (access 1) has multiple different inherited values for property warnAtMillis of annotation Lbench/Benchmark; from [a/Base=10,a/Other=20]"
        );

        let mut pinned = derived.clone();
        pinned.methods[0].visible_annotations.push(thresholds(15, 30));
        let model = model_of(&[&annotation, &base, &other, &pinned]);
        injector().process(&mut pinned, &model).unwrap();
        let code = forwarder_code(&pinned, 1);
        assert!(
            code.instructions.contains(&Insn::push_long(15_000_000)),
            "the class's own value settles the conflict"
        );
    }

    #[test]
    fn constructors_keep_their_delegating_call() {
        let mut constructed = class("a/Built", OBJECT);
        let mut constructor = method(
            MethodAccessFlags::PUBLIC,
            "<init>",
            "(I)V",
            vec![
                Insn::aload(0),
                Insn::Method(INVOKESPECIAL, MemberRef::new(OBJECT, "<init>", "()V")),
                Insn::Simple(RETURN),
            ],
        );
        constructor.visible_annotations.push(thresholds(10, -1));
        constructed.methods.push(constructor);
        let model = model_of(&[&annotation_interface(None), &constructed]);
        injector().process(&mut constructed, &model).unwrap();

        assert_eq!(constructed.methods[0].name, "__benchmark_$init$");
        assert_eq!(
            forwarder_code(&constructed, 0).instructions,
            vec![Insn::Simple(RETURN)]
        );

        let code = forwarder_code(&constructed, 1);
        assert_eq!(constructed.methods[1].name, "<init>");
        assert_eq!(
            &code.instructions[..3],
            &[
                Insn::aload(0),
                Insn::Method(INVOKESPECIAL, MemberRef::new(OBJECT, "<init>", "()V")),
                nano_time(),
            ]
        );
        assert_eq!(code.instructions[3], Insn::Var(LSTORE, 2));
    }

    #[test]
    fn unsupported_constructor() {
        let mut constructed = class("a/Built", OBJECT);
        let mut constructor = method(MethodAccessFlags::PUBLIC, "<init>", "()V", vec![Insn::Simple(RETURN)]);
        constructor.visible_annotations.push(thresholds(10, 30));
        constructed.methods.push(constructor);
        let model = model_of(&[&annotation_interface(None), &constructed]);
        assert_eq!(
            injector().process(&mut constructed, &model).unwrap_err().to_string(),
            "Don't know what to do to transform method <init>()V of class a/Built for benchmarking"
        );
    }

    #[test]
    fn stripping_only() {
        let mut timed = class("a/Timed", OBJECT);
        timed.methods.push(sum(Some(thresholds(10, 30))));
        let model = model_of(&[&timed]);
        BenchmarkInjector::new(BENCHMARK, None)
            .process(&mut timed, &model)
            .unwrap();
        assert_eq!(timed.methods.len(), 1);
        assert!(timed.methods[0].visible_annotations.is_empty());
    }

    #[test]
    fn unknown_annotation() {
        let mut timed = class("a/Timed", OBJECT);
        timed.methods.push(sum(Some(thresholds(10, 30))));
        let model = model_of(&[&timed]);
        assert_eq!(
            injector().process(&mut timed, &model).unwrap_err().to_string(),
            "Annotation not known: Lbench/Benchmark;"
        );
    }
}
