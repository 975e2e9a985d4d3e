//! Editing primitives shared by the injectors

use crate::jvm::code::opcodes::*;
use crate::jvm::code::{CodeNode, Insn};
use crate::jvm::{
    is_constructor_name, AnnotationNode, BaseType, Error, FieldType, MethodDescriptor,
    ParseDescriptor,
};
use crate::util::Width;
use std::collections::HashMap;

/// Return descriptor of a method descriptor (`V` for `void`)
pub fn return_descriptor(descriptor: &str) -> &str {
    match descriptor.rsplit_once(')') {
        Some((_, ret)) => ret,
        None => descriptor,
    }
}

/// Return instruction matching the return type of a method
pub fn return_opcode(descriptor: &str) -> u8 {
    match return_descriptor(descriptor).as_bytes().first() {
        Some(b'V') => RETURN,
        Some(b'Z' | b'B' | b'C' | b'I' | b'S') => IRETURN,
        Some(b'J') => LRETURN,
        Some(b'F') => FRETURN,
        Some(b'D') => DRETURN,
        _ => ARETURN,
    }
}

/// Return the zero value of the return type (`false`, `0`, `null`, or nothing)
pub fn default_return(descriptor: &str) -> Vec<Insn> {
    let opcode = return_opcode(descriptor);
    let zero = match opcode {
        RETURN => return vec![Insn::Simple(RETURN)],
        IRETURN => ICONST_0,
        LRETURN => LCONST_0,
        FRETURN => FCONST_0,
        DRETURN => DCONST_0,
        _ => ACONST_NULL,
    };
    vec![Insn::Simple(zero), Insn::Simple(opcode)]
}

/// Push the object a method runs on: `this`, or the declaring class for static methods
pub fn load_receiver(class_name: &str, is_static: bool) -> Insn {
    if is_static {
        Insn::ldc_class(class_name)
    } else {
        Insn::aload(0)
    }
}

/// Load every parameter of a method, in order, onto the stack
pub fn load_parameters(descriptor: &str, is_static: bool) -> Result<Vec<Insn>, Error> {
    let parsed = parse_method_descriptor(descriptor)?;
    let mut slot: u16 = if is_static { 0 } else { 1 };
    let mut loads = Vec::with_capacity(parsed.parameters.len());
    for parameter in &parsed.parameters {
        let opcode = match parameter {
            FieldType::Base(BaseType::Long) => LLOAD,
            FieldType::Base(BaseType::Float) => FLOAD,
            FieldType::Base(BaseType::Double) => DLOAD,
            FieldType::Base(_) => ILOAD,
            FieldType::Object(_) | FieldType::Array(_) => ALOAD,
        };
        loads.push(Insn::Var(opcode, slot));
        slot += parameter.width() as u16;
    }
    Ok(loads)
}

/// First local slot after `this` and the parameters
pub fn first_free_local(descriptor: &str, is_static: bool) -> Result<u16, Error> {
    Ok(parse_method_descriptor(descriptor)?.parameter_length(!is_static) as u16)
}

fn parse_method_descriptor(descriptor: &str) -> Result<MethodDescriptor, Error> {
    MethodDescriptor::parse(descriptor).map_err(|_| Error::BadDescriptor(descriptor.to_owned()))
}

/// Where a constructor calls the constructor it delegates to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegatingCall {
    Missing,

    /// Position of the `invokespecial`
    Unique(usize),

    /// More than one candidate call
    Ambiguous,
}

/// Find the `super(...)` or `this(...)` call of a constructor
///
/// Candidates are `invokespecial <init>` calls on the class itself or its superclass. Calls that
/// initialize an object created with `new` in the same body are not candidates.
pub fn find_delegating_constructor_call(
    code: &CodeNode,
    class_name: &str,
    super_name: Option<&str>,
) -> DelegatingCall {
    let mut created: HashMap<&str, usize> = HashMap::new();
    let mut found = None;

    for (index, insn) in code.instructions.iter().enumerate() {
        match insn {
            Insn::Type(NEW, created_class) => {
                *created.entry(created_class.as_str()).or_default() += 1
            }
            Insn::Method(INVOKESPECIAL, member) if is_constructor_name(&member.name) => {
                if let Some(pending) = created.get_mut(member.owner.as_str()) {
                    if *pending > 0 {
                        *pending -= 1;
                        continue;
                    }
                }
                if member.owner == class_name || Some(member.owner.as_str()) == super_name {
                    if found.is_some() {
                        return DelegatingCall::Ambiguous;
                    }
                    found = Some(index);
                }
            }
            _ => (),
        }
    }

    match found {
        Some(index) => DelegatingCall::Unique(index),
        None => DelegatingCall::Missing,
    }
}

/// Cut the delegating constructor call out of a constructor body
///
/// The cut starts at the first `aload 0` and ends with the `invokespecial`, so it carries the
/// argument evaluation (and anything else done to `this` before it is initialized). Labels and
/// line numbers in that range stay where they are. Returns `None`, leaving the body untouched, if
/// there is no unique delegating call or if the range contains jumps.
pub fn extract_delegating_constructor_call(
    code: &mut CodeNode,
    class_name: &str,
    super_name: Option<&str>,
) -> Option<Vec<Insn>> {
    let call = match find_delegating_constructor_call(code, class_name, super_name) {
        DelegatingCall::Unique(index) => index,
        _ => return None,
    };
    let load = code.instructions[..call]
        .iter()
        .position(|insn| *insn == Insn::aload(0))?;
    if code.instructions[load..=call]
        .iter()
        .any(|insn| !insn.jump_targets().is_empty())
    {
        return None;
    }

    let (extracted, kept): (Vec<Insn>, Vec<Insn>) = code
        .instructions
        .drain(load..=call)
        .partition(Insn::is_real);
    code.insert_all(load, kept);
    Some(extracted)
}

/// Remove every annotation with the descriptor from both lists, returning whether any was found
pub fn strip_annotations(
    visible: &mut Vec<AnnotationNode>,
    invisible: &mut Vec<AnnotationNode>,
    descriptor: &str,
) -> bool {
    let before = visible.len() + invisible.len();
    visible.retain(|annotation| annotation.descriptor != descriptor);
    invisible.retain(|annotation| annotation.descriptor != descriptor);
    visible.len() + invisible.len() != before
}

/// Remove the first annotation with the descriptor from each list, returning the first removed
pub fn strip_first_annotation(
    visible: &mut Vec<AnnotationNode>,
    invisible: &mut Vec<AnnotationNode>,
    descriptor: &str,
) -> Option<AnnotationNode> {
    let from_visible = crate::jvm::remove_annotation(visible, descriptor);
    let from_invisible = crate::jvm::remove_annotation(invisible, descriptor);
    from_visible.or(from_invisible)
}
