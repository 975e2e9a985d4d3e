//! Dataflow analysis computing the frame at every reachable instruction
//!
//! This is not a verifier: instructions are assumed to be well typed, and the analysis only
//! tracks what is needed to write stack map frames and compute `max_stack`/`max_locals`.

use super::{Frame, VerificationType};
use crate::jvm::code::opcodes::*;
use crate::jvm::code::{CodeNode, Insn, LdcConstant, SynLabel};
use crate::jvm::{
    is_constructor_name, Error, FieldType, MethodDescriptor, ParseDescriptor, RenderDescriptor,
    CLASS, OBJECT, STRING, THROWABLE,
};
use crate::util::Width;
use std::collections::{HashMap, VecDeque};

/// Type of a value during analysis: classes by class constant name, uninitialized objects by the
/// position of their `new` instruction
pub type AnalysisType = VerificationType<String, usize>;
pub type AnalysisFrame = Frame<String, usize>;

/// Answers the one hierarchy question frame computation has
pub trait ClassHierarchy {
    /// Nearest common superclass of two classes, both given by internal name
    fn common_super_class(&self, class1: &str, class2: &str) -> Result<String, Error>;
}

/// Method whose body is being analyzed
#[derive(Debug, Clone, Copy)]
pub struct MethodContext<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
    pub is_static: bool,
}

impl<'a> MethodContext<'a> {
    /// Frame on entry to the method
    pub fn initial_frame(&self) -> Result<AnalysisFrame, Error> {
        let descriptor = parse_method_descriptor(self.descriptor)?;
        let mut frame = AnalysisFrame::default();
        let mut slot = 0;
        if !self.is_static {
            let this = if is_constructor_name(self.name) && self.owner != OBJECT {
                AnalysisType::UninitializedThis
            } else {
                AnalysisType::object(self.owner)
            };
            frame.set_local(0, this);
            slot = 1;
        }
        for parameter in &descriptor.parameters {
            frame.set_local(slot, AnalysisType::from_field_type(parameter));
            slot += parameter.width();
        }
        Ok(frame)
    }
}

/// Result of analyzing a method body
#[derive(Debug)]
pub struct Analysis {
    /// Frame before each instruction, `None` when the instruction is unreachable
    pub frames: Vec<Option<AnalysisFrame>>,
    pub max_stack: usize,
    pub max_locals: usize,
}

impl Analysis {
    /// Positions of the real instructions that are never reached
    pub fn unreachable(&self, code: &CodeNode) -> Vec<usize> {
        code.real_instructions()
            .filter(|(idx, _)| self.frames[*idx].is_none())
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Run the analysis
///
/// Besides the method entry, `extra_roots` are positions known to be entered with the given
/// frame (used for code that is replaced by a bare `athrow`).
pub fn analyze(
    code: &CodeNode,
    context: MethodContext,
    hierarchy: &dyn ClassHierarchy,
    extra_roots: &[(usize, AnalysisFrame)],
) -> Result<Analysis, Error> {
    let insns = &code.instructions;
    let initial = context.initial_frame()?;
    let mut analyzer = Analyzer {
        code,
        context,
        hierarchy,
        frames: vec![None; insns.len()],
        queue: VecDeque::new(),
        queued: vec![false; insns.len()],
        max_stack: 0,
        max_locals: initial.locals.len(),
    };

    let labels: HashMap<SynLabel, usize> = insns
        .iter()
        .enumerate()
        .filter_map(|(idx, insn)| match insn {
            Insn::Label(label) => Some((*label, idx)),
            _ => None,
        })
        .collect();
    let position = |label: &SynLabel| labels.get(label).copied().ok_or(Error::UnknownLabel(*label));

    // Handlers covering each instruction
    let mut handlers: Vec<Vec<(usize, String)>> = vec![vec![]; insns.len()];
    for block in &code.try_catch_blocks {
        let start = position(&block.start)?;
        let end = position(&block.end)?;
        let handler = position(&block.handler)?;
        let catch_type = block.catch_type.as_deref().unwrap_or(THROWABLE);
        for covered in handlers.iter_mut().take(end).skip(start) {
            covered.push((handler, catch_type.to_owned()));
        }
    }

    if insns.is_empty() {
        return Err(Error::invalid_frame(0, "method body is empty"));
    }
    analyzer.merge_into(0, &initial)?;
    for (idx, frame) in extra_roots {
        analyzer.merge_into(*idx, frame)?;
    }

    while let Some(idx) = analyzer.queue.pop_front() {
        analyzer.queued[idx] = false;
        let before = match &analyzer.frames[idx] {
            Some(frame) => frame.clone(),
            None => continue,
        };
        let insn = &insns[idx];

        if !insn.is_real() {
            if idx + 1 < insns.len() {
                analyzer.merge_into(idx + 1, &before)?;
            }
            continue;
        }

        let after = analyzer.execute(idx, insn, &before)?;
        analyzer.max_stack = analyzer
            .max_stack
            .max(before.stack.offset_len().0)
            .max(after.stack.offset_len().0);
        analyzer.max_locals = analyzer.max_locals.max(after.locals.len());

        for (handler, catch_type) in &handlers[idx] {
            for locals in [&before.locals, &after.locals] {
                let mut handler_frame = AnalysisFrame {
                    locals: locals.clone(),
                    ..AnalysisFrame::default()
                };
                handler_frame.stack.push(AnalysisType::object(catch_type.as_str()));
                analyzer.merge_into(*handler, &handler_frame)?;
            }
        }

        for target in insn.jump_targets() {
            analyzer.merge_into(position(&target)?, &after)?;
        }
        if insn.falls_through() {
            if idx + 1 >= insns.len() {
                return Err(Error::invalid_frame(idx, "execution falls off the end of the code"));
            }
            analyzer.merge_into(idx + 1, &after)?;
        }
    }

    Ok(Analysis {
        frames: analyzer.frames,
        max_stack: analyzer.max_stack,
        max_locals: analyzer.max_locals,
    })
}

struct Analyzer<'a> {
    code: &'a CodeNode,
    context: MethodContext<'a>,
    hierarchy: &'a dyn ClassHierarchy,
    frames: Vec<Option<AnalysisFrame>>,
    queue: VecDeque<usize>,
    queued: Vec<bool>,
    max_stack: usize,
    max_locals: usize,
}

impl<'a> Analyzer<'a> {
    fn merge_into(&mut self, idx: usize, incoming: &AnalysisFrame) -> Result<(), Error> {
        let updated = match &self.frames[idx] {
            None => Some(incoming.clone()),
            Some(existing) => merge_frames(existing, incoming, self.hierarchy, idx)?,
        };
        if let Some(frame) = updated {
            self.frames[idx] = Some(frame);
            if !self.queued[idx] {
                self.queued[idx] = true;
                self.queue.push_back(idx);
            }
        }
        Ok(())
    }

    /// Frame after executing an instruction
    fn execute(
        &self,
        idx: usize,
        insn: &Insn,
        before: &AnalysisFrame,
    ) -> Result<AnalysisFrame, Error> {
        use VerificationType::*;

        let mut frame = before.clone();
        let mut state = State {
            frame: &mut frame,
            idx,
        };

        match insn {
            Insn::Label(_) | Insn::LineNumber(_) => (),
            Insn::Simple(opcode) => state.simple(*opcode)?,
            Insn::Int(NEWARRAY, element) => {
                state.pop()?;
                let descriptor = match element {
                    4 => "[Z",
                    5 => "[C",
                    6 => "[F",
                    7 => "[D",
                    8 => "[B",
                    9 => "[S",
                    10 => "[I",
                    11 => "[J",
                    _ => return Err(Error::invalid_frame(idx, "bad newarray type")),
                };
                state.push(AnalysisType::object(descriptor));
            }
            Insn::Int(_, _) => state.push(Integer),
            Insn::Var(opcode, index) => {
                let index = *index as usize;
                match *opcode {
                    ILOAD => state.push(Integer),
                    LLOAD => state.push(Long),
                    FLOAD => state.push(Float),
                    DLOAD => state.push(Double),
                    ALOAD => {
                        let typ = state
                            .frame
                            .locals
                            .get(index)
                            .cloned()
                            .filter(VerificationType::is_reference)
                            .ok_or_else(|| {
                                Error::invalid_frame(idx, format!("local {} is not a reference", index))
                            })?;
                        state.push(typ);
                    }
                    ISTORE..=ASTORE => {
                        let typ = state.pop()?;
                        state.frame.set_local(index, typ);
                    }
                    _ => return Err(Error::UnsupportedInstruction("ret")),
                }
            }
            Insn::IInc(_, _) => (),
            Insn::Type(opcode, class_name) => match *opcode {
                NEW => state.push(Uninitialized(idx)),
                ANEWARRAY => {
                    state.pop()?;
                    let element = FieldType::from_class_constant_name(class_name)
                        .map_err(|_| Error::BadDescriptor(class_name.clone()))?;
                    state.push(AnalysisType::object(FieldType::array(element).render()));
                }
                CHECKCAST => {
                    state.pop()?;
                    state.push(AnalysisType::object(class_name.as_str()));
                }
                _ => {
                    state.pop()?;
                    state.push(Integer);
                }
            },
            Insn::Field(opcode, field) => {
                let field_type = FieldType::parse(&field.descriptor)
                    .map_err(|_| Error::BadDescriptor(field.descriptor.clone()))?;
                match *opcode {
                    GETSTATIC => state.push(AnalysisType::from_field_type(&field_type)),
                    PUTSTATIC => {
                        state.pop()?;
                    }
                    GETFIELD => {
                        state.pop()?;
                        state.push(AnalysisType::from_field_type(&field_type));
                    }
                    _ => {
                        state.pop()?;
                        state.pop()?;
                    }
                }
            }
            Insn::Method(opcode, method) => {
                let descriptor = parse_method_descriptor(&method.descriptor)?;
                for _ in &descriptor.parameters {
                    state.pop()?;
                }
                if *opcode != INVOKESTATIC {
                    let receiver = state.pop()?;
                    if *opcode == INVOKESPECIAL && is_constructor_name(&method.name) {
                        let initialized = match &receiver {
                            UninitializedThis => AnalysisType::object(self.context.owner),
                            Uninitialized(new_idx) => match self.code.instructions.get(*new_idx) {
                                Some(Insn::Type(NEW, class_name)) => {
                                    AnalysisType::object(class_name.as_str())
                                }
                                _ => {
                                    return Err(Error::invalid_frame(
                                        idx,
                                        "uninitialized value without a matching 'new'",
                                    ))
                                }
                            },
                            _ => {
                                return Err(Error::invalid_frame(
                                    idx,
                                    "constructor called on an initialized value",
                                ))
                            }
                        };
                        state.frame.replace_all(&receiver, initialized);
                    }
                }
                if let Some(return_type) = &descriptor.return_type {
                    state.push(AnalysisType::from_field_type(return_type));
                }
            }
            Insn::InvokeDynamic { descriptor, .. } => {
                let descriptor = parse_method_descriptor(descriptor)?;
                for _ in &descriptor.parameters {
                    state.pop()?;
                }
                if let Some(return_type) = &descriptor.return_type {
                    state.push(AnalysisType::from_field_type(return_type));
                }
            }
            Insn::Jump(opcode, _) => match *opcode {
                IFEQ..=IFLE | IFNULL | IFNONNULL => {
                    state.pop()?;
                }
                IF_ICMPEQ..=IF_ACMPNE => {
                    state.pop()?;
                    state.pop()?;
                }
                GOTO | GOTO_W => (),
                _ => return Err(Error::UnsupportedInstruction("jsr")),
            },
            Insn::Ldc(constant) => {
                let typ = match constant {
                    LdcConstant::Integer(_) => Integer,
                    LdcConstant::Float(_) => Float,
                    LdcConstant::Long(_) => Long,
                    LdcConstant::Double(_) => Double,
                    LdcConstant::String(_) => AnalysisType::object(STRING),
                    LdcConstant::Class(_) => AnalysisType::object(CLASS),
                    LdcConstant::MethodType(_) => {
                        AnalysisType::object("java/lang/invoke/MethodType")
                    }
                    LdcConstant::Pooled { descriptor, .. } => {
                        let field_type = FieldType::parse(descriptor)
                            .map_err(|_| Error::BadDescriptor(descriptor.clone()))?;
                        AnalysisType::from_field_type(&field_type)
                    }
                };
                state.push(typ);
            }
            Insn::TableSwitch { .. } | Insn::LookupSwitch { .. } => {
                state.pop()?;
            }
            Insn::MultiANewArray(class_name, dimensions) => {
                for _ in 0..*dimensions {
                    state.pop()?;
                }
                state.push(AnalysisType::object(class_name.as_str()));
            }
        }

        Ok(frame)
    }
}

/// Frame being updated by one instruction
struct State<'f> {
    frame: &'f mut AnalysisFrame,
    idx: usize,
}

impl<'f> State<'f> {
    fn push(&mut self, typ: AnalysisType) {
        self.frame.stack.push(typ);
    }

    fn pop(&mut self) -> Result<AnalysisType, Error> {
        self.frame
            .stack
            .pop()
            .map(|(_, _, typ)| typ)
            .ok_or_else(|| Error::invalid_frame(self.idx, "pop from an empty stack"))
    }

    /// Is the value on top of the stack a `long` or `double`?
    fn top_is_wide(&self) -> Result<bool, Error> {
        self.frame
            .stack
            .last()
            .map(|typ| typ.width() == 2)
            .ok_or_else(|| Error::invalid_frame(self.idx, "empty stack"))
    }

    fn push_all(&mut self, types: Vec<AnalysisType>) {
        for typ in types {
            self.push(typ);
        }
    }

    /// Instructions without operands
    fn simple(&mut self, opcode: u8) -> Result<(), Error> {
        use VerificationType::*;

        /// Result type of typed arithmetic, which cycles through `int`, `long`, `float`, `double`
        fn numeric(offset: u8) -> AnalysisType {
            match offset % 4 {
                0 => Integer,
                1 => Long,
                2 => Float,
                _ => Double,
            }
        }

        match opcode {
            NOP => (),
            ACONST_NULL => self.push(Null),
            ICONST_M1..=ICONST_5 => self.push(Integer),
            LCONST_0 | LCONST_1 => self.push(Long),
            FCONST_0..=FCONST_2 => self.push(Float),
            DCONST_0 | DCONST_1 => self.push(Double),

            IALOAD | BALOAD | CALOAD | SALOAD => self.pop_push(2, Integer)?,
            LALOAD => self.pop_push(2, Long)?,
            FALOAD => self.pop_push(2, Float)?,
            DALOAD => self.pop_push(2, Double)?,
            AALOAD => {
                self.pop()?;
                let element = match self.pop()? {
                    Object(array) => match FieldType::from_class_constant_name(&array) {
                        Ok(FieldType::Array(element)) => AnalysisType::from_field_type(&element),
                        _ => AnalysisType::object(OBJECT),
                    },
                    _ => Null,
                };
                self.push(element);
            }
            IASTORE..=SASTORE => {
                self.pop()?;
                self.pop()?;
                self.pop()?;
            }

            POP => {
                self.pop()?;
            }
            POP2 => {
                if !self.top_is_wide()? {
                    self.pop()?;
                }
                self.pop()?;
            }
            DUP => {
                let v1 = self.pop()?;
                self.push_all(vec![v1.clone(), v1]);
            }
            DUP_X1 => {
                let v1 = self.pop()?;
                let v2 = self.pop()?;
                self.push_all(vec![v1.clone(), v2, v1]);
            }
            DUP_X2 => {
                let v1 = self.pop()?;
                if self.top_is_wide()? {
                    let v2 = self.pop()?;
                    self.push_all(vec![v1.clone(), v2, v1]);
                } else {
                    let v2 = self.pop()?;
                    let v3 = self.pop()?;
                    self.push_all(vec![v1.clone(), v3, v2, v1]);
                }
            }
            DUP2 => {
                if self.top_is_wide()? {
                    let v1 = self.pop()?;
                    self.push_all(vec![v1.clone(), v1]);
                } else {
                    let v1 = self.pop()?;
                    let v2 = self.pop()?;
                    self.push_all(vec![v2.clone(), v1.clone(), v2, v1]);
                }
            }
            DUP2_X1 => {
                if self.top_is_wide()? {
                    let v1 = self.pop()?;
                    let v2 = self.pop()?;
                    self.push_all(vec![v1.clone(), v2, v1]);
                } else {
                    let v1 = self.pop()?;
                    let v2 = self.pop()?;
                    let v3 = self.pop()?;
                    self.push_all(vec![v2.clone(), v1.clone(), v3, v2, v1]);
                }
            }
            DUP2_X2 => {
                if self.top_is_wide()? {
                    let v1 = self.pop()?;
                    if self.top_is_wide()? {
                        let v2 = self.pop()?;
                        self.push_all(vec![v1.clone(), v2, v1]);
                    } else {
                        let v2 = self.pop()?;
                        let v3 = self.pop()?;
                        self.push_all(vec![v1.clone(), v3, v2, v1]);
                    }
                } else {
                    let v1 = self.pop()?;
                    let v2 = self.pop()?;
                    if self.top_is_wide()? {
                        let v3 = self.pop()?;
                        self.push_all(vec![v2.clone(), v1.clone(), v3, v2, v1]);
                    } else {
                        let v3 = self.pop()?;
                        let v4 = self.pop()?;
                        self.push_all(vec![v2.clone(), v1.clone(), v4, v3, v2, v1]);
                    }
                }
            }
            SWAP => {
                let v1 = self.pop()?;
                let v2 = self.pop()?;
                self.push_all(vec![v1, v2]);
            }

            IADD..=DREM => self.pop_push(2, numeric(opcode - IADD))?,
            INEG..=DNEG => self.pop_push(1, numeric(opcode - INEG))?,
            ISHL | ISHR | IUSHR | IAND | IOR | IXOR => self.pop_push(2, Integer)?,
            LSHL | LSHR | LUSHR | LAND | LOR | LXOR => self.pop_push(2, Long)?,

            I2L | F2L | D2L => self.pop_push(1, Long)?,
            I2F | L2F | D2F => self.pop_push(1, Float)?,
            I2D | L2D | F2D => self.pop_push(1, Double)?,
            L2I | F2I | D2I | I2B | I2C | I2S => self.pop_push(1, Integer)?,
            LCMP..=DCMPG => self.pop_push(2, Integer)?,

            IRETURN..=ARETURN | ATHROW | MONITORENTER | MONITOREXIT => {
                self.pop()?;
            }
            RETURN => (),
            ARRAYLENGTH => self.pop_push(1, Integer)?,

            _ => {
                let reason = format!("opcode {} takes operands", opcode);
                return Err(Error::invalid_frame(self.idx, reason));
            }
        }
        Ok(())
    }

    fn pop_push(&mut self, pops: usize, push: AnalysisType) -> Result<(), Error> {
        for _ in 0..pops {
            self.pop()?;
        }
        self.push(push);
        Ok(())
    }
}

fn parse_method_descriptor(descriptor: &str) -> Result<MethodDescriptor, Error> {
    MethodDescriptor::parse(descriptor).map_err(|_| Error::BadDescriptor(descriptor.to_owned()))
}

/// Merge an incoming frame into an existing one
///
/// Returns `None` if the existing frame already covers the incoming one.
fn merge_frames(
    existing: &AnalysisFrame,
    incoming: &AnalysisFrame,
    hierarchy: &dyn ClassHierarchy,
    idx: usize,
) -> Result<Option<AnalysisFrame>, Error> {
    if existing.stack.len() != incoming.stack.len() {
        let reason = format!(
            "stack heights differ ({} and {})",
            existing.stack.len(),
            incoming.stack.len()
        );
        return Err(Error::invalid_frame(idx, reason));
    }

    let mut merged = AnalysisFrame::default();
    for ((_, _, t1), (_, _, t2)) in existing.stack.iter().zip(incoming.stack.iter()) {
        match merge_types(t1, t2, hierarchy)? {
            Some(typ) => {
                merged.stack.push(typ);
            }
            None => {
                let reason = format!("incompatible stack values {:?} and {:?}", t1, t2);
                return Err(Error::invalid_frame(idx, reason));
            }
        }
    }

    // Locals missing from either side are unusable
    let locals_len = existing.locals.len().min(incoming.locals.len());
    for slot in 0..locals_len {
        let t1 = &existing.locals[slot];
        let t2 = &incoming.locals[slot];
        let typ = merge_types(t1, t2, hierarchy)?.unwrap_or(VerificationType::Top);
        merged.locals.push(typ);
    }
    // A wide local whose second half did not survive is gone too
    if let Some(last) = merged.locals.last_mut() {
        if last.width() == 2 {
            *last = VerificationType::Top;
        }
    }

    if merged == *existing {
        Ok(None)
    } else {
        Ok(Some(merged))
    }
}

/// Merge two types, or `None` if they have no common type
fn merge_types(
    t1: &AnalysisType,
    t2: &AnalysisType,
    hierarchy: &dyn ClassHierarchy,
) -> Result<Option<AnalysisType>, Error> {
    use VerificationType::*;

    let merged = match (t1, t2) {
        _ if t1 == t2 => t1.clone(),
        (Null, Object(cls)) | (Object(cls), Null) => Object(cls.clone()),
        (Object(cls1), Object(cls2)) => Object(merge_class_names(cls1, cls2, hierarchy)?),
        _ => return Ok(None),
    };
    Ok(Some(merged))
}

/// Merge two class constant names (internal names or array descriptors)
fn merge_class_names(
    cls1: &str,
    cls2: &str,
    hierarchy: &dyn ClassHierarchy,
) -> Result<String, Error> {
    let parse = |name: &str| {
        FieldType::from_class_constant_name(name).map_err(|_| Error::BadDescriptor(name.to_owned()))
    };
    let merged = merge_reference_types(&parse(cls1)?, &parse(cls2)?, hierarchy)?;
    Ok(merged
        .class_constant_name()
        .unwrap_or_else(|| String::from(OBJECT)))
}

fn merge_reference_types(
    t1: &FieldType,
    t2: &FieldType,
    hierarchy: &dyn ClassHierarchy,
) -> Result<FieldType, Error> {
    let merged = match (t1, t2) {
        _ if t1 == t2 => t1.clone(),
        (FieldType::Object(cls1), FieldType::Object(cls2)) => {
            FieldType::Object(hierarchy.common_super_class(cls1, cls2)?)
        }
        (FieldType::Array(elem1), FieldType::Array(elem2))
            if elem1.is_reference() && elem2.is_reference() =>
        {
            FieldType::array(merge_reference_types(elem1, elem2, hierarchy)?)
        }
        _ => FieldType::object(OBJECT),
    };
    Ok(merged)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::MemberRef;
    use crate::jvm::code::TryCatchBlock;

    /// Hierarchy where every pair of distinct classes only shares `Object`, except for two known
    /// exception types
    struct FlatHierarchy;

    impl ClassHierarchy for FlatHierarchy {
        fn common_super_class(&self, class1: &str, class2: &str) -> Result<String, Error> {
            match (class1, class2) {
                ("java/lang/IllegalStateException", "java/lang/IllegalArgumentException")
                | ("java/lang/IllegalArgumentException", "java/lang/IllegalStateException") => {
                    Ok(String::from("java/lang/RuntimeException"))
                }
                ("a/Missing", _) | (_, "a/Missing") => Err(Error::TypeNotFound(String::from("a/Missing"))),
                _ => Ok(String::from(OBJECT)),
            }
        }
    }

    fn context<'a>(name: &'a str, descriptor: &'a str, is_static: bool) -> MethodContext<'a> {
        MethodContext {
            owner: "a/Foo",
            name,
            descriptor,
            is_static,
        }
    }

    #[test]
    fn initial_frames() {
        let frame = context("run", "(JLjava/lang/String;[I)V", false)
            .initial_frame()
            .unwrap();
        assert_eq!(
            frame.local_entries(),
            vec![
                AnalysisType::object("a/Foo"),
                AnalysisType::Long,
                AnalysisType::object("java/lang/String"),
                AnalysisType::object("[I"),
            ]
        );
        assert_eq!(frame.locals.len(), 5);

        let frame = context("<init>", "()V", false).initial_frame().unwrap();
        assert_eq!(frame.locals, vec![AnalysisType::UninitializedThis]);
    }

    #[test]
    fn straight_line_maximums() {
        let mut code = CodeNode::new();
        code.instructions = vec![
            Insn::Var(LLOAD, 0),
            Insn::Simple(LCONST_1),
            Insn::Simple(LADD),
            Insn::Var(LSTORE, 2),
            Insn::Simple(RETURN),
        ];
        let analysis = analyze(&code, context("f", "(J)V", true), &FlatHierarchy, &[]).unwrap();
        assert_eq!(analysis.max_stack, 4, "two longs on the stack");
        assert_eq!(analysis.max_locals, 4, "long parameter plus long local");
        assert!(analysis.unreachable(&code).is_empty());
    }

    #[test]
    fn joins_merge_references() {
        let mut code = CodeNode::new();
        let other = code.fresh_label();
        let join = code.fresh_label();
        code.instructions = vec![
            Insn::Var(ILOAD, 0),
            Insn::Jump(IFEQ, other),
            Insn::Type(NEW, String::from("java/lang/IllegalStateException")),
            Insn::Jump(GOTO, join),
            Insn::Label(other),
            Insn::Type(NEW, String::from("java/lang/IllegalArgumentException")),
            Insn::Label(join),
            Insn::Simple(POP),
            Insn::Simple(ACONST_NULL),
            Insn::Var(ASTORE, 1),
            Insn::Simple(RETURN),
        ];

        // Uninitialized values from different `new` instructions don't merge
        let result = analyze(&code, context("f", "(I)V", true), &FlatHierarchy, &[]);
        assert!(matches!(result, Err(Error::InvalidFrame { instruction: 6, .. })));

        code.instructions[2] = Insn::Type(CHECKCAST, String::from("java/lang/IllegalStateException"));
        code.instructions.insert(2, Insn::Simple(ACONST_NULL));
        code.instructions[6] =
            Insn::Type(CHECKCAST, String::from("java/lang/IllegalArgumentException"));
        code.instructions.insert(6, Insn::Simple(ACONST_NULL));
        let analysis = analyze(&code, context("f", "(I)V", true), &FlatHierarchy, &[]).unwrap();
        let join_frame = analysis.frames[8].as_ref().unwrap();
        assert_eq!(
            join_frame.stack.last(),
            Some(&AnalysisType::object("java/lang/RuntimeException"))
        );
    }

    #[test]
    fn array_merges() {
        let merge = |a: &str, b: &str| merge_class_names(a, b, &FlatHierarchy).unwrap();
        assert_eq!(
            merge(
                "[Ljava/lang/IllegalStateException;",
                "[Ljava/lang/IllegalArgumentException;"
            ),
            "[Ljava/lang/RuntimeException;"
        );
        assert_eq!(merge("[I", "[J"), OBJECT, "primitive arrays only merge to Object");
        assert_eq!(merge("[[I", "[Ljava/lang/String;"), "[Ljava/lang/Object;");
        assert!(merge_class_names("a/Missing", "a/Foo", &FlatHierarchy).is_err());
    }

    #[test]
    fn handlers_and_constructors() {
        let mut code = CodeNode::new();
        let start = code.fresh_label();
        let end = code.fresh_label();
        let handler = code.fresh_label();
        code.instructions = vec![
            Insn::aload(0),
            Insn::Method(INVOKESPECIAL, MemberRef::new(OBJECT, "<init>", "()V")),
            Insn::Label(start),
            Insn::Simple(ICONST_1),
            Insn::Var(ISTORE, 1),
            Insn::Label(end),
            Insn::Simple(RETURN),
            Insn::Label(handler),
            Insn::Var(ASTORE, 2),
            Insn::Simple(RETURN),
        ];
        code.try_catch_blocks.push(TryCatchBlock {
            start,
            end,
            handler,
            catch_type: None,
        });

        let analysis = analyze(&code, context("<init>", "()V", false), &FlatHierarchy, &[]).unwrap();
        let after_init = analysis.frames[3].as_ref().unwrap();
        assert_eq!(
            after_init.locals,
            vec![AnalysisType::object("a/Foo")],
            "this is initialized after the super call"
        );
        let at_handler = analysis.frames[8].as_ref().unwrap();
        assert_eq!(
            at_handler.local_entries(),
            vec![AnalysisType::object("a/Foo")],
            "local 1 is only set inside the range, so it is unusable in the handler"
        );
        assert_eq!(at_handler.stack.last(), Some(&AnalysisType::object(THROWABLE)));
        assert_eq!(analysis.max_locals, 3);
    }

    #[test]
    fn unreachable_code() {
        let mut code = CodeNode::new();
        code.instructions = vec![
            Insn::Simple(RETURN),
            Insn::Simple(NOP),
            Insn::Simple(RETURN),
        ];
        let analysis = analyze(&code, context("f", "()V", true), &FlatHierarchy, &[]).unwrap();
        assert_eq!(analysis.unreachable(&code), vec![1, 2]);
    }
}
