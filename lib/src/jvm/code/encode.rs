//! Turning an edited [`CodeNode`] back into a `Code` attribute
//!
//! ### Unreachable code
//!
//! Stack map frames can't be computed for code that is never reached, so (like most bytecode
//! rewriters) each run of unreachable instructions is replaced by a lone `athrow` with a frame
//! holding just a `Throwable` on the stack. Exception ranges are trimmed so they don't cover the
//! replacement.
//!
//! ### Oversized jumps
//!
//! Jumps that don't fit a signed 16-bit offset are rewritten:
//!
//! ```text,ignore,no_run
//!     goto L2      =>       goto_w L2
//!
//!                           ifnot* L3
//!     if* L2       =>       goto_w L2
//!                       L3: ...
//! ```
//!
//! Rewrites make the code longer (and can shift `tableswitch`/`lookupswitch` padding), so the layout
//! is recomputed until no jump is oversized. This terminates since a jump is rewritten at most once
//! and the inserted short jumps have fixed tiny offsets.

use super::opcodes::*;
use super::{invert_jump, CodeNode, Insn, LdcConstant, SynLabel, TryCatchBlock};
use crate::jvm::class_file::{
    Attribute, BytecodeArray, BytecodeIndex, ClassConstantIndex, Code, ConstantIndex,
    ConstantsPool, ExceptionHandler, LineNumber, LineNumberTable, LocalVariable,
    LocalVariableTable, StackMapFrame, StackMapTable, Version,
};
use crate::jvm::frames::{
    analyze, Analysis, AnalysisFrame, AnalysisType, ClassHierarchy, Frame, MethodContext,
    VerificationType,
};
use crate::jvm::{Error, MethodDescriptor, ParseDescriptor, Serialize, THROWABLE};
use std::collections::{HashMap, HashSet};

/// Largest valid `code_length`
const MAX_CODE_LENGTH: usize = 65535;

type SerializableFrame = Frame<ClassConstantIndex, u16>;

impl CodeNode {
    /// Encode the body, recomputing frames, `max_stack` and `max_locals`
    ///
    /// New constants are appended to `constants`. A `StackMapTable` is only emitted for class
    /// versions that use one.
    pub fn assemble(
        mut self,
        method: MethodContext,
        constants: &mut ConstantsPool,
        version: Version,
        hierarchy: &dyn ClassHierarchy,
    ) -> Result<Code, Error> {
        let first_analysis = analyze(&self, method, hierarchy, &[])?;
        let dead_runs = self.replace_unreachable(&first_analysis)?;
        let widened = self.widen_jumps(constants)?;

        let analysis = if dead_runs.is_empty() && !widened {
            first_analysis
        } else {
            let mut roots = vec![];
            for start in &dead_runs {
                let position = self.position_of(*start)?;
                let mut frame = AnalysisFrame::default();
                frame.stack.push(AnalysisType::object(THROWABLE));
                roots.push((position + 1, frame));
            }
            analyze(&self, method, hierarchy, &roots)?
        };

        let offsets = self.offsets(constants)?;
        let code_length = offsets.last().copied().unwrap_or(0);
        if code_length > MAX_CODE_LENGTH {
            return Err(Error::MethodCodeOverflow(code_length));
        }
        let label_offsets = self.label_offsets(&offsets);
        let label_offset = |label: SynLabel| -> Result<usize, Error> {
            label_offsets
                .get(&label)
                .copied()
                .ok_or(Error::UnknownLabel(label))
        };

        let mut bytes = Vec::with_capacity(code_length);
        for (idx, insn) in self.instructions.iter().enumerate() {
            debug_assert_eq!(bytes.len(), offsets[idx], "instruction size mismatch");
            encode_insn(insn, offsets[idx], &mut bytes, constants, &label_offsets)?;
        }

        let mut exception_table = vec![];
        for block in &self.try_catch_blocks {
            let start_pc = label_offset(block.start)?;
            let end_pc = label_offset(block.end)?;
            if start_pc >= end_pc {
                continue;
            }
            let catch_type = match &block.catch_type {
                None => None,
                Some(name) => Some(constants.get_class(name)?),
            };
            exception_table.push(ExceptionHandler {
                start_pc: BytecodeIndex(start_pc as u16),
                end_pc: BytecodeIndex(end_pc as u16),
                handler_pc: BytecodeIndex(label_offset(block.handler)? as u16),
                catch_type,
            });
        }

        let mut attributes = vec![];
        if version.uses_stack_map_frames() {
            let frames = self.stack_map_frames(&analysis, method, &offsets, constants)?;
            if !frames.is_empty() {
                attributes.push(constants.get_attribute(&StackMapTable(frames))?);
            }
        }

        let line_numbers: Vec<LineNumber> = self
            .instructions
            .iter()
            .enumerate()
            .filter_map(|(idx, insn)| match insn {
                Insn::LineNumber(line) if offsets[idx] < code_length => Some(LineNumber {
                    start_pc: BytecodeIndex(offsets[idx] as u16),
                    line_number: *line,
                }),
                _ => None,
            })
            .collect();
        if !line_numbers.is_empty() {
            attributes.push(constants.get_attribute(&LineNumberTable(line_numbers))?);
        }

        for (name, variables) in [
            ("LocalVariableTable", &self.local_variables),
            ("LocalVariableTypeTable", &self.local_variable_types),
        ] {
            if variables.is_empty() {
                continue;
            }
            let mut entries = vec![];
            for variable in variables {
                let start = label_offset(variable.start)?;
                let end = label_offset(variable.end)?;
                entries.push(LocalVariable {
                    start_pc: BytecodeIndex(start as u16),
                    length: end.saturating_sub(start) as u16,
                    name_index: variable.name_index,
                    descriptor_index: variable.descriptor_index,
                    index: variable.index,
                });
            }
            let mut info = vec![];
            LocalVariableTable(entries).serialize(&mut info)?;
            attributes.push(Attribute {
                name_index: constants.get_utf8(name)?,
                info,
            });
        }

        let max_stack = u16::try_from(analysis.max_stack)
            .map_err(|_| Error::MethodCodeMaxStackOverflow(analysis.max_stack))?;
        let max_locals = u16::try_from(analysis.max_locals)
            .map_err(|_| Error::MethodCodeMaxLocalsOverflow(analysis.max_locals))?;

        Ok(Code {
            max_stack,
            max_locals,
            code_array: BytecodeArray(bytes),
            exception_table,
            attributes,
        })
    }

    fn position_of(&self, label: SynLabel) -> Result<usize, Error> {
        self.label_position(label).ok_or(Error::UnknownLabel(label))
    }

    /// Replace every run of unreachable instructions with `athrow`
    ///
    /// Returns the labels placed just before each inserted `athrow`.
    fn replace_unreachable(&mut self, analysis: &Analysis) -> Result<Vec<SynLabel>, Error> {
        if analysis.unreachable(self).is_empty() {
            return Ok(vec![]);
        }

        let old_instructions = std::mem::take(&mut self.instructions);
        let mut instructions = Vec::with_capacity(old_instructions.len());
        let mut runs: Vec<(SynLabel, SynLabel)> = vec![];
        let mut in_run = false;
        for (idx, insn) in old_instructions.into_iter().enumerate() {
            if !insn.is_real() {
                instructions.push(insn);
                continue;
            }
            let dead = analysis.frames[idx].is_none();
            if dead && !in_run {
                let start = self.fresh_label();
                let end = self.fresh_label();
                instructions.push(Insn::Label(start));
                instructions.push(Insn::Simple(ATHROW));
                instructions.push(Insn::Label(end));
                runs.push((start, end));
            } else if !dead {
                instructions.push(insn);
            }
            in_run = dead;
        }
        self.instructions = instructions;

        // Carve the replaced runs out of the exception ranges
        let old_blocks = std::mem::take(&mut self.try_catch_blocks);
        for block in old_blocks {
            let mut segments = vec![(block.start, block.end)];
            for (run_start, run_end) in &runs {
                let run_start_pos = self.position_of(*run_start)?;
                let run_end_pos = self.position_of(*run_end)?;
                let mut split = vec![];
                for (start, end) in segments {
                    let start_pos = self.position_of(start)?;
                    let end_pos = self.position_of(end)?;
                    if start_pos < run_end_pos && run_start_pos < end_pos {
                        if start_pos < run_start_pos {
                            split.push((start, *run_start));
                        }
                        if run_end_pos < end_pos {
                            split.push((*run_end, end));
                        }
                    } else {
                        split.push((start, end));
                    }
                }
                segments = split;
            }

            for (start, end) in segments {
                let start_pos = self.position_of(start)?;
                let end_pos = self.position_of(end)?;
                let covers_code = start_pos < end_pos
                    && self.instructions[start_pos..end_pos].iter().any(Insn::is_real);
                if covers_code {
                    self.try_catch_blocks.push(TryCatchBlock {
                        start,
                        end,
                        handler: block.handler,
                        catch_type: block.catch_type.clone(),
                    });
                }
            }
        }

        Ok(runs.into_iter().map(|(start, _)| start).collect())
    }

    /// Rewrite jumps whose offsets don't fit in 16 bits, returning whether anything changed
    fn widen_jumps(&mut self, constants: &mut ConstantsPool) -> Result<bool, Error> {
        let mut widened_any = false;
        loop {
            let offsets = self.offsets(constants)?;
            let label_offsets = self.label_offsets(&offsets);

            let old_instructions = std::mem::take(&mut self.instructions);
            let mut instructions = Vec::with_capacity(old_instructions.len());
            let mut widened = false;
            for (idx, insn) in old_instructions.into_iter().enumerate() {
                let (opcode, target) = match insn {
                    Insn::Jump(opcode, target) if opcode != GOTO_W && opcode != JSR_W => {
                        (opcode, target)
                    }
                    other => {
                        instructions.push(other);
                        continue;
                    }
                };
                let target_offset = *label_offsets
                    .get(&target)
                    .ok_or(Error::UnknownLabel(target))?;
                let delta = target_offset as i64 - offsets[idx] as i64;
                if i16::try_from(delta).is_ok() {
                    instructions.push(Insn::Jump(opcode, target));
                    continue;
                }

                widened = true;
                if opcode == GOTO {
                    instructions.push(Insn::Jump(GOTO_W, target));
                } else if let Some(inverted) = invert_jump(opcode) {
                    let skip = self.fresh_label();
                    instructions.push(Insn::Jump(inverted, skip));
                    instructions.push(Insn::Jump(GOTO_W, target));
                    instructions.push(Insn::Label(skip));
                } else {
                    return Err(Error::UnsupportedInstruction("jsr"));
                }
            }
            self.instructions = instructions;

            if !widened {
                return Ok(widened_any);
            }
            widened_any = true;
        }
    }

    /// Offset of every instruction, plus the total length as a last entry
    ///
    /// Pseudo-instructions get the offset of the next real instruction.
    fn offsets(&self, constants: &mut ConstantsPool) -> Result<Vec<usize>, Error> {
        let mut offsets = Vec::with_capacity(self.instructions.len() + 1);
        let mut offset = 0;
        for insn in &self.instructions {
            offsets.push(offset);
            offset += insn_size(insn, offset, constants)?;
        }
        offsets.push(offset);
        Ok(offsets)
    }

    fn label_offsets(&self, offsets: &[usize]) -> HashMap<SynLabel, usize> {
        self.instructions
            .iter()
            .enumerate()
            .filter_map(|(idx, insn)| match insn {
                Insn::Label(label) => Some((*label, offsets[idx])),
                _ => None,
            })
            .collect()
    }

    /// Frames for every instruction that starts a basic block
    fn stack_map_frames(
        &self,
        analysis: &Analysis,
        method: MethodContext,
        offsets: &[usize],
        constants: &mut ConstantsPool,
    ) -> Result<Vec<StackMapFrame>, Error> {
        let mut targets: HashSet<SynLabel> = self
            .instructions
            .iter()
            .flat_map(Insn::jump_targets)
            .collect();
        targets.extend(self.try_catch_blocks.iter().map(|block| block.handler));

        let mut previous = to_serializable(&method.initial_frame()?, offsets, constants)?;
        let mut previous_offset: Option<usize> = None;
        let mut stack_map_frames = vec![];

        let mut after_jump = false;
        let mut labelled = false;
        for (idx, insn) in self.instructions.iter().enumerate() {
            match insn {
                Insn::Label(label) => {
                    labelled |= targets.contains(label);
                    continue;
                }
                Insn::LineNumber(_) => continue,
                _ => (),
            }

            if labelled || after_jump {
                let frame = analysis.frames[idx].as_ref().ok_or_else(|| {
                    Error::invalid_frame(idx, "no frame for instruction starting a block")
                })?;
                let frame = to_serializable(frame, offsets, constants)?;
                let offset = offsets[idx];
                let offset_delta = match previous_offset {
                    None => offset,
                    Some(previous_offset) => offset - previous_offset - 1,
                };
                stack_map_frames.push(frame.stack_map_frame(offset_delta as u16, &previous));
                previous = frame;
                previous_offset = Some(offset);
            }

            labelled = false;
            after_jump = !insn.falls_through();
        }

        Ok(stack_map_frames)
    }
}

fn to_serializable(
    frame: &AnalysisFrame,
    offsets: &[usize],
    constants: &mut ConstantsPool,
) -> Result<SerializableFrame, Error> {
    let mut convert = |typ: &AnalysisType| -> Result<VerificationType<ClassConstantIndex, u16>, Error> {
        Ok(match typ {
            VerificationType::Top => VerificationType::Top,
            VerificationType::Integer => VerificationType::Integer,
            VerificationType::Float => VerificationType::Float,
            VerificationType::Double => VerificationType::Double,
            VerificationType::Long => VerificationType::Long,
            VerificationType::Null => VerificationType::Null,
            VerificationType::UninitializedThis => VerificationType::UninitializedThis,
            VerificationType::Object(name) => VerificationType::Object(constants.get_class(name)?),
            VerificationType::Uninitialized(idx) => {
                VerificationType::Uninitialized(offsets[*idx] as u16)
            }
        })
    };

    let mut serializable = SerializableFrame::default();
    for local in &frame.locals {
        serializable.locals.push(convert(local)?);
    }
    for (_, _, typ) in frame.stack.iter() {
        serializable.stack.push(convert(typ)?);
    }
    Ok(serializable)
}

/// Pool index loaded by an `ldc`
fn ldc_index(constant: &LdcConstant, constants: &mut ConstantsPool) -> Result<ConstantIndex, Error> {
    match constant {
        LdcConstant::Integer(value) => constants.get_integer(*value),
        LdcConstant::Float(bits) => constants.get_float(f32::from_bits(*bits)),
        LdcConstant::Long(value) => constants.get_long(*value),
        LdcConstant::Double(bits) => constants.get_double(f64::from_bits(*bits)),
        LdcConstant::String(string) => constants.get_string(string),
        LdcConstant::Class(name) => constants.get_class(name).map(|class| class.0),
        LdcConstant::MethodType(descriptor) => constants.get_method_type(descriptor),
        LdcConstant::Pooled { index, .. } => Ok(*index),
    }
}

/// Bytes of padding after a switch opcode at `offset`
fn switch_padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

fn fits_iinc(index: u16, delta: i16) -> bool {
    index <= u8::MAX as u16 && i8::try_from(delta).is_ok()
}

/// Encoded size of an instruction placed at `offset`
fn insn_size(insn: &Insn, offset: usize, constants: &mut ConstantsPool) -> Result<usize, Error> {
    let size = match insn {
        Insn::Label(_) | Insn::LineNumber(_) => 0,
        Insn::Simple(_) => 1,
        Insn::Int(SIPUSH, _) => 3,
        Insn::Int(_, _) => 2,
        Insn::Var(opcode, index) => match (*opcode, *index) {
            (ILOAD..=ALOAD | ISTORE..=ASTORE, 0..=3) => 1,
            (_, 0..=255) => 2,
            _ => 4,
        },
        Insn::IInc(index, delta) => {
            if fits_iinc(*index, *delta) {
                3
            } else {
                6
            }
        }
        Insn::Type(_, _) | Insn::Field(_, _) => 3,
        Insn::Method(INVOKEINTERFACE, _) => 5,
        Insn::Method(_, _) => 3,
        Insn::InvokeDynamic { .. } => 5,
        Insn::Jump(GOTO_W | JSR_W, _) => 5,
        Insn::Jump(_, _) => 3,
        Insn::Ldc(constant) => {
            if constant.is_wide() || ldc_index(constant, constants)?.0 > u8::MAX as u16 {
                3
            } else {
                2
            }
        }
        Insn::TableSwitch { targets, .. } => 1 + switch_padding(offset) + 12 + 4 * targets.len(),
        Insn::LookupSwitch { pairs, .. } => 1 + switch_padding(offset) + 8 + 8 * pairs.len(),
        Insn::MultiANewArray(_, _) => 4,
    };
    Ok(size)
}

fn encode_insn(
    insn: &Insn,
    offset: usize,
    bytes: &mut Vec<u8>,
    constants: &mut ConstantsPool,
    label_offsets: &HashMap<SynLabel, usize>,
) -> Result<(), Error> {
    let relative = |label: &SynLabel| -> Result<i64, Error> {
        let target = label_offsets
            .get(label)
            .copied()
            .ok_or(Error::UnknownLabel(*label))?;
        Ok(target as i64 - offset as i64)
    };
    let wide_relative = |label: &SynLabel| -> Result<i32, Error> {
        i32::try_from(relative(label)?)
            .map_err(|_| Error::malformed_code(offset, "jump out of range"))
    };

    match insn {
        Insn::Label(_) | Insn::LineNumber(_) => (),
        Insn::Simple(opcode) => opcode.serialize(bytes)?,
        Insn::Int(opcode, value) => {
            opcode.serialize(bytes)?;
            match *opcode {
                SIPUSH => (*value as i16).serialize(bytes)?,
                BIPUSH => (*value as i8).serialize(bytes)?,
                _ => (*value as u8).serialize(bytes)?,
            }
        }
        Insn::Var(opcode, index) => match (*opcode, *index) {
            (ILOAD..=ALOAD, 0..=3) => (ILOAD_0 + (opcode - ILOAD) * 4 + *index as u8).serialize(bytes)?,
            (ISTORE..=ASTORE, 0..=3) => {
                (ISTORE_0 + (opcode - ISTORE) * 4 + *index as u8).serialize(bytes)?
            }
            (_, 0..=255) => {
                opcode.serialize(bytes)?;
                (*index as u8).serialize(bytes)?;
            }
            _ => {
                WIDE.serialize(bytes)?;
                opcode.serialize(bytes)?;
                index.serialize(bytes)?;
            }
        },
        Insn::IInc(index, delta) => {
            if fits_iinc(*index, *delta) {
                IINC.serialize(bytes)?;
                (*index as u8).serialize(bytes)?;
                (*delta as i8).serialize(bytes)?;
            } else {
                WIDE.serialize(bytes)?;
                IINC.serialize(bytes)?;
                index.serialize(bytes)?;
                delta.serialize(bytes)?;
            }
        }
        Insn::Type(opcode, class_name) => {
            opcode.serialize(bytes)?;
            constants.get_class(class_name)?.serialize(bytes)?;
        }
        Insn::Field(opcode, field) => {
            opcode.serialize(bytes)?;
            constants.get_field_ref(field)?.serialize(bytes)?;
        }
        Insn::Method(opcode, method) => {
            opcode.serialize(bytes)?;
            constants.get_method_ref(method)?.serialize(bytes)?;
            if *opcode == INVOKEINTERFACE {
                let descriptor = MethodDescriptor::parse(&method.descriptor)
                    .map_err(|_| Error::BadDescriptor(method.descriptor.clone()))?;
                (descriptor.parameter_length(true) as u8).serialize(bytes)?;
                0u8.serialize(bytes)?;
            }
        }
        Insn::InvokeDynamic { constant, .. } => {
            INVOKEDYNAMIC.serialize(bytes)?;
            constant.serialize(bytes)?;
            0u16.serialize(bytes)?;
        }
        Insn::Jump(opcode, target) => {
            opcode.serialize(bytes)?;
            if matches!(*opcode, GOTO_W | JSR_W) {
                wide_relative(target)?.serialize(bytes)?;
            } else {
                i16::try_from(relative(target)?)
                    .map_err(|_| Error::malformed_code(offset, "jump out of range"))?
                    .serialize(bytes)?;
            }
        }
        Insn::Ldc(constant) => {
            let index = ldc_index(constant, constants)?;
            if constant.is_wide() {
                LDC2_W.serialize(bytes)?;
                index.serialize(bytes)?;
            } else if index.0 <= u8::MAX as u16 {
                LDC.serialize(bytes)?;
                (index.0 as u8).serialize(bytes)?;
            } else {
                LDC_W.serialize(bytes)?;
                index.serialize(bytes)?;
            }
        }
        Insn::TableSwitch {
            low,
            default,
            targets,
        } => {
            TABLESWITCH.serialize(bytes)?;
            bytes.extend(std::iter::repeat(0).take(switch_padding(offset)));
            wide_relative(default)?.serialize(bytes)?;
            low.serialize(bytes)?;
            (low + targets.len() as i32 - 1).serialize(bytes)?;
            for target in targets {
                wide_relative(target)?.serialize(bytes)?;
            }
        }
        Insn::LookupSwitch { default, pairs } => {
            LOOKUPSWITCH.serialize(bytes)?;
            bytes.extend(std::iter::repeat(0).take(switch_padding(offset)));
            wide_relative(default)?.serialize(bytes)?;
            (pairs.len() as i32).serialize(bytes)?;
            let mut sorted = pairs.clone();
            sorted.sort_by_key(|(key, _)| *key);
            for (key, target) in &sorted {
                key.serialize(bytes)?;
                wide_relative(target)?.serialize(bytes)?;
            }
        }
        Insn::MultiANewArray(class_name, dimensions) => {
            MULTIANEWARRAY.serialize(bytes)?;
            constants.get_class(class_name)?.serialize(bytes)?;
            dimensions.serialize(bytes)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::MemberRef;
    use crate::jvm::OBJECT;

    const ISTORE_1: u8 = ISTORE_0 + 1;

    struct ObjectOnly;

    impl ClassHierarchy for ObjectOnly {
        fn common_super_class(&self, _: &str, _: &str) -> Result<String, Error> {
            Ok(String::from(OBJECT))
        }
    }

    const STATIC_VOID: MethodContext = MethodContext {
        owner: "a/Foo",
        name: "run",
        descriptor: "(I)V",
        is_static: true,
    };

    #[test]
    fn short_forms_and_sizes() {
        let mut code = CodeNode::new();
        code.instructions = vec![
            Insn::Var(ILOAD, 0),
            Insn::Var(ISTORE, 300),
            Insn::IInc(1, 1000),
            Insn::Simple(RETURN),
        ];
        let mut constants = ConstantsPool::new();
        let encoded = code
            .assemble(STATIC_VOID, &mut constants, Version::JAVA8, &ObjectOnly)
            .unwrap();
        assert_eq!(
            encoded.code_array.0,
            vec![ILOAD_0, WIDE, ISTORE, 1, 44, WIDE, IINC, 0, 1, 3, 232, RETURN]
        );
        assert_eq!(encoded.max_locals, 301);
        assert_eq!(encoded.max_stack, 1);
        assert!(encoded.attributes.is_empty(), "straight-line code needs no frames");
    }

    #[test]
    fn branch_frames() {
        let mut code = CodeNode::new();
        let target = code.fresh_label();
        code.instructions = vec![
            Insn::Var(ILOAD, 0),
            Insn::Jump(IFEQ, target),
            Insn::Simple(ICONST_1),
            Insn::Var(ISTORE, 1),
            Insn::Label(target),
            Insn::Simple(RETURN),
        ];
        let mut constants = ConstantsPool::new();
        let encoded = code
            .assemble(STATIC_VOID, &mut constants, Version::JAVA8, &ObjectOnly)
            .unwrap();
        assert_eq!(
            encoded.code_array.0,
            vec![ILOAD_0, IFEQ, 0, 5, ICONST_1, ISTORE_1, RETURN]
        );
        let table = stack_map_table(&encoded.attributes[0], &constants);
        assert_eq!(
            table.0,
            vec![StackMapFrame::SameLocalsNoStack { offset_delta: 6 }],
            "local 1 is unusable at the join, so the frame matches the initial one"
        );

        // No table before Java 6
        let mut code = CodeNode::new();
        let target = code.fresh_label();
        code.instructions = vec![
            Insn::Var(ILOAD, 0),
            Insn::Jump(IFEQ, target),
            Insn::Label(target),
            Insn::Simple(RETURN),
        ];
        let encoded = code
            .assemble(STATIC_VOID, &mut ConstantsPool::new(), Version::JAVA5, &ObjectOnly)
            .unwrap();
        assert!(encoded.attributes.is_empty());
    }

    #[test]
    fn unreachable_code_becomes_athrow() {
        let mut code = CodeNode::new();
        let start = code.fresh_label();
        let end = code.fresh_label();
        let handler = code.fresh_label();
        code.instructions = vec![
            Insn::Label(start),
            Insn::Simple(RETURN),
            Insn::Simple(NOP),
            Insn::Simple(NOP),
            Insn::Simple(RETURN),
            Insn::Label(end),
            Insn::Label(handler),
            Insn::Simple(ATHROW),
        ];
        code.try_catch_blocks.push(TryCatchBlock {
            start,
            end,
            handler,
            catch_type: None,
        });
        let mut constants = ConstantsPool::new();
        let encoded = code
            .assemble(STATIC_VOID, &mut constants, Version::JAVA8, &ObjectOnly)
            .unwrap();
        assert_eq!(encoded.code_array.0, vec![RETURN, ATHROW, ATHROW]);
        assert_eq!(encoded.exception_table.len(), 1, "range trimmed to the return");
        assert_eq!(encoded.exception_table[0].end_pc, BytecodeIndex(1));
        assert_eq!(encoded.max_stack, 1);
    }

    #[test]
    fn oversized_jumps_are_widened() {
        let mut code = CodeNode::new();
        let far = code.fresh_label();
        code.instructions = vec![Insn::Var(ILOAD, 0), Insn::Jump(IFNE, far)];
        code.instructions
            .extend(std::iter::repeat(Insn::Simple(NOP)).take(40_000));
        code.instructions.push(Insn::Label(far));
        code.instructions.push(Insn::Simple(RETURN));

        let mut constants = ConstantsPool::new();
        let encoded = code
            .assemble(STATIC_VOID, &mut constants, Version::JAVA8, &ObjectOnly)
            .unwrap();
        let bytes = &encoded.code_array.0;
        assert_eq!(&bytes[..9], &[ILOAD_0, IFEQ, 0, 8, GOTO_W, 0, 0, 0x9c, 0x45]);
        assert_eq!(bytes.len(), 1 + 3 + 5 + 40_000 + 1);
    }

    #[test]
    fn constants_and_calls() {
        let mut code = CodeNode::new();
        code.instructions = vec![
            Insn::ldc_string("hello"),
            Insn::Method(
                INVOKEINTERFACE,
                MemberRef {
                    owner: String::from("a/Sink"),
                    name: String::from("take"),
                    descriptor: String::from("(Ljava/lang/String;J)V"),
                    is_interface: true,
                },
            ),
            Insn::Simple(RETURN),
        ];
        code.instructions.insert(1, Insn::push_long(7));
        code.instructions.insert(0, Insn::Simple(ACONST_NULL));
        let mut constants = ConstantsPool::new();
        let encoded = code
            .assemble(STATIC_VOID, &mut constants, Version::JAVA8, &ObjectOnly)
            .unwrap();
        let bytes = &encoded.code_array.0;
        assert_eq!(bytes[0], ACONST_NULL);
        assert_eq!(bytes[1], LDC);
        assert_eq!(bytes[3], LDC2_W);
        assert_eq!(bytes[6], INVOKEINTERFACE);
        assert_eq!(bytes[9], 4, "receiver, string and long take four slots");
        assert_eq!(encoded.max_stack, 4);
    }

    #[test]
    fn unknown_labels_are_reported() {
        let mut code = CodeNode::new();
        let nowhere = code.fresh_label();
        code.instructions = vec![Insn::Jump(GOTO, nowhere)];
        let result = code.assemble(STATIC_VOID, &mut ConstantsPool::new(), Version::JAVA8, &ObjectOnly);
        assert!(matches!(result, Err(Error::UnknownLabel(label)) if label == nowhere));
    }

    /// Read back a `StackMapTable`, handling just the frame kinds the tests produce
    fn stack_map_table(attribute: &Attribute, constants: &ConstantsPool) -> StackMapTable {
        assert_eq!(attribute.name(constants).unwrap(), "StackMapTable");
        let info = &attribute.info;
        let count = u16::from_be_bytes([info[0], info[1]]);
        let mut frames = vec![];
        let mut pos = 2;
        for _ in 0..count {
            let tag = info[pos];
            pos += 1;
            match tag {
                0..=63 => frames.push(StackMapFrame::SameLocalsNoStack { offset_delta: tag as u16 }),
                _ => panic!("unexpected frame tag {}", tag),
            }
        }
        StackMapTable(frames)
    }
}
