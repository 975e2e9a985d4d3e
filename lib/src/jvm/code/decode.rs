//! Turning a `Code` attribute back into an editable [`CodeNode`]

use super::opcodes::*;
use super::{CodeNode, Insn, LabelGenerator, LdcConstant, LocalVariableNode, SynLabel, TryCatchBlock};
use crate::jvm::class_file::{
    Code, Constant, ConstantIndex, ConstantsPool, LineNumberTable, LocalVariableTable,
};
use crate::jvm::{Deserialize, Error};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

/// Descriptor of the value loaded by `ldc` of a method handle
const METHOD_HANDLE_DESCRIPTOR: &str = "Ljava/lang/invoke/MethodHandle;";

/// Label bookkeeping while decoding: each referenced offset gets exactly one label
struct OffsetLabels<'a> {
    code: &'a mut CodeNode,
    labels: BTreeMap<usize, SynLabel>,
}

impl<'a> OffsetLabels<'a> {
    fn at(&mut self, offset: usize) -> SynLabel {
        let code = &mut self.code;
        *self
            .labels
            .entry(offset)
            .or_insert_with(|| code.labels.fresh_label())
    }

    fn relative(&mut self, base: usize, delta: i64) -> Result<SynLabel, Error> {
        let target = base as i64 + delta;
        if target < 0 {
            return Err(Error::malformed_code(base, "jump before the start of the method"));
        }
        Ok(self.at(target as usize))
    }
}

impl CodeNode {
    /// Decode a method body
    ///
    /// Only the attributes that refer to bytecode offsets and that can be carried through an
    /// edit are kept (line numbers and local variable tables). The stack map table is dropped,
    /// since it is recomputed on encoding.
    pub fn decode(code: &Code, constants: &ConstantsPool) -> Result<CodeNode, Error> {
        let mut node = CodeNode::new();
        let bytes = &code.code_array.0;
        let mut labels = OffsetLabels {
            code: &mut node,
            labels: BTreeMap::new(),
        };

        // Instructions, tagged with their offsets
        let mut decoded: Vec<(usize, Insn)> = vec![];
        let mut reader = Cursor::new(bytes.as_slice());
        while (reader.position() as usize) < bytes.len() {
            let offset = reader.position() as usize;
            let insn = decode_insn(&mut reader, offset, constants, &mut labels)?;
            decoded.push((offset, insn));
        }

        let mut try_catch_blocks = vec![];
        for handler in &code.exception_table {
            let catch_type = match handler.catch_type {
                None => None,
                Some(idx) => Some(constants.class_name(idx)?),
            };
            try_catch_blocks.push(TryCatchBlock {
                start: labels.at(handler.start_pc.0 as usize),
                end: labels.at(handler.end_pc.0 as usize),
                handler: labels.at(handler.handler_pc.0 as usize),
                catch_type,
            });
        }

        let mut line_numbers: BTreeMap<usize, Vec<u16>> = BTreeMap::new();
        let mut local_variables = vec![];
        let mut local_variable_types = vec![];
        for attribute in &code.attributes {
            match attribute.name(constants)?.as_str() {
                "LineNumberTable" => {
                    let table: LineNumberTable = attribute.decode()?;
                    for entry in table.0 {
                        line_numbers
                            .entry(entry.start_pc.0 as usize)
                            .or_default()
                            .push(entry.line_number);
                    }
                }
                name @ ("LocalVariableTable" | "LocalVariableTypeTable") => {
                    let table: LocalVariableTable = attribute.decode()?;
                    let nodes = table
                        .0
                        .iter()
                        .map(|var| LocalVariableNode {
                            start: labels.at(var.start_pc.0 as usize),
                            end: labels.at(var.start_pc.0 as usize + var.length as usize),
                            name_index: var.name_index,
                            descriptor_index: var.descriptor_index,
                            index: var.index,
                        })
                        .collect::<Vec<_>>();
                    if name == "LocalVariableTable" {
                        local_variables = nodes;
                    } else {
                        local_variable_types = nodes;
                    }
                }
                _ => (),
            }
        }

        let labels = labels.labels;
        let boundaries: BTreeSet<usize> = decoded
            .iter()
            .map(|(offset, _)| *offset)
            .chain(std::iter::once(bytes.len()))
            .collect();
        if let Some(bad_offset) = labels.keys().find(|offset| !boundaries.contains(offset)) {
            return Err(Error::malformed_code(
                *bad_offset,
                "reference to the middle of an instruction",
            ));
        }

        let mut instructions = Vec::with_capacity(decoded.len() + labels.len());
        for (offset, insn) in decoded {
            if let Some(label) = labels.get(&offset) {
                instructions.push(Insn::Label(*label));
            }
            if let Some(lines) = line_numbers.get(&offset) {
                instructions.extend(lines.iter().map(|line| Insn::LineNumber(*line)));
            }
            instructions.push(insn);
        }
        if let Some(label) = labels.get(&bytes.len()) {
            instructions.push(Insn::Label(*label));
        }

        node.instructions = instructions;
        node.try_catch_blocks = try_catch_blocks;
        node.local_variables = local_variables;
        node.local_variable_types = local_variable_types;
        Ok(node)
    }
}

fn decode_insn(
    reader: &mut Cursor<&[u8]>,
    offset: usize,
    constants: &ConstantsPool,
    labels: &mut OffsetLabels,
) -> Result<Insn, Error> {
    let truncated = |_| Error::malformed_code(offset, "truncated instruction");
    let opcode = u8::deserialize(reader).map_err(truncated)?;

    let insn = match opcode {
        NOP..=DCONST_1 => Insn::Simple(opcode),
        BIPUSH => Insn::Int(opcode, i8::deserialize(reader).map_err(truncated)? as i32),
        SIPUSH => Insn::Int(opcode, i16::deserialize(reader).map_err(truncated)? as i32),
        LDC => {
            let index = u8::deserialize(reader).map_err(truncated)?;
            Insn::Ldc(ldc_constant(ConstantIndex(index as u16), constants)?)
        }
        LDC_W | LDC2_W => {
            let index = u16::deserialize(reader).map_err(truncated)?;
            Insn::Ldc(ldc_constant(ConstantIndex(index), constants)?)
        }
        ILOAD..=ALOAD | ISTORE..=ASTORE | RET => {
            Insn::Var(opcode, u8::deserialize(reader).map_err(truncated)? as u16)
        }

        // `iload_0` through `aload_3` are grouped by type, four at a time
        ILOAD_0..=ALOAD_3 => {
            let k = opcode - ILOAD_0;
            Insn::Var(ILOAD + k / 4, (k % 4) as u16)
        }
        ISTORE_0..=ASTORE_3 => {
            let k = opcode - ISTORE_0;
            Insn::Var(ISTORE + k / 4, (k % 4) as u16)
        }

        IALOAD..=SALOAD | IASTORE..=LXOR | I2L..=DCMPG => Insn::Simple(opcode),
        IINC => {
            let index = u8::deserialize(reader).map_err(truncated)?;
            let delta = i8::deserialize(reader).map_err(truncated)?;
            Insn::IInc(index as u16, delta as i16)
        }
        IFEQ..=JSR | IFNULL | IFNONNULL => {
            let delta = i16::deserialize(reader).map_err(truncated)?;
            Insn::Jump(opcode, labels.relative(offset, delta as i64)?)
        }
        GOTO_W | JSR_W => {
            let delta = i32::deserialize(reader).map_err(truncated)?;
            Insn::Jump(opcode, labels.relative(offset, delta as i64)?)
        }
        TABLESWITCH => {
            skip_switch_padding(reader).map_err(truncated)?;
            let default = i32::deserialize(reader).map_err(truncated)?;
            let low = i32::deserialize(reader).map_err(truncated)?;
            let high = i32::deserialize(reader).map_err(truncated)?;
            if high < low {
                return Err(Error::malformed_code(offset, "tableswitch high is below low"));
            }
            let default = labels.relative(offset, default as i64)?;
            let mut targets = vec![];
            for _ in low..=high {
                let delta = i32::deserialize(reader).map_err(truncated)?;
                targets.push(labels.relative(offset, delta as i64)?);
            }
            Insn::TableSwitch {
                low,
                default,
                targets,
            }
        }
        LOOKUPSWITCH => {
            skip_switch_padding(reader).map_err(truncated)?;
            let default = i32::deserialize(reader).map_err(truncated)?;
            let default = labels.relative(offset, default as i64)?;
            let npairs = i32::deserialize(reader).map_err(truncated)?;
            let mut pairs = vec![];
            for _ in 0..npairs.max(0) {
                let key = i32::deserialize(reader).map_err(truncated)?;
                let delta = i32::deserialize(reader).map_err(truncated)?;
                pairs.push((key, labels.relative(offset, delta as i64)?));
            }
            Insn::LookupSwitch { default, pairs }
        }
        IRETURN..=RETURN | ARRAYLENGTH | ATHROW | MONITORENTER | MONITOREXIT => {
            Insn::Simple(opcode)
        }
        GETSTATIC..=PUTFIELD => {
            let index = ConstantIndex::deserialize(reader).map_err(truncated)?;
            Insn::Field(opcode, constants.member_ref(index)?)
        }
        INVOKEVIRTUAL..=INVOKESTATIC => {
            let index = ConstantIndex::deserialize(reader).map_err(truncated)?;
            Insn::Method(opcode, constants.member_ref(index)?)
        }
        INVOKEINTERFACE => {
            let index = ConstantIndex::deserialize(reader).map_err(truncated)?;
            let _count = u8::deserialize(reader).map_err(truncated)?;
            let _zero = u8::deserialize(reader).map_err(truncated)?;
            Insn::Method(opcode, constants.member_ref(index)?)
        }
        INVOKEDYNAMIC => {
            let constant = ConstantIndex::deserialize(reader).map_err(truncated)?;
            let _zero = u16::deserialize(reader).map_err(truncated)?;
            let descriptor = match constants.get(constant)? {
                Constant::InvokeDynamic { name_and_type, .. } => {
                    constants.name_and_type(*name_and_type)?.1
                }
                _ => return Err(Error::UnexpectedConstant(constant.0, "InvokeDynamic")),
            };
            Insn::InvokeDynamic {
                constant,
                descriptor,
            }
        }
        NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => {
            let index = ConstantIndex::deserialize(reader).map_err(truncated)?;
            Insn::Type(opcode, class_constant_name(index, constants)?)
        }
        NEWARRAY => Insn::Int(opcode, u8::deserialize(reader).map_err(truncated)? as i32),
        WIDE => {
            let widened = u8::deserialize(reader).map_err(truncated)?;
            let index = u16::deserialize(reader).map_err(truncated)?;
            match widened {
                IINC => Insn::IInc(index, i16::deserialize(reader).map_err(truncated)?),
                ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Insn::Var(widened, index),
                _ => {
                    let reason = format!("opcode {} cannot be widened", widened);
                    return Err(Error::malformed_code(offset, reason));
                }
            }
        }
        MULTIANEWARRAY => {
            let index = ConstantIndex::deserialize(reader).map_err(truncated)?;
            let dimensions = u8::deserialize(reader).map_err(truncated)?;
            Insn::MultiANewArray(class_constant_name(index, constants)?, dimensions)
        }
        _ => {
            let reason = format!("unknown opcode {}", opcode);
            return Err(Error::malformed_code(offset, reason));
        }
    };
    Ok(insn)
}

/// Switch operands start at the next multiple of 4
fn skip_switch_padding(reader: &mut Cursor<&[u8]>) -> std::io::Result<()> {
    while reader.position() % 4 != 0 {
        u8::deserialize(reader)?;
    }
    Ok(())
}

fn class_constant_name(index: ConstantIndex, constants: &ConstantsPool) -> Result<String, Error> {
    match constants.get(index)? {
        Constant::Class(name) => constants.utf8(*name),
        _ => Err(Error::UnexpectedConstant(index.0, "Class")),
    }
}

fn ldc_constant(index: ConstantIndex, constants: &ConstantsPool) -> Result<LdcConstant, Error> {
    let constant = match constants.get(index)? {
        Constant::Integer(value) => LdcConstant::Integer(*value),
        Constant::Float(bits) => LdcConstant::Float(*bits),
        Constant::Long(value) => LdcConstant::Long(*value),
        Constant::Double(bits) => LdcConstant::Double(*bits),
        Constant::String(utf8) => LdcConstant::String(constants.utf8(*utf8)?),
        Constant::Class(utf8) => LdcConstant::Class(constants.utf8(*utf8)?),
        Constant::MethodType { descriptor } => {
            LdcConstant::MethodType(constants.utf8(*descriptor)?)
        }
        Constant::MethodHandle { .. } => LdcConstant::Pooled {
            index,
            descriptor: String::from(METHOD_HANDLE_DESCRIPTOR),
        },
        Constant::Dynamic { name_and_type, .. } => LdcConstant::Pooled {
            index,
            descriptor: constants.name_and_type(*name_and_type)?.1,
        },
        _ => return Err(Error::UnexpectedConstant(index.0, "loadable constant")),
    };
    Ok(constant)
}
