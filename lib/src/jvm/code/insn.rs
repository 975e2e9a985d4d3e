use super::opcodes::*;
use super::{LabelGenerator, SynLabel, SynLabelGenerator};
use crate::jvm::class_file::{ConstantIndex, MemberRef, Utf8ConstantIndex};

/// Instruction of an editable method body
///
/// Instructions are grouped by the shape of their operands, with the opcode kept as a plain byte.
/// Some of the usual encoding details disappear at this level:
///
///   - the `wide` prefix and the short `xload_<n>`/`xstore_<n>` forms are merged into [`Insn::Var`]
///     and [`Insn::IInc`]
///   - `ldc`, `ldc_w` and `ldc2_w` are all [`Insn::Ldc`]
///   - branch targets are labels placed with [`Insn::Label`], not offsets
///
#[derive(Clone, Debug, PartialEq)]
pub enum Insn {
    /// Pseudo-instruction marking a position in the body
    Label(SynLabel),

    /// Pseudo-instruction: the following instructions come from this source line
    LineNumber(u16),

    /// Instructions without operands (constants, arithmetic, conversions, array accesses, stack
    /// manipulation, returns, `athrow`, `arraylength`, monitors)
    Simple(u8),

    /// `bipush`, `sipush` and `newarray`
    Int(u8, i32),

    /// Local variable loads and stores (and `ret`)
    Var(u8, u16),

    IInc(u16, i16),

    /// `new`, `anewarray`, `checkcast` and `instanceof`, with the class constant name (internal
    /// name or array descriptor)
    Type(u8, String),

    Field(u8, MemberRef),

    /// `invokevirtual`, `invokespecial`, `invokestatic` and `invokeinterface`
    Method(u8, MemberRef),

    /// Call sites stay attached to their existing `InvokeDynamic` constant
    InvokeDynamic {
        constant: ConstantIndex,
        descriptor: String,
    },

    /// Conditional and unconditional jumps (and `jsr`)
    Jump(u8, SynLabel),

    Ldc(LdcConstant),

    TableSwitch {
        low: i32,
        default: SynLabel,
        targets: Vec<SynLabel>,
    },

    LookupSwitch {
        default: SynLabel,
        pairs: Vec<(i32, SynLabel)>,
    },

    MultiANewArray(String, u8),
}

/// Loadable constant
#[derive(Clone, Debug, PartialEq)]
pub enum LdcConstant {
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    String(String),

    /// Class constant name
    Class(String),

    /// Method descriptor
    MethodType(String),

    /// Method handles and dynamic constants are left in the pool as they are, along with the
    /// descriptor of the value they load
    Pooled {
        index: ConstantIndex,
        descriptor: String,
    },
}

impl LdcConstant {
    /// Does the constant take two stack slots (and so need `ldc2_w`)?
    pub fn is_wide(&self) -> bool {
        match self {
            LdcConstant::Long(_) | LdcConstant::Double(_) => true,
            LdcConstant::Pooled { descriptor, .. } => descriptor == "J" || descriptor == "D",
            _ => false,
        }
    }
}

impl Insn {
    /// Is this an actual instruction (as opposed to a label or line number)?
    pub fn is_real(&self) -> bool {
        !matches!(self, Insn::Label(_) | Insn::LineNumber(_))
    }

    /// Can control continue on to the next instruction?
    pub fn falls_through(&self) -> bool {
        match self {
            Insn::Simple(op) => !matches!(*op, IRETURN..=RETURN | ATHROW),
            Insn::Jump(op, _) => !matches!(*op, GOTO | GOTO_W | JSR | JSR_W),
            Insn::Var(RET, _) => false,
            Insn::TableSwitch { .. } | Insn::LookupSwitch { .. } => false,
            _ => true,
        }
    }

    /// Labels this instruction may transfer control to (not counting falling through)
    pub fn jump_targets(&self) -> Vec<SynLabel> {
        match self {
            Insn::Jump(_, label) => vec![*label],
            Insn::TableSwitch {
                default, targets, ..
            } => std::iter::once(*default)
                .chain(targets.iter().copied())
                .collect(),
            Insn::LookupSwitch { default, pairs } => std::iter::once(*default)
                .chain(pairs.iter().map(|(_, label)| *label))
                .collect(),
            _ => vec![],
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Insn::Simple(IRETURN..=RETURN))
    }

    /// Load a local variable holding a reference
    pub fn aload(index: u16) -> Insn {
        Insn::Var(ALOAD, index)
    }

    pub fn invoke_static(owner: &str, name: &str, descriptor: &str) -> Insn {
        Insn::Method(INVOKESTATIC, MemberRef::new(owner, name, descriptor))
    }

    pub fn ldc_string(string: impl Into<String>) -> Insn {
        Insn::Ldc(LdcConstant::String(string.into()))
    }

    pub fn ldc_class(class_name: impl Into<String>) -> Insn {
        Insn::Ldc(LdcConstant::Class(class_name.into()))
    }

    /// Push an integer constant using the shortest instruction available
    pub fn push_int(value: i32) -> Insn {
        match value {
            -1..=5 => Insn::Simple((ICONST_0 as i32 + value) as u8),
            -128..=127 => Insn::Int(BIPUSH, value),
            -32768..=32767 => Insn::Int(SIPUSH, value),
            _ => Insn::Ldc(LdcConstant::Integer(value)),
        }
    }

    /// Push a long constant using the shortest instruction available
    pub fn push_long(value: i64) -> Insn {
        match value {
            0 => Insn::Simple(LCONST_0),
            1 => Insn::Simple(LCONST_1),
            _ => Insn::Ldc(LdcConstant::Long(value)),
        }
    }
}

/// Opcode of the conditional jump taken exactly when `opcode` is not taken
pub fn invert_jump(opcode: u8) -> Option<u8> {
    match opcode {
        // `ifeq`/`ifne`, `iflt`/`ifge`, ... come in pairs with the even opcode second
        IFEQ..=IF_ACMPNE => Some(if (opcode - IFEQ) % 2 == 0 {
            opcode + 1
        } else {
            opcode - 1
        }),
        IFNULL => Some(IFNONNULL),
        IFNONNULL => Some(IFNULL),
        _ => None,
    }
}

/// Exception handler, with its range expressed in labels
#[derive(Clone, Debug, PartialEq)]
pub struct TryCatchBlock {
    /// Start of the protected range (inclusive)
    pub start: SynLabel,

    /// End of the protected range (exclusive)
    pub end: SynLabel,

    pub handler: SynLabel,

    /// Internal name of the caught class, `None` for catch-all (`finally`)
    pub catch_type: Option<String>,
}

/// Entry of a `LocalVariableTable` or `LocalVariableTypeTable`
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVariableNode {
    pub start: SynLabel,
    pub end: SynLabel,
    pub name_index: Utf8ConstantIndex,

    /// Descriptor or signature, depending on the table
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
}

/// Editable method body
#[derive(Clone, Debug, Default)]
pub struct CodeNode {
    pub instructions: Vec<Insn>,
    pub try_catch_blocks: Vec<TryCatchBlock>,
    pub local_variables: Vec<LocalVariableNode>,
    pub local_variable_types: Vec<LocalVariableNode>,
    pub(crate) labels: SynLabelGenerator,
}

impl CodeNode {
    pub fn new() -> CodeNode {
        CodeNode::default()
    }

    /// Get a label that is not yet used anywhere in this body
    pub fn fresh_label(&mut self) -> SynLabel {
        self.labels.fresh_label()
    }

    /// Position of the pseudo-instruction placing `label`
    pub fn label_position(&self, label: SynLabel) -> Option<usize> {
        self.instructions
            .iter()
            .position(|insn| *insn == Insn::Label(label))
    }

    /// Splice instructions in at `index` (shifting the following instructions)
    pub fn insert_all(&mut self, index: usize, insns: impl IntoIterator<Item = Insn>) {
        let tail = self.instructions.split_off(index);
        self.instructions.extend(insns);
        self.instructions.extend(tail);
    }

    /// Index of the first real instruction
    pub fn first_real_index(&self) -> Option<usize> {
        self.instructions.iter().position(Insn::is_real)
    }

    /// Iterate over the real instructions with their positions
    pub fn real_instructions(&self) -> impl Iterator<Item = (usize, &Insn)> {
        self.instructions
            .iter()
            .enumerate()
            .filter(|(_, insn)| insn.is_real())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn jump_inversion() {
        assert_eq!(invert_jump(IFEQ), Some(IFNE));
        assert_eq!(invert_jump(IFNE), Some(IFEQ));
        assert_eq!(invert_jump(IFLT), Some(IFGE));
        assert_eq!(invert_jump(IF_ICMPLE), Some(IF_ICMPGT));
        assert_eq!(invert_jump(IF_ACMPEQ), Some(IF_ACMPNE));
        assert_eq!(invert_jump(IFNONNULL), Some(IFNULL));
        assert_eq!(invert_jump(GOTO), None, "unconditional jumps can't be inverted");
    }

    #[test]
    fn control_flow_queries() {
        let mut code = CodeNode::new();
        let target = code.fresh_label();
        assert!(!Insn::Simple(ATHROW).falls_through());
        assert!(!Insn::Simple(ARETURN).falls_through());
        assert!(Insn::Simple(IADD).falls_through());
        assert!(Insn::Jump(IFEQ, target).falls_through());
        assert!(!Insn::Jump(GOTO, target).falls_through());
        assert_eq!(Insn::Jump(GOTO, target).jump_targets(), vec![target]);
        assert!(Insn::Simple(RETURN).is_return());
        assert!(!Insn::Label(target).is_real());
    }

    #[test]
    fn shortest_pushes() {
        assert_eq!(Insn::push_int(-1), Insn::Simple(ICONST_M1));
        assert_eq!(Insn::push_int(5), Insn::Simple(ICONST_5));
        assert_eq!(Insn::push_int(100), Insn::Int(BIPUSH, 100));
        assert_eq!(Insn::push_int(1000), Insn::Int(SIPUSH, 1000));
        assert_eq!(
            Insn::push_int(10_000_000),
            Insn::Ldc(LdcConstant::Integer(10_000_000))
        );
        assert_eq!(Insn::push_long(1), Insn::Simple(LCONST_1));
        assert_eq!(
            Insn::push_long(30_000_000),
            Insn::Ldc(LdcConstant::Long(30_000_000))
        );
    }

    #[test]
    fn splicing() {
        let mut code = CodeNode::new();
        code.instructions = vec![Insn::Simple(NOP), Insn::Simple(RETURN)];
        code.insert_all(1, vec![Insn::aload(0), Insn::Simple(POP)]);
        assert_eq!(
            code.instructions,
            vec![
                Insn::Simple(NOP),
                Insn::aload(0),
                Insn::Simple(POP),
                Insn::Simple(RETURN)
            ]
        );
    }
}
