use super::class_file::Constant;
use super::code::SynLabel;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// The first four bytes were not `0xCAFEBABE`
    BadMagic([u8; 4]),

    /// Bytes left over after the class file was fully read
    TrailingBytes(usize),

    ConstantPoolOverflow {
        constant: Box<Constant>,
        offset: usize,
    },
    BadConstantIndex(u16),

    /// Constant at the index exists, but is not of the expected kind
    UnexpectedConstant(u16, &'static str),

    MalformedAttribute(&'static str),
    BadDescriptor(String),

    /// Bytecode that could not be decoded (unknown opcode, branch into the middle of an
    /// instruction, truncated operands)
    MalformedCode {
        offset: usize,
        reason: String,
    },

    /// Instruction that can be decoded but not re-encoded (`jsr` and `ret`)
    UnsupportedInstruction(&'static str),

    MethodCodeOverflow(usize),
    MethodCodeMaxStackOverflow(usize),
    MethodCodeMaxLocalsOverflow(usize),

    /// A branch or exception range refers to a label that is never placed
    UnknownLabel(SynLabel),

    /// Frame computation found an instruction whose operands don't fit the current frame
    InvalidFrame {
        instruction: usize,
        reason: String,
    },

    /// A class needed to merge two frames could not be found
    TypeNotFound(String),
}

impl Error {
    pub(crate) fn invalid_frame(instruction: usize, reason: impl Into<String>) -> Error {
        Error::InvalidFrame {
            instruction,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_code(offset: usize, reason: impl Into<String>) -> Error {
        Error::MalformedCode {
            offset,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "{}", err),
            Error::BadMagic(magic) => write!(f, "Bad class file magic {:02X?}", magic),
            Error::TrailingBytes(count) => {
                write!(f, "{} unexpected bytes after end of class file", count)
            }
            Error::ConstantPoolOverflow { constant, offset } => write!(
                f,
                "Constant pool overflow adding {:?} at offset {}",
                constant, offset
            ),
            Error::BadConstantIndex(index) => write!(f, "Invalid constant pool index {}", index),
            Error::UnexpectedConstant(index, expected) => {
                write!(f, "Constant at index {} is not {}", index, expected)
            }
            Error::MalformedAttribute(name) => write!(f, "Malformed {} attribute", name),
            Error::BadDescriptor(descriptor) => write!(f, "Invalid descriptor '{}'", descriptor),
            Error::MalformedCode { offset, reason } => {
                write!(f, "Malformed bytecode at offset {}: {}", offset, reason)
            }
            Error::UnsupportedInstruction(name) => {
                write!(f, "Instruction '{}' is not supported", name)
            }
            Error::MethodCodeOverflow(len) => {
                write!(f, "Method code is {} bytes, more than the 65535 allowed", len)
            }
            Error::MethodCodeMaxStackOverflow(len) => {
                write!(f, "Method needs {} stack slots, more than 65535", len)
            }
            Error::MethodCodeMaxLocalsOverflow(len) => {
                write!(f, "Method needs {} local slots, more than 65535", len)
            }
            Error::UnknownLabel(label) => write!(f, "Label {:?} is never placed", label),
            Error::InvalidFrame {
                instruction,
                reason,
            } => write!(f, "Instruction #{}: {}", instruction, reason),
            Error::TypeNotFound(name) => write!(f, "Type not found: {}", name),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
