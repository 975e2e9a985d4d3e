use super::VerificationType;
use crate::jvm::class_file::{ClassConstantIndex, StackMapFrame};
use crate::util::{OffsetVec, Width};

/// Snapshot of the stack and local variables at a point in the bytecode
///
/// Locals are kept one entry per slot (so a `long` is followed by a `Top` for its second half),
/// which makes stores by index simple. The stack is an `OffsetVec`, so its size in slots is
/// always at hand.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame<Cls, U> {
    /// Local variables, one entry per slot
    pub locals: Vec<VerificationType<Cls, U>>,

    /// Types of values on the stack
    pub stack: OffsetVec<VerificationType<Cls, U>>,
}

impl<Cls, U> Default for Frame<Cls, U> {
    fn default() -> Self {
        Frame {
            locals: vec![],
            stack: OffsetVec::new(),
        }
    }
}

impl<Cls: Clone + PartialEq, U: Clone + PartialEq> Frame<Cls, U> {
    /// Write a local, invalidating whatever it overlaps
    pub fn set_local(&mut self, index: usize, typ: VerificationType<Cls, U>) {
        let width = typ.width();
        if self.locals.len() < index + width {
            self.locals.resize(index + width, VerificationType::Top);
        }
        if index > 0 && self.locals[index - 1].width() == 2 {
            self.locals[index - 1] = VerificationType::Top;
        }
        self.locals[index] = typ;
        if width == 2 {
            self.locals[index + 1] = VerificationType::Top;
        }
    }

    /// Locals as they are listed in a stack map frame: wide types take one entry, and trailing
    /// `Top` entries are dropped
    pub fn local_entries(&self) -> Vec<VerificationType<Cls, U>> {
        let mut entries = vec![];
        let mut slot = 0;
        while slot < self.locals.len() {
            let typ = &self.locals[slot];
            entries.push(typ.clone());
            slot += typ.width();
        }
        while entries.last() == Some(&VerificationType::Top) {
            entries.pop();
        }
        entries
    }

    /// Replace every occurrence of a type, in both the locals and the stack
    pub fn replace_all(
        &mut self,
        original: &VerificationType<Cls, U>,
        updated: VerificationType<Cls, U>,
    ) {
        for local in self.locals.iter_mut() {
            if local == original {
                *local = updated.clone();
            }
        }
        self.stack.replace_all(|typ| typ == original, updated);
    }
}

impl Frame<ClassConstantIndex, u16> {
    /// Compute a stack map frame for this frame, given the previous frame
    ///
    /// This will fall back to the `Full` option using [`Self::full_stack_map_frame`] only if none of the
    /// other stack map frame variants are enough to encode the transition.
    pub fn stack_map_frame(&self, offset_delta: u16, previous_frame: &Self) -> StackMapFrame {
        let this_locals = self.local_entries();
        let prev_locals = previous_frame.local_entries();

        match self.stack.len() {
            0 => {
                if this_locals.len() <= prev_locals.len() {
                    let len_difference = prev_locals.len() - this_locals.len();
                    let this_is_prefix_of_prev = this_locals
                        .iter()
                        .zip(prev_locals.iter())
                        .all(|(t1, t2)| t1 == t2);

                    if len_difference < 4 && this_is_prefix_of_prev {
                        if len_difference == 0 {
                            return StackMapFrame::SameLocalsNoStack { offset_delta };
                        } else {
                            return StackMapFrame::ChopLocalsNoStack {
                                offset_delta,
                                chopped_k: len_difference as u8,
                            };
                        }
                    }
                } else if this_locals.len() - prev_locals.len() < 4
                    && this_locals[..prev_locals.len()] == prev_locals[..]
                {
                    return StackMapFrame::AppendLocalsNoStack {
                        offset_delta,
                        locals: this_locals[prev_locals.len()..].to_vec(),
                    };
                }
            }
            1 if this_locals == prev_locals => {
                if let Some(stack) = self.stack.last() {
                    return StackMapFrame::SameLocalsOneStack {
                        offset_delta,
                        stack: *stack,
                    };
                }
            }
            _ => (),
        }

        self.full_stack_map_frame(offset_delta)
    }

    /// Compute a `Full` stack map frame
    pub fn full_stack_map_frame(&self, offset_delta: u16) -> StackMapFrame {
        StackMapFrame::Full {
            offset_delta,
            stack: self.stack.iter().map(|(_, _, t)| *t).collect(),
            locals: self.local_entries(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantIndex;

    type SFrame = Frame<ClassConstantIndex, u16>;
    type VType = VerificationType<ClassConstantIndex, u16>;

    fn frame(locals: Vec<VType>, stack: Vec<VType>) -> SFrame {
        let mut frame = SFrame::default();
        for (i, local) in locals.into_iter().enumerate() {
            // callers only use narrow types here, so slots and entries line up
            frame.set_local(i, local);
        }
        frame.stack = stack.into_iter().collect();
        frame
    }

    #[test]
    fn wide_locals() {
        let mut frame: Frame<String, usize> = Frame::default();
        frame.set_local(0, VerificationType::Integer);
        frame.set_local(1, VerificationType::Long);
        assert_eq!(frame.locals.len(), 3, "long takes two slots");
        assert_eq!(
            frame.local_entries(),
            vec![VerificationType::Integer, VerificationType::Long]
        );

        // Overwriting the second half of the long kills the long
        frame.set_local(2, VerificationType::Float);
        assert_eq!(
            frame.local_entries(),
            vec![
                VerificationType::Integer,
                VerificationType::Top,
                VerificationType::Float
            ]
        );
    }

    #[test]
    fn compression() {
        let object = VType::Object(ClassConstantIndex(ConstantIndex(4)));
        let base = frame(vec![object, VType::Integer], vec![]);

        let same = frame(vec![object, VType::Integer], vec![]);
        assert_eq!(
            same.stack_map_frame(7, &base),
            StackMapFrame::SameLocalsNoStack { offset_delta: 7 }
        );

        let chopped = frame(vec![object], vec![]);
        assert_eq!(
            chopped.stack_map_frame(1, &base),
            StackMapFrame::ChopLocalsNoStack {
                offset_delta: 1,
                chopped_k: 1
            }
        );

        let appended = frame(vec![object, VType::Integer, VType::Float], vec![]);
        assert_eq!(
            appended.stack_map_frame(2, &base),
            StackMapFrame::AppendLocalsNoStack {
                offset_delta: 2,
                locals: vec![VType::Float]
            }
        );

        let one_stack = frame(vec![object, VType::Integer], vec![object]);
        assert_eq!(
            one_stack.stack_map_frame(3, &base),
            StackMapFrame::SameLocalsOneStack {
                offset_delta: 3,
                stack: object
            }
        );

        let full = frame(vec![], vec![object]);
        assert_eq!(
            full.stack_map_frame(4, &base),
            StackMapFrame::Full {
                offset_delta: 4,
                locals: vec![],
                stack: vec![object]
            }
        );
    }
}
