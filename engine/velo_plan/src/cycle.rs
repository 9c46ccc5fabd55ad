//! Cycle detection for record field expansion.

use smallvec::SmallVec;
use velo_types::TypeId;

/// Tracks the record types on the current expansion path. One guard is
/// created per top-level declaration; revisiting a type on the same path
/// stops eager expansion below it.
pub(crate) struct CycleGuard {
    stack: SmallVec<[TypeId; 8]>,
}

impl CycleGuard {
    pub fn new() -> Self {
        CycleGuard {
            stack: SmallVec::new(),
        }
    }

    /// Push `ty` onto the path. Returns false (without pushing) when the
    /// type is already being expanded.
    pub fn enter(&mut self, ty: TypeId) -> bool {
        if self.stack.contains(&ty) {
            return false;
        }
        self.stack.push(ty);
        true
    }

    /// Pop the most recent type. Must pair with a successful `enter`.
    pub fn exit(&mut self) {
        self.stack.pop();
    }
}
