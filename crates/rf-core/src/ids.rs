use core::fmt;
use core::num::NonZeroU32;

/// Position of a boundary patch in the mesh patch table.
///
/// Stored off by one so `Option<PatchId>` stays four bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId(NonZeroU32);

impl PatchId {
    pub fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index).unwrap_or(u32::MAX - 1);
        Self(NonZeroU32::MIN.saturating_add(raw))
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Debug for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch#{}", self.index())
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

impl From<PatchId> for usize {
    fn from(id: PatchId) -> usize {
        id.index()
    }
}
