//! Allocation bookkeeping for image buffers.
//!
//! Every buffer owns an [`Allocation`] guard. Creating the guard records an
//! allocation against a fresh [`BufferId`], dropping it records the matching
//! deallocation, so release happens on every exit path of the pipeline.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::hsi_pipeline::common::error::{HsiError, Result};

/// Identity of one allocated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Cube,
    Frame,
    CubeDataFormat,
    CorrectionMatrix,
}

/// Allocation history of a single buffer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: BufferId,
    pub kind: BufferKind,
    pub label: String,
    pub allocations: u32,
    pub deallocations: u32,
}

impl LedgerEntry {
    pub fn is_outstanding(&self) -> bool {
        self.allocations > self.deallocations
    }

    pub fn is_balanced(&self) -> bool {
        self.allocations == self.deallocations
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    next_id: u64,
    entries: BTreeMap<BufferId, LedgerEntry>,
}

/// Shared record of buffer allocations for one process.
///
/// Cloning the ledger yields another view of the same records. The pipeline
/// is single-threaded, so the ledger is not `Send`.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    state: Rc<RefCell<LedgerState>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&self, kind: BufferKind, label: impl Into<String>) -> Allocation {
        let label = label.into();
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = BufferId(state.next_id);

        debug!("Allocated {:?} {} ({})", kind, id, label);

        state.entries.insert(
            id,
            LedgerEntry {
                id,
                kind,
                label,
                allocations: 1,
                deallocations: 0,
            },
        );

        Allocation {
            ledger: self.clone(),
            id,
            kind,
        }
    }

    fn release(&self, id: BufferId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        match state.entries.get_mut(&id) {
            Some(entry) if entry.is_outstanding() => {
                entry.deallocations += 1;
                debug!("Deallocated {:?} {} ({})", entry.kind, id, entry.label);
                Ok(())
            }
            _ => Err(HsiError::DataNotAllocated),
        }
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.state.borrow().entries.values().cloned().collect()
    }

    pub fn entry(&self, id: BufferId) -> Option<LedgerEntry> {
        self.state.borrow().entries.get(&id).cloned()
    }

    /// Buffers allocated and not yet released.
    pub fn outstanding(&self) -> Vec<LedgerEntry> {
        self.state
            .borrow()
            .entries
            .values()
            .filter(|entry| entry.is_outstanding())
            .cloned()
            .collect()
    }

    /// True when every identity has as many deallocations as allocations.
    pub fn is_balanced(&self) -> bool {
        self.state
            .borrow()
            .entries
            .values()
            .all(LedgerEntry::is_balanced)
    }

    /// Number of identities ever allocated for `kind`.
    pub fn allocations_of(&self, kind: BufferKind) -> usize {
        self.state
            .borrow()
            .entries
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

/// Scoped ownership of one ledger identity; dropping it deallocates.
#[derive(Debug)]
pub struct Allocation {
    ledger: ResourceLedger,
    id: BufferId,
    kind: BufferKind,
}

impl Allocation {
    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        if let Err(e) = self.ledger.release(self.id) {
            warn!("Refused to release {:?} {}: {}", self.kind, self.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_records_single_deallocation() {
        let ledger = ResourceLedger::new();
        let allocation = ledger.allocate(BufferKind::Cube, "cube");
        let id = allocation.id();

        assert!(ledger.entry(id).unwrap().is_outstanding());
        assert!(!ledger.is_balanced());

        drop(allocation);

        let entry = ledger.entry(id).unwrap();
        assert_eq!(entry.allocations, 1);
        assert_eq!(entry.deallocations, 1);
        assert!(ledger.is_balanced());
        assert!(ledger.outstanding().is_empty());
    }

    #[test]
    fn test_identities_are_distinct() {
        let ledger = ResourceLedger::new();
        let a = ledger.allocate(BufferKind::Cube, "cube");
        let b = ledger.allocate(BufferKind::Cube, "cube");
        let frame = ledger.allocate(BufferKind::Frame, "dark_reference");

        assert_ne!(a.id(), b.id());
        assert_eq!(ledger.allocations_of(BufferKind::Cube), 2);
        assert_eq!(ledger.allocations_of(BufferKind::Frame), 1);
        assert_eq!(ledger.outstanding().len(), 3);

        drop(b);
        let outstanding: Vec<BufferId> = ledger.outstanding().iter().map(|e| e.id).collect();
        assert_eq!(outstanding, vec![a.id(), frame.id()]);
    }

    #[test]
    fn test_release_of_unknown_identity_is_refused() {
        let ledger = ResourceLedger::new();
        assert_eq!(ledger.release(BufferId(42)), Err(HsiError::DataNotAllocated));
    }

    #[test]
    fn test_second_release_is_refused() {
        let ledger = ResourceLedger::new();
        let allocation = ledger.allocate(BufferKind::CorrectionMatrix, "correction_matrix");
        let id = allocation.id();
        drop(allocation);

        assert_eq!(ledger.release(id), Err(HsiError::DataNotAllocated));
        assert_eq!(ledger.entry(id).unwrap().deallocations, 1);
    }
}
