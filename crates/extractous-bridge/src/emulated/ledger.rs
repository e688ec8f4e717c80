// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Allocation ledger of the emulated engine.
//
// Every pointer the engine hands out is recorded here before it crosses the
// ABI and removed before it is reclaimed. A pointer that is not in the ledger
// is never dereferenced or freed, so a double free or a foreign pointer is
// counted instead of corrupting the heap.

use std::collections::HashMap;

use extractous_core::ResourceKind;

#[derive(Debug, Clone, Copy)]
struct Allocation {
    kind: ResourceKind,
    /// Byte length, recorded for buffers only.
    len: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Ledger {
    live: HashMap<usize, Allocation>,
    invalid_releases: usize,
    stale_uses: usize,
}

impl Ledger {
    pub(crate) fn record(&mut self, addr: usize, kind: ResourceKind, len: usize) {
        if let Some(previous) = self.live.insert(addr, Allocation { kind, len }) {
            // The allocator only reuses freed addresses, so this means an
            // entry outlived its allocation.
            tracing::error!(addr, kind = %previous.kind, "ledger entry overwritten");
        }
    }

    /// Remove a live entry of the given kind. Returns its recorded length.
    pub(crate) fn remove(&mut self, addr: usize, kind: ResourceKind) -> Option<usize> {
        match self.live.get(&addr) {
            Some(entry) if entry.kind == kind => self.live.remove(&addr).map(|e| e.len),
            _ => None,
        }
    }

    pub(crate) fn contains(&self, addr: usize, kind: ResourceKind) -> bool {
        self.live.get(&addr).is_some_and(|entry| entry.kind == kind)
    }

    pub(crate) fn note_invalid_release(&mut self) {
        self.invalid_releases += 1;
    }

    pub(crate) fn note_stale_use(&mut self) {
        self.stale_uses += 1;
    }

    pub(crate) fn live(&self, kind: ResourceKind) -> usize {
        self.live.values().filter(|entry| entry.kind == kind).count()
    }

    pub(crate) fn live_total(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn invalid_releases(&self) -> usize {
        self.invalid_releases
    }

    pub(crate) fn stale_uses(&self) -> usize {
        self.stale_uses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_requires_matching_kind() {
        let mut ledger = Ledger::default();
        ledger.record(0x1000, ResourceKind::PdfConfig, 0);
        assert_eq!(ledger.remove(0x1000, ResourceKind::OcrConfig), None);
        assert!(ledger.contains(0x1000, ResourceKind::PdfConfig));
        assert_eq!(ledger.remove(0x1000, ResourceKind::PdfConfig), Some(0));
        assert_eq!(ledger.live_total(), 0);
    }

    #[test]
    fn counts_per_kind() {
        let mut ledger = Ledger::default();
        ledger.record(0x10, ResourceKind::String, 0);
        ledger.record(0x20, ResourceKind::String, 0);
        ledger.record(0x30, ResourceKind::Buffer, 64);
        assert_eq!(ledger.live(ResourceKind::String), 2);
        assert_eq!(ledger.live(ResourceKind::Buffer), 1);
        assert_eq!(ledger.remove(0x30, ResourceKind::Buffer), Some(64));
    }
}
