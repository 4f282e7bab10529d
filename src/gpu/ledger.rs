//! Counts GPU resources created and released during a session.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

/// Resource categories with scoped acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    RenderTarget,
    ShaderProgram,
}

impl ResourceKind {
    fn index(self) -> usize {
        match self {
            ResourceKind::RenderTarget => 0,
            ResourceKind::ShaderProgram => 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResourceLedger {
    created: [AtomicUsize; 2],
    released: [AtomicUsize; 2],
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, kind: ResourceKind) {
        self.created[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn release(&self, kind: ResourceKind) {
        self.released[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn created(&self, kind: ResourceKind) -> usize {
        self.created[kind.index()].load(Ordering::Relaxed)
    }

    pub fn released(&self, kind: ResourceKind) -> usize {
        self.released[kind.index()].load(Ordering::Relaxed)
    }

    /// Created minus released (negative means a double release)
    pub fn outstanding(&self, kind: ResourceKind) -> isize {
        self.created(kind) as isize - self.released(kind) as isize
    }

    /// True when every resource was released exactly once; logs any imbalance
    pub fn check_balanced(&self) -> bool {
        let mut balanced = true;
        for kind in [ResourceKind::RenderTarget, ResourceKind::ShaderProgram] {
            let outstanding = self.outstanding(kind);
            if outstanding != 0 {
                warn!(
                    "{:?}: {} created, {} released",
                    kind,
                    self.created(kind),
                    self.released(kind)
                );
                balanced = false;
            } else {
                debug!("{:?}: {} created and released", kind, self.created(kind));
            }
        }
        balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_after_matching_releases() {
        let ledger = ResourceLedger::new();
        ledger.acquire(ResourceKind::RenderTarget);
        ledger.acquire(ResourceKind::RenderTarget);
        ledger.acquire(ResourceKind::ShaderProgram);
        assert!(!ledger.check_balanced());

        ledger.release(ResourceKind::RenderTarget);
        ledger.release(ResourceKind::RenderTarget);
        ledger.release(ResourceKind::ShaderProgram);
        assert!(ledger.check_balanced());
    }

    #[test]
    fn test_double_release_is_detected() {
        let ledger = ResourceLedger::new();
        ledger.acquire(ResourceKind::ShaderProgram);
        ledger.release(ResourceKind::ShaderProgram);
        ledger.release(ResourceKind::ShaderProgram);
        assert_eq!(ledger.outstanding(ResourceKind::ShaderProgram), -1);
        assert!(!ledger.check_balanced());
    }
}
