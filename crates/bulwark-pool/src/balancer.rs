use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-worker load counters and least-loaded selection.
///
/// A worker's load is the number of tasks dispatched to it that have not yet
/// completed (queued or running).
#[derive(Debug)]
pub struct LoadBalancer {
    loads: Vec<AtomicUsize>,
}

impl LoadBalancer {
    /// Creates a balancer for `workers` idle workers.
    pub fn new(workers: usize) -> Self {
        Self {
            loads: (0..workers).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.loads.len()
    }

    /// Picks the least-loaded worker and counts one more task against it.
    ///
    /// Selection reads a best-effort snapshot: two concurrent callers may
    /// both pick the same worker. Returns `None` when there are no workers.
    pub fn acquire(&self) -> Option<usize> {
        let worker = least_loaded(&self.loads())?;
        self.loads[worker].fetch_add(1, Ordering::AcqRel);
        Some(worker)
    }

    /// Counts one task against `worker` as finished.
    pub fn release(&self, worker: usize) {
        if let Some(load) = self.loads.get(worker) {
            // never underflow, even if release is called spuriously
            let _ = load.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        }
    }

    /// Current load of `worker`.
    pub fn load(&self, worker: usize) -> usize {
        self.loads
            .get(worker)
            .map_or(0, |load| load.load(Ordering::Acquire))
    }

    /// Snapshot of every worker's load, indexed by worker.
    pub fn loads(&self) -> Vec<usize> {
        self.loads
            .iter()
            .map(|load| load.load(Ordering::Acquire))
            .collect()
    }
}

/// Index of the smallest load, ties broken by the lowest index.
pub fn least_loaded(loads: &[usize]) -> Option<usize> {
    loads
        .iter()
        .enumerate()
        .min_by_key(|&(index, load)| (*load, index))
        .map(|(index, _)| index)
}
