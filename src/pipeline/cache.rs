//! Memoized frame buffers

/// Freshness of a [`CachedFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Clean,
    Dirty,
    /// A recompute is in progress; the buffer contents are not meaningful.
    Computing,
}

/// A byte buffer recomputed only after it has been invalidated.
#[derive(Debug)]
pub struct CachedFrame {
    data: Vec<u8>,
    state: CacheState,
    recomputes: u64,
}

impl CachedFrame {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0; len],
            state: CacheState::Dirty,
            recomputes: 0,
        }
    }

    pub fn invalidate(&mut self) {
        self.state = CacheState::Dirty;
    }

    /// Number of times `compute` has actually run
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Return the buffer, running `compute` over it first unless it is clean.
    pub fn get_or_compute(&mut self, compute: impl FnOnce(&mut Vec<u8>)) -> &[u8] {
        if self.state != CacheState::Clean {
            self.state = CacheState::Computing;
            compute(&mut self.data);
            self.recomputes += 1;
            self.state = CacheState::Clean;
        }
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_once_until_invalidated() {
        let mut cache = CachedFrame::new(2);
        assert_eq!(cache.state, CacheState::Dirty);

        assert_eq!(cache.get_or_compute(|buf| buf.fill(7)), &[7, 7]);
        assert_eq!(cache.get_or_compute(|buf| buf.fill(9)), &[7, 7]);
        assert_eq!(cache.recomputes(), 1);
        assert_eq!(cache.state, CacheState::Clean);

        cache.invalidate();
        assert_eq!(cache.get_or_compute(|buf| buf.fill(9)), &[9, 9]);
        assert_eq!(cache.recomputes(), 2);
    }
}
