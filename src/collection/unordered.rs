//! Parallel loading of collection members in completion order.

use crate::collection::Source;
use crate::error::MorphError;
use crate::model::Morphology;
use crate::options::LoadOptions;
use rayon::ThreadPool;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use tracing::{debug, trace};

/// Iterator over `(index, result)` pairs of a batch load, yielded as the
/// workers finish.
///
/// Every requested index is yielded exactly once. Dropping the loader does
/// not cancel the loads already queued.
pub struct UnorderedLoader {
    receiver: Receiver<(usize, Result<Morphology, MorphError>)>,
    remaining: usize,
    _pool: ThreadPool,
}

impl UnorderedLoader {
    pub(crate) fn spawn(source: Arc<Source>, names: Vec<String>, options: LoadOptions) -> Result<Self, MorphError> {
        let workers = options.workers();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("neuromorph-loader-{i}"))
            .build()
            .map_err(|e| MorphError::Collection(format!("Unable to start the loading pool: {e}")))?;
        debug!("Loading {} morphologies on {workers} workers", names.len());

        let (sender, receiver) = mpsc::channel();
        let options = Arc::new(options);
        let remaining = names.len();
        for (index, name) in names.into_iter().enumerate() {
            let sender = sender.clone();
            let source = Arc::clone(&source);
            let options = Arc::clone(&options);
            pool.spawn(move || {
                trace!("Worker loading '{name}'");
                let mut diagnostics = options.diagnostics();
                let result = source.load(&name, &options, &mut diagnostics).map(|morph| morph.to_immutable());
                // the receiver may be gone, nothing to report then
                let _ = sender.send((index, result));
            });
        }
        drop(sender);
        Ok(Self { receiver, remaining, _pool: pool })
    }

    /// Number of results not yet yielded.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for UnorderedLoader {
    type Item = (usize, Result<Morphology, MorphError>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.receiver.recv().ok()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for UnorderedLoader {}
