//! The import pipeline: enumerate sources, read files on a worker pool,
//! then assemble the graph behind a synchronization barrier.

use std::path::PathBuf;
use std::sync::mpsc;

use archgraph_class_file::ClassReader;
use archgraph_graph::ClassGraph;

use crate::assembler::assemble;
use crate::builder::RecordBuilder;
use crate::error::{Diagnostic, ImportError, ImportFailure, Result};
use crate::raw::RawClass;
use crate::source::{enumerate, AuxiliaryClasspath, ClassFileSource, LocatedClassFile};

/// What to do when a single class file fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Abort the run on the first malformed file
    FailFast,
    /// Skip the file, record the failure, keep importing
    #[default]
    CollectAndContinue,
}

/// Caller-configurable import behavior.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub malformed_policy: MalformedPolicy,
    /// Worker thread cap; `None` picks an adaptive default
    pub max_workers: Option<usize>,
    /// Locations consulted only to enrich stub descriptors
    pub auxiliary_classpath: Vec<PathBuf>,
}

/// Outcome of a completed run: the frozen graph plus everything that was
/// tolerated along the way.
#[derive(Debug)]
pub struct ImportResult {
    pub graph: ClassGraph,
    /// Per-file parse failures (empty under a successful fail-fast run)
    pub failures: Vec<ImportFailure>,
    /// Non-fatal anomalies recovered during import
    pub diagnostics: Vec<Diagnostic>,
}

/// Imports a set of class files into a [`ClassGraph`].
///
/// Reading and raw-record construction run per file on a worker pool; files
/// have no cross-file data dependency. Assembly starts only after every
/// requested file has been read, because stub-vs-resolved decisions need
/// global knowledge of the imported names.
#[derive(Debug, Default)]
pub struct ClassFileImporter {
    options: ImportOptions,
}

impl ClassFileImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ImportOptions) -> Self {
        Self { options }
    }

    /// Run the full pipeline over `sources`.
    pub fn import(&self, sources: &[ClassFileSource]) -> Result<ImportResult> {
        let auxiliary = AuxiliaryClasspath::new(&self.options.auxiliary_classpath)?;
        let (files, mut failures) = enumerate(sources)?;

        let mut raw_classes = Vec::with_capacity(files.len());
        for outcome in read_all(&files, self.worker_count(files.len())) {
            match outcome {
                Ok(raw) => raw_classes.push(raw),
                Err(failure) => failures.push(failure),
            }
        }
        failures.sort_by(|a, b| a.location.cmp(&b.location));

        if self.options.malformed_policy == MalformedPolicy::FailFast {
            if let Some(failure) = failures.into_iter().next() {
                return Err(ImportError::Malformed {
                    location: failure.location,
                    source: failure.error,
                });
            }
            failures = Vec::new();
        }

        let mut diagnostics = Vec::new();
        for raw in &mut raw_classes {
            diagnostics.append(&mut raw.diagnostics);
        }
        for diagnostic in &diagnostics {
            log::warn!("{diagnostic}");
        }

        let graph = assemble(raw_classes, &auxiliary);
        log::info!(
            "import finished: {} class(es), {} failure(s), {} diagnostic(s)",
            graph.class_count(),
            failures.len(),
            diagnostics.len()
        );

        Ok(ImportResult { graph, failures, diagnostics })
    }

    fn worker_count(&self, files: usize) -> usize {
        // Reading is a mix of IO and CPU; a high hardcoded fan-out just
        // spikes memory on large runs, so cap adaptively unless overridden.
        let cap = self.options.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .clamp(2, 8)
        });
        cap.clamp(1, files.max(1))
    }
}

/// Fan file reading out over scoped worker threads; each file's
/// reader → builder → correlator pipeline stays single-threaded.
fn read_all(
    files: &[LocatedClassFile],
    workers: usize,
) -> Vec<std::result::Result<RawClass, ImportFailure>> {
    if files.is_empty() {
        return Vec::new();
    }

    let chunk_size = files.len().div_ceil(workers);
    let (sender, receiver) = mpsc::channel();

    std::thread::scope(|scope| {
        for chunk in files.chunks(chunk_size) {
            let sender = sender.clone();
            scope.spawn(move || {
                for file in chunk {
                    // a send only fails if the receiver is gone, which
                    // cannot happen while the scope is alive
                    let _ = sender.send(read_one(file));
                }
            });
        }
        drop(sender);

        receiver.iter().collect()
    })
}

fn read_one(file: &LocatedClassFile) -> std::result::Result<RawClass, ImportFailure> {
    let mut builder = RecordBuilder::new();
    match ClassReader::read(&file.bytes, &mut builder) {
        Ok(()) => builder.finish().ok_or_else(|| ImportFailure {
            location: file.location.clone(),
            error: archgraph_class_file::ClassFileError::Malformed(
                "no class declaration".to_string(),
            ),
        }),
        Err(error) => {
            log::debug!("failed to read {}: {error}", file.location);
            Err(ImportFailure { location: file.location.clone(), error })
        }
    }
}
