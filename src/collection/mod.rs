//! Named access to many morphologies: a directory of files or a merged
//! columnar container.
//!
//! # Example
//! ```no_run
//! use neuromorph::LoadOptions;
//! use neuromorph::collection::Collection;
//!
//! let collection = Collection::open("morphologies/")?;
//! let options = LoadOptions::default();
//! let cell = collection.load("cell_a", &options)?;
//! for (index, result) in collection.load_unordered(&["cell_b", "cell_c"], &options)? {
//!     println!("{index}: {} sections", result?.section_count());
//! }
//! # Ok::<(), neuromorph::MorphError>(())
//! ```

mod unordered;

pub use self::unordered::UnorderedLoader;

use crate::columnar::{self, TableStore};
use crate::diagnostics::Diagnostics;
use crate::error::MorphError;
use crate::model::{Morphology, MutableMorphology};
use crate::options::LoadOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Extensions tried, in order, to resolve a name in a directory
pub const DEFAULT_EXTENSIONS: [&str; 3] = [".h5", ".swc", ".asc"];

/// Where the morphologies of a collection come from.
#[derive(Debug, Clone)]
pub(crate) enum Source {
    Directory { dir: PathBuf, extensions: Vec<String> },
    /// Decoded merged container, shared by the loading workers
    Container { uri: String, store: Arc<TableStore>, names: Vec<String> },
}

impl Source {
    /// Loads one morphology by name.
    pub(crate) fn load(
        &self,
        name: &str,
        options: &LoadOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<MutableMorphology, MorphError> {
        match self {
            Source::Directory { dir, extensions } => {
                let path = extensions
                    .iter()
                    .map(|ext| dir.join(format!("{name}{ext}")))
                    .find(|path| path.is_file())
                    .ok_or_else(|| not_found(name, &dir.to_string_lossy()))?;
                crate::load_mutable_file_with(&path, options, diagnostics)
            }
            Source::Container { uri, store, names } => {
                if !names.iter().any(|n| n == name) {
                    return Err(not_found(name, uri));
                }
                columnar::read_store(store, &format!("{name}/"), &format!("{uri}/{name}"), options, diagnostics)
            }
        }
    }

    fn argsort<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, MorphError> {
        match self {
            Source::Directory { .. } => Ok((0..names.len()).collect()),
            Source::Container { uri, store, .. } => {
                let offsets = names
                    .iter()
                    .map(|name| {
                        let name = name.as_ref();
                        store.offset(&format!("{name}/structure")).ok_or_else(|| not_found(name, uri))
                    })
                    .collect::<Result<Vec<u64>, MorphError>>()?;
                let mut order: Vec<usize> = (0..names.len()).collect();
                order.sort_by_key(|&i| offsets[i]);
                Ok(order)
            }
        }
    }
}

fn not_found(name: &str, location: &str) -> MorphError {
    MorphError::Collection(format!("Morphology '{name}' not found in: {location}"))
}

fn closed() -> MorphError {
    MorphError::Collection("The collection has been closed.".to_string())
}

// =#========================================================================#=
// COLLECTION
// =#========================================================================#=
/// A set of named morphologies, backed by a directory or a merged container.
#[derive(Debug)]
pub struct Collection {
    source: Option<Arc<Source>>,
}

impl Collection {
    /// Opens a directory or a merged container file, resolving names in a
    /// directory with the [default extensions](DEFAULT_EXTENSIONS).
    ///
    /// # Errors
    /// - [MorphError::Collection] "Invalid path: ..." if `path` is neither
    ///   a directory nor a file
    /// - Any error decoding the container file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MorphError> {
        Self::open_with_extensions(path, &DEFAULT_EXTENSIONS)
    }

    /// Opens a collection; names in a directory are resolved by trying the
    /// given extensions (with leading dot) in order.
    pub fn open_with_extensions<P: AsRef<Path>>(path: P, extensions: &[&str]) -> Result<Self, MorphError> {
        let path = path.as_ref();
        let source = if path.is_dir() {
            debug!("Opening directory collection {}", path.display());
            Source::Directory {
                dir: path.to_path_buf(),
                extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
            }
        } else if path.is_file() {
            let uri = path.to_string_lossy().into_owned();
            let store = TableStore::read_from(&std::fs::read(path)?, &uri)?;
            columnar::check_version(&store, &uri)?;
            let names = columnar::container_names(&store);
            debug!("Opening container collection {uri} of {} morphologies", names.len());
            Source::Container { uri, store: Arc::new(store), names }
        } else {
            return Err(MorphError::Collection(format!("Invalid path: {}", path.display())));
        };
        Ok(Self { source: Some(Arc::new(source)) })
    }

    fn source(&self) -> Result<&Arc<Source>, MorphError> {
        self.source.as_ref().ok_or_else(closed)
    }

    /// Names of the available morphologies.
    ///
    /// Sorted for a directory, in file order for a container.
    pub fn names(&self) -> Result<Vec<String>, MorphError> {
        match self.source()?.as_ref() {
            Source::Directory { dir, extensions } => {
                let mut names = Vec::new();
                for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
                    let entry = entry.map_err(|e| MorphError::Collection(format!("Walk error: {e}")))?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let file_name = entry.file_name().to_string_lossy();
                    if let Some(stem) = extensions.iter().find_map(|ext| file_name.strip_suffix(ext.as_str())) {
                        names.push(stem.to_string());
                    }
                }
                names.sort();
                names.dedup();
                Ok(names)
            }
            Source::Container { names, .. } => Ok(names.clone()),
        }
    }

    /// Loads a morphology as immutable.
    pub fn load(&self, name: &str, options: &LoadOptions) -> Result<Morphology, MorphError> {
        Ok(self.load_mutable(name, options)?.to_immutable())
    }

    /// Loads a morphology as mutable.
    ///
    /// # Errors
    /// - [MorphError::Collection] if the collection is closed or the name is unknown
    /// - Any error of the format reader
    pub fn load_mutable(&self, name: &str, options: &LoadOptions) -> Result<MutableMorphology, MorphError> {
        let mut diagnostics = options.diagnostics();
        self.load_with(name, options, &mut diagnostics)
    }

    /// Loads a morphology as mutable into the given diagnostics sink.
    pub fn load_with(
        &self,
        name: &str,
        options: &LoadOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<MutableMorphology, MorphError> {
        self.source()?.load(name, options, diagnostics)
    }

    /// Loads morphologies on a pool of `options.workers()` threads.
    ///
    /// Items are `(index into names, result)` in completion order. A
    /// failing load yields its error and does not stop the others.
    pub fn load_unordered<S: AsRef<str>>(
        &self,
        names: &[S],
        options: &LoadOptions,
    ) -> Result<UnorderedLoader, MorphError> {
        let names = names.iter().map(|n| n.as_ref().to_string()).collect();
        UnorderedLoader::spawn(Arc::clone(self.source()?), names, options.clone())
    }

    /// Order in which loading `names` is cheapest: identity for a directory,
    /// by position in the file for a container.
    ///
    /// # Errors
    /// For a container, if a name is unknown.
    pub fn argsort<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, MorphError> {
        self.source()?.argsort(names)
    }

    /// Releases the source, further loads fail.
    pub fn close(&mut self) {
        self.source = None;
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }
}
