//! Vasculature graphs stored in the columnar container.
//!
//! Vessel sections are not a forest: a section may have several
//! predecessors as well as several successors, so the topology is kept as
//! an edge list instead of parent links.
//!
//! # Format
//! A [TableStore](crate::columnar::TableStore) with three tables:
//! * `points`: one `x y z diameter` row per point
//! * `structure`: one `offset type` row per section, the type being a
//!   [VascularSectionType] code
//! * `connectivity`: one `from to` row per edge between two sections
//!
//! # Quick API
//! * [parse_bytes] - reads a vasculature from memory
//! * [parse_file] - reads a file
//! * [to_table_store] - encodes a vasculature

mod reader;

pub use self::reader::to_table_store;

use crate::columnar::TableStore;
use crate::diagnostics::STRING_URI;
use crate::error::MorphError;
use crate::model::{Point, SectionId, VascularSectionType, geometry};
use std::path::Path;

/// Table names of a vasculature.
pub(crate) mod tables {
    pub const POINTS: &str = "points";
    pub const STRUCTURE: &str = "structure";
    pub const CONNECTIVITY: &str = "connectivity";
}

// =#========================================================================#=
// VASCULATURE
// =#========================================================================#=
/// A read-only vasculature graph.
///
/// Section points live in flattened arrays; [VascularSection] views borrow
/// slices out of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Vasculature {
    points: Vec<Point>,
    diameters: Vec<f64>,
    /// Start of every section in `points`, plus the point count
    offsets: Vec<usize>,
    section_types: Vec<VascularSectionType>,
    connectivity: Vec<[SectionId; 2]>,
    predecessors: Vec<Vec<SectionId>>,
    successors: Vec<Vec<SectionId>>,
    uri: Option<String>,
}

impl Vasculature {
    /// Assembles a graph from validated parts; `offsets` holds one more
    /// entry than `section_types` and every edge names existing sections.
    pub(crate) fn from_parts(
        points: Vec<Point>,
        diameters: Vec<f64>,
        offsets: Vec<usize>,
        section_types: Vec<VascularSectionType>,
        connectivity: Vec<[SectionId; 2]>,
    ) -> Self {
        let mut predecessors = vec![Vec::new(); section_types.len()];
        let mut successors = vec![Vec::new(); section_types.len()];
        for &[from, to] in &connectivity {
            successors[from].push(to);
            predecessors[to].push(from);
        }
        Self { points, diameters, offsets, section_types, connectivity, predecessors, successors, uri: None }
    }

    pub(crate) fn with_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Source URI, or `"$STRING$"` when built in memory.
    pub fn uri(&self) -> &str {
        self.uri.as_deref().unwrap_or(STRING_URI)
    }

    pub fn section_count(&self) -> usize {
        self.section_types.len()
    }

    pub fn section(&self, id: SectionId) -> Result<VascularSection<'_>, MorphError> {
        if id < self.section_count() {
            Ok(VascularSection { vasculature: self, id })
        } else {
            Err(MorphError::UnknownSection(id))
        }
    }

    /// All sections in id order.
    pub fn sections(&self) -> impl Iterator<Item = VascularSection<'_>> {
        (0..self.section_count()).map(move |id| VascularSection { vasculature: self, id })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn diameters(&self) -> &[f64] {
        &self.diameters
    }

    pub fn section_types(&self) -> &[VascularSectionType] {
        &self.section_types
    }

    /// Edges as `[from, to]` section ids, in stored order.
    pub fn connectivity(&self) -> &[[SectionId; 2]] {
        &self.connectivity
    }

    /// Sum of all section lengths.
    pub fn total_length(&self) -> f64 {
        self.sections().map(|section| section.length()).sum()
    }

    /// Depth-first walk over the undirected graph.
    ///
    /// Starts from the sections without predecessors in id order and then
    /// from any section left unvisited, so every section comes exactly once
    /// even on cycles.
    pub fn graph_iter(&self) -> GraphIter<'_> {
        GraphIter { vasculature: self, stack: Vec::new(), visited: vec![false; self.section_count()], next_start: 0 }
    }
}

// =#========================================================================#=
// SECTION VIEW
// =#========================================================================#=
/// Borrowed view of one vessel section.
#[derive(Debug, Clone, Copy)]
pub struct VascularSection<'a> {
    vasculature: &'a Vasculature,
    id: SectionId,
}

impl<'a> VascularSection<'a> {
    pub fn id(&self) -> SectionId {
        self.id
    }

    pub fn section_type(&self) -> VascularSectionType {
        self.vasculature.section_types[self.id]
    }

    pub fn points(&self) -> &'a [Point] {
        let (start, end) = self.range();
        &self.vasculature.points[start..end]
    }

    pub fn diameters(&self) -> &'a [f64] {
        let (start, end) = self.range();
        &self.vasculature.diameters[start..end]
    }

    pub fn predecessors(&self) -> &'a [SectionId] {
        &self.vasculature.predecessors[self.id]
    }

    pub fn successors(&self) -> &'a [SectionId] {
        &self.vasculature.successors[self.id]
    }

    /// Predecessors followed by successors.
    pub fn neighbors(&self) -> Vec<SectionId> {
        self.predecessors().iter().chain(self.successors()).copied().collect()
    }

    pub fn length(&self) -> f64 {
        geometry::section_length(self.points())
    }

    fn range(&self) -> (usize, usize) {
        (self.vasculature.offsets[self.id], self.vasculature.offsets[self.id + 1])
    }
}

/// Iterator of [Vasculature::graph_iter].
pub struct GraphIter<'a> {
    vasculature: &'a Vasculature,
    stack: Vec<SectionId>,
    visited: Vec<bool>,
    /// Lowest id that may still be an unvisited start
    next_start: SectionId,
}

impl GraphIter<'_> {
    fn push_starts(&mut self) {
        let vasculature = self.vasculature;
        let unvisited = || (self.next_start..vasculature.section_count()).filter(|&id| !self.visited[id]);
        let mut starts: Vec<SectionId> = unvisited().filter(|&id| vasculature.predecessors[id].is_empty()).collect();
        if starts.is_empty() {
            starts.extend(unvisited().next());
        }
        for &id in starts.iter().rev() {
            self.visited[id] = true;
            self.stack.push(id);
        }
    }
}

impl Iterator for GraphIter<'_> {
    type Item = SectionId;

    fn next(&mut self) -> Option<SectionId> {
        if self.stack.is_empty() {
            self.push_starts();
        }
        let id = self.stack.pop()?;
        while self.next_start < self.visited.len() && self.visited[self.next_start] {
            self.next_start += 1;
        }
        let neighbors = self.vasculature.section(id).map(|section| section.neighbors()).unwrap_or_default();
        for &neighbor in neighbors.iter().rev() {
            if !self.visited[neighbor] {
                self.visited[neighbor] = true;
                self.stack.push(neighbor);
            }
        }
        Some(id)
    }
}

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Reads a vasculature from memory.
pub fn parse_bytes(content: &[u8]) -> Result<Vasculature, MorphError> {
    parse_bytes_with(content, STRING_URI)
}

/// Reads a vasculature, reporting errors against `uri`.
///
/// # Errors
/// - [InvalidContainer](crate::parser::ParsingErrorType::InvalidContainer)
///   for missing or malformed tables and edges naming unknown sections
/// - [UnsupportedSectionType](crate::parser::ParsingErrorType::UnsupportedSectionType)
///   for a section type outside `0..=8`
pub fn parse_bytes_with(content: &[u8], uri: &str) -> Result<Vasculature, MorphError> {
    let store = TableStore::read_from(content, uri)?;
    Ok(reader::read(&store, uri)?.with_uri(uri))
}

/// Reads a vasculature file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vasculature, MorphError> {
    let content = std::fs::read(path.as_ref())?;
    parse_bytes_with(&content, &path.as_ref().to_string_lossy())
}
