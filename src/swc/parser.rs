//! SWC sample reader and section builder.

use crate::diagnostics::{Diagnostics, Location, Warning};
use crate::error::MorphError;
use crate::model::{MutableMorphology, Point, PointLevel, SectionId, SectionType, SomaConvention};
use crate::model::{ThreePointStatus, geometry::EPSILON};
use crate::options::LoadOptions;
use crate::parser::byte_source::ByteSource;
use crate::parser::{ByteParser, ParsingError, ParsingErrorType};
use std::collections::HashMap;
use tracing::trace;

/// Parent id of samples without parent
const NO_PARENT: i64 = -1;

/// One record of an SWC file.
#[derive(Debug, Clone)]
struct Sample {
    id: i64,
    section_type: SectionType,
    point: Point,
    diameter: f64,
    parent: i64,
    line: usize,
}

impl Sample {
    fn is_soma(&self) -> bool {
        self.section_type == SectionType::Soma
    }
}

// =#========================================================================#=
// SWC PARSER
// =#========================================================================#=
/// Reads SWC samples and builds the sections of a [MutableMorphology].
///
/// Samples are addressed by their index in file order; `children` maps a
/// parent id (`-1` for roots) to child indices, in file order.
pub(crate) struct SwcParser<'a> {
    uri: String,
    options: &'a LoadOptions,
    diagnostics: &'a mut Diagnostics,
    samples: Vec<Sample>,
    index_of: HashMap<i64, usize>,
    children: HashMap<i64, Vec<usize>>,
    last_soma: Option<usize>,
    /// Neurites attached to another soma point than the soma root
    wrong_root: Vec<usize>,
}

impl<'a> SwcParser<'a> {
    pub(crate) fn new(uri: &str, options: &'a LoadOptions, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            uri: uri.to_string(),
            options,
            diagnostics,
            samples: Vec::new(),
            index_of: HashMap::new(),
            children: HashMap::new(),
            last_soma: None,
            wrong_root: Vec::new(),
        }
    }

    /// Parses all samples of `parser` into a morphology.
    pub(crate) fn parse<S: ByteSource>(mut self, parser: &mut ByteParser<S>) -> Result<MutableMorphology, MorphError> {
        self.read_samples(parser)?;
        self.validate()?;
        self.check_soma()?;
        self.check_reachable()?;
        self.build()
    }

    fn location(&self, line: usize) -> Location {
        Location::new(self.uri.clone(), line)
    }

    fn error(&self, kind: ParsingErrorType, line: usize) -> MorphError {
        ParsingError::new(kind, self.location(line)).into()
    }

    // ============================================================================
    // Reading
    // ============================================================================
    fn read_samples<S: ByteSource>(&mut self, parser: &mut ByteParser<S>) -> Result<(), MorphError> {
        loop {
            let line_number = parser.line();
            let Some(line) = parser.next_line() else { break };
            let content = match line.iter().position(|&b| b == b'#') {
                Some(comment) => &line[..comment],
                None => line,
            };
            let content = String::from_utf8_lossy(content);
            if content.trim().is_empty() {
                continue;
            }
            let sample = self.parse_sample(&content, line_number)?;
            if let Some(&first) = self.index_of.get(&sample.id) {
                let first = self.location(self.samples[first].line);
                return Err(self.error(ParsingErrorType::RepeatedId { id: sample.id, first }, line_number));
            }
            let index = self.samples.len();
            self.index_of.insert(sample.id, index);
            self.children.entry(sample.parent).or_default().push(index);
            if sample.is_soma() {
                self.last_soma = Some(index);
            }
            self.samples.push(sample);
        }
        trace!("Read {} SWC samples from {}", self.samples.len(), self.uri);
        Ok(())
    }

    /// Parses `id type x y z radius parent`, ignoring extra columns.
    fn parse_sample(&self, content: &str, line: usize) -> Result<Sample, MorphError> {
        let fields: Vec<&str> = content.split_whitespace().collect();
        if fields.len() < 7 {
            return Err(self.error(ParsingErrorType::MalformedRecord, line));
        }
        let malformed = || self.error(ParsingErrorType::MalformedRecord, line);
        let int = |s: &str| s.parse::<i64>().map_err(|_| malformed());
        let float = |s: &str| s.parse::<f64>().map_err(|_| malformed());

        let id = int(fields[0])?;
        let type_code = int(fields[1])?;
        let point = [float(fields[2])?, float(fields[3])?, float(fields[4])?];
        let radius = float(fields[5])?;
        let parent = int(fields[6])?;

        if id < 0 {
            return Err(self.error(ParsingErrorType::NegativeId(id), line));
        }
        if parent < NO_PARENT {
            return Err(self.error(ParsingErrorType::MissingParent { id, parent }, line));
        }
        let section_type = match SectionType::from_code(type_code) {
            Some(section_type) if type_code > 0 => section_type,
            _ => return Err(self.error(ParsingErrorType::UnsupportedSectionType(type_code), line)),
        };
        Ok(Sample { id, section_type, point, diameter: 2.0 * radius, parent, line })
    }

    // ============================================================================
    // Validation
    // ============================================================================
    fn parent_of(&self, index: usize) -> Option<usize> {
        self.index_of.get(&self.samples[index].parent).copied()
    }

    fn children_of(&self, index: usize) -> &[usize] {
        self.children.get(&self.samples[index].id).map(|c| c.as_slice()).unwrap_or(&[])
    }

    fn validate(&mut self) -> Result<(), MorphError> {
        for index in 0..self.samples.len() {
            let sample = &self.samples[index];
            let line = sample.line;
            if sample.parent == sample.id {
                return Err(self.error(ParsingErrorType::SelfParent, line));
            }
            if sample.parent != NO_PARENT && self.parent_of(index).is_none() {
                let kind = ParsingErrorType::MissingParent { id: sample.id, parent: sample.parent };
                return Err(self.error(kind, line));
            }
            if sample.is_soma() {
                self.check_soma_placement(index)?;
            }
            if self.samples[index].diameter < EPSILON {
                let warning = Warning::zero_diameter(self.location(line));
                self.diagnostics.emit(warning)?;
            }
        }
        Ok(())
    }

    fn check_soma_placement(&mut self, index: usize) -> Result<(), MorphError> {
        let Some(parent) = self.parent_of(index) else { return Ok(()) };
        let line = self.samples[index].line;
        let (soma_children, neurite_children): (Vec<usize>, Vec<usize>) =
            self.children_of(index).iter().copied().partition(|&c| self.samples[c].is_soma());
        self.wrong_root.extend(neurite_children);
        if soma_children.len() > 1 {
            let mut message = String::from("Found soma bifurcation\nThe following children have been found:");
            for child in soma_children {
                message.push_str(&format!("\n{}", self.location(self.samples[child].line)));
            }
            return Err(self.error(ParsingErrorType::SomaPlacement(message), line));
        }
        if !self.samples[parent].is_soma() {
            let message = "Found a soma point with a neurite as parent".to_string();
            return Err(self.error(ParsingErrorType::SomaPlacement(message), line));
        }
        Ok(())
    }

    fn check_soma(&mut self) -> Result<(), MorphError> {
        let roots = self.children.get(&NO_PARENT).cloned().unwrap_or_default();
        let somata: Vec<usize> = roots.iter().copied().filter(|&r| self.samples[r].is_soma()).collect();
        if somata.len() > 1 {
            let locations = somata.iter().map(|&s| self.location(self.samples[s].line)).collect();
            return Err(self.error(ParsingErrorType::MultipleSoma(locations), self.samples[somata[1]].line));
        }
        if somata.is_empty() {
            return self.diagnostics.emit(Warning::no_soma_found(&self.uri));
        }
        for root in roots.into_iter().filter(|&r| !self.samples[r].is_soma()) {
            let location = self.location(self.samples[root].line);
            self.diagnostics.emit(Warning::disconnected_neurite(location))?;
        }
        Ok(())
    }

    /// Samples in depth-first order from the roots, children in file order.
    fn depth_first_samples(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.samples.len());
        let mut stack: Vec<usize> = self.children.get(&NO_PARENT).cloned().unwrap_or_default();
        stack.reverse();
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.children_of(index).iter().rev());
        }
        order
    }

    /// Samples never reached from a root are part of a parent cycle.
    fn check_reachable(&self) -> Result<(), MorphError> {
        let order = self.depth_first_samples();
        if order.len() == self.samples.len() {
            return Ok(());
        }
        let mut reached = vec![false; self.samples.len()];
        for index in order {
            reached[index] = true;
        }
        match reached.iter().position(|r| !r) {
            Some(first) => {
                let sample = &self.samples[first];
                Err(self.error(ParsingErrorType::CyclicParent { id: sample.id }, sample.line))
            }
            None => Ok(()),
        }
    }

    // ============================================================================
    // Section building
    // ============================================================================
    /// Orphan neurite, or neurite attached to the soma.
    fn is_root_point(&self, index: usize) -> bool {
        let sample = &self.samples[index];
        !sample.is_soma()
            && match self.parent_of(index) {
                None => true,
                Some(parent) => self.samples[parent].is_soma(),
            }
    }

    /// Last soma point, leaf, or neurite bifurcation.
    fn is_section_end(&self, index: usize) -> bool {
        let children = self.children_of(index).len();
        Some(index) == self.last_soma || children == 0 || (children >= 2 && !self.samples[index].is_soma())
    }

    fn build(mut self) -> Result<MutableMorphology, MorphError> {
        let mut morph = MutableMorphology::new().with_uri(self.uri.clone());
        morph.set_soma_convention(SomaConvention::Samples);
        let mut section_of: HashMap<usize, SectionId> = HashMap::new();

        for index in self.depth_first_samples() {
            let sample = self.samples[index].clone();
            if sample.is_soma() {
                morph.soma_mut().point_level_mut().push(sample.point, sample.diameter, None);
                continue;
            }
            let root_point = self.is_root_point(index);
            if root_point && self.is_section_end(index) {
                // bifurcation right at the root point: its children become roots
                continue;
            }
            let parent = self.parent_of(index);
            let type_changed = parent.is_some_and(|p| {
                let parent = &self.samples[p];
                !parent.is_soma() && parent.section_type != sample.section_type && !self.is_section_end(p)
            });
            if type_changed {
                if !self.options.allow_type_change() {
                    return Err(self.error(ParsingErrorType::SectionTypeChanged, sample.line));
                }
                let warning = Warning::section_type_changed(self.location(sample.line));
                self.diagnostics.emit(warning)?;
            }

            let starts_section = root_point || type_changed || parent.is_some_and(|p| self.is_section_end(p));
            let section = match (starts_section, parent) {
                (false, Some(p)) => section_of.get(&p).copied(),
                _ => None,
            };
            let section = match section {
                Some(section) => section,
                None => {
                    let section = self.start_section(&mut morph, &section_of, index, root_point)?;
                    morph.section_mut(section)?.set_source_line(sample.line);
                    section
                }
            };
            section_of.insert(index, section);
            morph.section_mut(section)?.point_level_mut().push(sample.point, sample.diameter, None);
        }

        self.check_soma_layout(&morph)?;
        Ok(morph)
    }

    /// Creates the section starting at sample `index`, with the parent's
    /// point prepended if the sample does not repeat it.
    fn start_section(
        &self,
        morph: &mut MutableMorphology,
        section_of: &HashMap<usize, SectionId>,
        index: usize,
        root_point: bool,
    ) -> Result<SectionId, MorphError> {
        let sample = &self.samples[index];
        let mut level = PointLevel::default();
        let parent = if root_point { None } else { self.parent_of(index) };
        let Some(parent) = parent else {
            return Ok(morph.append_root_section(level, sample.section_type));
        };
        let parent_sample = &self.samples[parent];
        if sample.point != parent_sample.point {
            level.push(parent_sample.point, parent_sample.diameter, None);
        }
        match section_of.get(&parent) {
            Some(&parent_section) => morph.append_section(parent_section, level, sample.section_type),
            // parent is a skipped root point
            None => Ok(morph.append_root_section(level, sample.section_type)),
        }
    }

    /// Warnings specific to three point somata.
    fn check_soma_layout(&mut self, morph: &MutableMorphology) -> Result<(), MorphError> {
        if morph.soma().points().len() != 3 {
            return Ok(());
        }
        if !self.wrong_root.is_empty() {
            let lines: Vec<usize> = self.wrong_root.iter().map(|&i| self.samples[i].line).collect();
            self.diagnostics.emit(Warning::wrong_root_point(&self.uri, &lines))?;
        }
        let soma_root = self
            .children
            .get(&NO_PARENT)
            .and_then(|roots| roots.iter().copied().find(|&r| self.samples[r].is_soma()));
        let soma_children = soma_root
            .map(|r| self.children_of(r).iter().filter(|&&c| self.samples[c].is_soma()).count())
            .unwrap_or(0);
        let status = morph.soma().three_point_status();
        if soma_children == 2 && status != ThreePointStatus::Conform {
            let description = status.description().unwrap_or_default();
            self.diagnostics.emit(Warning::soma_non_conform(&self.uri, description))?;
        }
        Ok(())
    }
}
