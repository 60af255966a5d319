//! Crate-wide error type.
//!
//! [MorphError] is what every fallible operation of this crate returns:
//! reading ([ParsingError]), writing ([WriteError]), warnings promoted by a
//! [WarningPolicy](crate::diagnostics::WarningPolicy), and invalid accesses
//! into a morphology.

use crate::diagnostics::Warning;
use crate::parser::ParsingError;
use thiserror::Error;

// =#========================================================================#=
// WRITE ERROR
// =#========================================================================#=
/// Violated precondition of a writer. No file is produced in that case.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WriteError {
    #[error(
        "Section {parent} has a single child section. Single child section are not allowed when \
         writing to SWC format. Please sanitize the morphology first.\n\
         Tip: you can use 'remove_unifurcations()'"
    )]
    OnlyChild { parent: usize },
    #[error("Cannot write a file with perimeter data to {format} format")]
    PerimeterData { format: &'static str },
    #[error(
        "This cell has {organelle}, which cannot be saved in {format} format. \
         Please use the columnar format if you want to save them."
    )]
    OrganelleData { organelle: &'static str, format: &'static str },
    #[error(
        "Attempted to write unsupported section type: {section_type}.\n\
         Please try writing to a different format that supports the section type."
    )]
    UnsupportedSectionType { section_type: u8 },
    #[error("Single point soma must have one point")]
    InvalidSinglePointSoma,
    #[error("Three point soma must have exactly three points")]
    InvalidThreePointSoma,
    #[error("A single point soma without diameter can not be written")]
    SomaWithoutDiameter,
    #[error(
        "Section {section} does not start at the last point of its parent section {parent}.\n\
         Each section must start with a copy of its parent's last point."
    )]
    DisconnectedSection { section: usize, parent: usize },
    #[error(
        "Section {section} has no perimeter data while other sections have. \
         Either all sections or none must carry perimeters."
    )]
    MixedPerimeterData { section: usize },
    #[error("{}", length_mismatch(.first, .first_len, .second, .second_len))]
    LengthMismatch { first: &'static str, first_len: usize, second: &'static str, second_len: usize },
}

fn length_mismatch(first: &str, first_len: &usize, second: &str, second_len: &usize) -> String {
    let (first_len, second_len) = (*first_len, *second_len);
    let mut msg = format!("Vector length mismatch: \nLength {first}: {first_len}\nLength {second}: {second_len}");
    if first_len == 0 || second_len == 0 {
        let empty = if first_len == 0 { first } else { second };
        msg.push_str(&format!("\nTip: Did you forget to fill vector: {empty} ?"));
    }
    msg
}

// =#========================================================================#=
// MORPH ERROR
// =#========================================================================#=
/// Any error surfaced by this crate.
#[derive(Error, Debug)]
pub enum MorphError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("{0}")]
    RaisedWarning(Warning),
    #[error("Section {0} does not exist in this morphology")]
    UnknownSection(usize),
    #[error("Mitochondrial parent section: {0} does not exist.")]
    UnknownMitoSection(usize),
    #[error("{0}")]
    InvalidPointLevel(String),
    #[error("{0}")]
    Soma(String),
    #[error("{0}")]
    Collection(String),
    #[error("Filename: {0} must have one of the following extensions: swc, asc or h5")]
    UnsupportedExtension(String),
    #[error("IO error - {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid options - {0}")]
    Json(#[from] serde_json::Error),
}

impl MorphError {
    /// Returns the parsing error, if this is one.
    pub fn as_parsing(&self) -> Option<&ParsingError> {
        match self {
            MorphError::Parsing(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_tip() {
        let err = WriteError::LengthMismatch { first: "points", first_len: 3, second: "perimeters", second_len: 0 };
        assert_eq!(
            err.to_string(),
            "Vector length mismatch: \nLength points: 3\nLength perimeters: 0\nTip: Did you forget to fill vector: perimeters ?"
        );
    }

    #[test]
    fn test_only_child_tip() {
        let err = WriteError::OnlyChild { parent: 4 };
        assert!(err.to_string().starts_with("Section 4 has a single child section."));
        assert!(err.to_string().contains("remove_unifurcations()"));
    }
}
