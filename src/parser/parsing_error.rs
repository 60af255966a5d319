//! Error types for the SWC, Neurolucida and columnar readers.
//!
//! This module provides [ParsingError] and [ParsingErrorType] for representing
//! and reporting errors that abort reading a morphology.

use crate::diagnostics::Location;
use crate::model::CellFamily;
use thiserror::Error;

// =#========================================================================#=
// PARSING ERROR TYPE
// =#========================================================================#=
/// Error types that can occur while reading a morphology.
#[derive(Error, PartialEq, Debug, Clone)]
pub enum ParsingErrorType {
    #[error("Unable to parse this line")]
    MalformedRecord,
    #[error("Repeated ID: {id}\nID already appears here: \n{first}")]
    RepeatedId { id: i64, first: Location },
    #[error("Negative ID: {0}")]
    NegativeId(i64),
    #[error("Parent ID can not be itself")]
    SelfParent,
    #[error("Sample id: {id} refers to non-existant parent ID: {parent}")]
    MissingParent { id: i64, parent: i64 },
    #[error("Sample id: {id} is part of a parent cycle and can not be reached from a root")]
    CyclicParent { id: i64 },
    #[error("Unsupported section type: {0}")]
    UnsupportedSectionType(i64),
    #[error("Unsupported section type: {section_type} in a {family} morphology")]
    SectionTypeForFamily { section_type: i64, family: CellFamily },
    #[error("{0}")]
    SomaPlacement(String),
    #[error("Multiple somata found: {}", join_locations(.0))]
    MultipleSoma(Vec<Location>),
    #[error("A soma is already defined, first defined here: \n{0}")]
    SomaAlreadyDefined(Location),
    #[error("Type changed within section, without bifurcation")]
    SectionTypeChanged,
    #[error("{0}")]
    TruncatedInput(String),
    #[error("Unexpected token: {0}")]
    UnknownToken(String),
    #[error("Unexpected token\nExpected: {expected} but got {got} {message}")]
    UnexpectedToken { expected: String, got: String, message: String },
    #[error("Error converting: \"{0}\" to float")]
    InvalidNumber(String),
    #[error("{0}")]
    UnsupportedVersion(String),
    #[error("{0}")]
    InvalidContainer(String),
}

fn join_locations(locations: &[Location]) -> String {
    locations.iter().map(|l| format!("\n{l}")).collect()
}

// =#========================================================================#=
// PARSING ERROR
// =#========================================================================#=
/// Parsing error with its location in the input.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{location}:error\n{kind}")]
pub struct ParsingError {
    kind: ParsingErrorType,
    location: Location,
}

impl ParsingError {
    /// Create a ParsingError from an error type and location
    pub fn new(kind: ParsingErrorType, location: Location) -> Self {
        Self { kind, location }
    }

    /// Convenience constructor for MalformedRecord
    pub fn malformed_record(location: Location) -> Self {
        Self::new(ParsingErrorType::MalformedRecord, location)
    }

    /// Convenience constructor for TruncatedInput
    pub fn truncated_input<S: Into<String>>(location: Location, msg: S) -> Self {
        Self::new(ParsingErrorType::TruncatedInput(msg.into()), location)
    }

    /// Convenience constructor for UnknownToken
    pub fn unknown_token<S: Into<String>>(location: Location, token: S) -> Self {
        Self::new(ParsingErrorType::UnknownToken(token.into()), location)
    }

    /// Convenience constructor for UnsupportedSectionType
    pub fn unsupported_section_type(location: Location, section_type: i64) -> Self {
        Self::new(ParsingErrorType::UnsupportedSectionType(section_type), location)
    }

    /// Convenience constructor for SomaPlacement
    pub fn soma_placement<S: Into<String>>(location: Location, msg: S) -> Self {
        Self::new(ParsingErrorType::SomaPlacement(msg.into()), location)
    }

    /// Convenience constructor for InvalidContainer
    pub fn invalid_container<S: Into<String>>(location: Location, msg: S) -> Self {
        Self::new(ParsingErrorType::InvalidContainer(msg.into()), location)
    }

    /// Get the error kind
    pub fn kind(&self) -> &ParsingErrorType {
        &self.kind
    }

    /// Get the location where the error occurred
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Line of the error, if the input has lines
    pub fn line(&self) -> Option<usize> {
        self.location.line()
    }
}
