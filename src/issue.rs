//! Non-fatal format conditions observed during conversion.
//!
//! A structurally valid document can still carry markup this crate does not
//! model (unsupported elements, stray attributes, malformed optional fields).
//! These are not errors: conversion continues and the conditions are reported
//! back to the caller as [`Issue`] records. Anything citation- or
//! reference-related is load-bearing and raises [`crate::Error`] instead.

use std::fmt;

/// The kind of condition observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// An element this crate does not model, skipped with its content.
    UnsupportedElement { tag: String, parent: Option<String> },
    /// An attribute that is not part of the supported JATS subset.
    UnsupportedAttribute { tag: String, attribute: String },
    /// An attribute with a value outside the supported set.
    UnsupportedAttributeValue {
        tag: String,
        attribute: String,
        value: String,
    },
    /// Text content found where only elements are allowed, dropped.
    IgnoredText { parent: String },
    /// A required element carried no usable content.
    MissingContent { tag: String },
    /// More instances of an element than the content model allows.
    ExcessElement { tag: String },
    /// A contrib-id that does not parse as an ORCID URL.
    InvalidOrcid { value: String },
    /// A DOI that does not start with the "10." directory indicator.
    InvalidDoi { value: String },
    /// A PMID that is not an integer.
    InvalidPmid { value: String },
    /// Integer content that failed to parse (edition, year, month).
    InvalidInteger { tag: String, value: String },
    /// A citation group separated by punctuation outside the known set.
    UnknownCitationSeparator { text: String },
    /// A citation's rendered number disagreed with the resolved number.
    RenumberedCitation { key: String, from: u32, to: u32 },
}

/// A single observed condition with its source location, when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    /// 1-based line in the source XML, if the condition was seen at parse time.
    pub line: Option<u64>,
}

impl Issue {
    pub fn new(kind: IssueKind) -> Self {
        Issue { kind, line: None }
    }

    pub fn at(kind: IssueKind, line: Option<u64>) -> Self {
        Issue { kind, line }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::UnsupportedElement { tag, parent } => match parent {
                Some(p) => write!(f, "unsupported element <{tag}> under <{p}>"),
                None => write!(f, "unsupported element <{tag}>"),
            },
            IssueKind::UnsupportedAttribute { tag, attribute } => {
                write!(f, "unsupported attribute <{tag} {attribute}>")
            }
            IssueKind::UnsupportedAttributeValue {
                tag,
                attribute,
                value,
            } => write!(f, "unsupported value <{tag} {attribute}={value:?}>"),
            IssueKind::IgnoredText { parent } => {
                write!(f, "ignored text inside <{parent}>")
            }
            IssueKind::MissingContent { tag } => write!(f, "missing content in <{tag}>"),
            IssueKind::ExcessElement { tag } => write!(f, "excess element <{tag}>"),
            IssueKind::InvalidOrcid { value } => write!(f, "invalid ORCID {value:?}"),
            IssueKind::InvalidDoi { value } => write!(f, "invalid DOI {value:?}"),
            IssueKind::InvalidPmid { value } => write!(f, "invalid PMID {value:?}"),
            IssueKind::InvalidInteger { tag, value } => {
                write!(f, "invalid integer in <{tag}>: {value:?}")
            }
            IssueKind::UnknownCitationSeparator { text } => {
                write!(f, "unknown citation separator {text:?}")
            }
            IssueKind::RenumberedCitation { key, from, to } => {
                write!(f, "citation {key:?} renumbered {from} -> {to}")
            }
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {line})", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Running collection of issues for one conversion.
#[derive(Debug, Default)]
pub struct IssueLog {
    issues: Vec<Issue>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn record(&mut self, kind: IssueKind) {
        self.issues.push(Issue::new(kind));
    }

    pub fn record_at(&mut self, kind: IssueKind, line: Option<u64>) {
        self.issues.push(Issue::at(kind, line));
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter()
    }

    /// Consume the log and return the collected issues.
    pub fn into_vec(self) -> Vec<Issue> {
        self.issues
    }
}
