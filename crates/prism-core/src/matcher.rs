//! # Type Matcher
//!
//! Decides whether a value's type name fits a formatter's [`TypePattern`].
//!
//! ## Pattern Kinds
//!
//! - **Exact**: the normalized name must be identical (`Parent`, `std::string`)
//! - **Regex**: an anchored regular expression over the normalized name
//! - **Template**: a base name (exact or regex) plus an arity and optional
//!   per-argument constraints, e.g. "`std::atomic` with one pointer argument"
//!
//! ## Declining
//!
//! Template patterns parse the candidate name. If its argument list is
//! malformed or partially specified (`atomic<int`, `atomic<>`) the matcher
//! returns [`MatchOutcome::Declined`] instead of an error, and the registry
//! moves on to the next entry.
//!
//! ## Candidate Names
//!
//! A value is matched under up to four names, in order: the dynamic type as
//! written, the dynamic type with typedefs and cv-qualifiers stripped, then
//! the same two for the static type. See [`candidate_names`].

use std::fmt;

use regex::Regex;
use smallvec::SmallVec;
use tracing::warn;

use crate::error::{FormatterError, Result};
use crate::types::name::strip_cv;
use crate::types::{normalize_type_name, parse_type_name, TypeDescriptor};

/// Result of testing one name against one pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome
{
    Matched,
    NoMatch,
    /// The name could not be evaluated (malformed template arguments)
    Declined,
}

/// How the template base of a [`TypePattern::Template`] is compared.
#[derive(Debug, Clone)]
pub enum BaseMatcher
{
    Exact(String),
    Regex(Regex),
}

impl BaseMatcher
{
    fn is_match(&self, base: &str) -> bool
    {
        match self {
            BaseMatcher::Exact(expected) => expected == base,
            BaseMatcher::Regex(regex) => regex.is_match(base),
        }
    }
}

/// Constraint on a single template argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgConstraint
{
    Any,
    /// Argument must equal this (normalized) name
    Exact(String),
    /// Argument must be a pointer type
    Pointer,
    /// Argument must not be a pointer type
    NonPointer,
}

impl ArgConstraint
{
    fn is_satisfied_by(&self, arg: &str) -> bool
    {
        let (_, unqualified) = strip_cv(arg);
        match self {
            ArgConstraint::Any => true,
            ArgConstraint::Exact(expected) => expected == arg,
            ArgConstraint::Pointer => unqualified.ends_with('*'),
            ArgConstraint::NonPointer => !unqualified.ends_with('*'),
        }
    }
}

/// A type-name pattern a formatter is registered under.
///
/// ## Example
///
/// ```rust
/// use prism_core::matcher::{ArgConstraint, MatchOutcome, TypePattern};
///
/// let pattern = TypePattern::template("std::atomic", 1).with_arg(0, ArgConstraint::Pointer);
/// assert_eq!(pattern.matches("std::atomic<Parent*>"), MatchOutcome::Matched);
/// assert_eq!(pattern.matches("std::atomic<int>"), MatchOutcome::NoMatch);
/// assert_eq!(pattern.matches("std::atomic<>"), MatchOutcome::Declined);
/// ```
#[derive(Debug, Clone)]
pub enum TypePattern
{
    Exact(String),
    Regex(Regex),
    Template
    {
        base: BaseMatcher,
        /// Required number of template arguments
        arity: usize,
        /// One constraint per argument (missing entries mean `Any`)
        args: Vec<ArgConstraint>,
    },
}

impl TypePattern
{
    /// Match one type name exactly (after normalization).
    #[must_use]
    pub fn exact(name: &str) -> Self
    {
        TypePattern::Exact(normalize_type_name(name))
    }

    /// Match names against an anchored regular expression.
    ///
    /// ## Errors
    ///
    /// Returns `InvalidPattern` if the expression does not compile.
    pub fn regex(pattern: &str) -> Result<Self>
    {
        compile_anchored(pattern).map(TypePattern::Regex)
    }

    /// Match instantiations of the template `base` with `arity` arguments.
    #[must_use]
    pub fn template(base: &str, arity: usize) -> Self
    {
        TypePattern::Template {
            base: BaseMatcher::Exact(normalize_type_name(base)),
            arity,
            args: Vec::new(),
        }
    }

    /// Like [`Self::template`], with the base given as a regular expression
    /// (`std::__[[:alnum:]]+::atomic`).
    ///
    /// ## Errors
    ///
    /// Returns `InvalidPattern` if the expression does not compile.
    pub fn template_regex(base: &str, arity: usize) -> Result<Self>
    {
        Ok(TypePattern::Template {
            base: BaseMatcher::Regex(compile_anchored(base)?),
            arity,
            args: Vec::new(),
        })
    }

    /// Constrain template argument `index`. Ignored for non-template patterns.
    #[must_use]
    pub fn with_arg(mut self, index: usize, constraint: ArgConstraint) -> Self
    {
        if let TypePattern::Template { args, .. } = &mut self {
            if args.len() <= index {
                args.resize(index + 1, ArgConstraint::Any);
            }
            args[index] = match constraint {
                ArgConstraint::Exact(name) => ArgConstraint::Exact(normalize_type_name(&name)),
                other => other,
            };
        }
        self
    }

    /// Test a single type name.
    pub fn matches(&self, type_name: &str) -> MatchOutcome
    {
        match self {
            TypePattern::Exact(expected) => {
                if *expected == normalize_type_name(type_name) {
                    MatchOutcome::Matched
                } else {
                    MatchOutcome::NoMatch
                }
            }
            TypePattern::Regex(regex) => {
                if regex.is_match(&normalize_type_name(type_name)) {
                    MatchOutcome::Matched
                } else {
                    MatchOutcome::NoMatch
                }
            }
            TypePattern::Template { base, arity, args } => {
                let parsed = match parse_type_name(type_name) {
                    Ok(parsed) => parsed,
                    Err(FormatterError::MalformedTemplateArgs(name)) => {
                        warn!(type_name = %name, pattern = %self, "declining malformed template arguments");
                        return MatchOutcome::Declined;
                    }
                    Err(_) => return MatchOutcome::Declined,
                };
                if !parsed.is_template() || !base.is_match(&parsed.base) {
                    return MatchOutcome::NoMatch;
                }
                if parsed.args.len() != *arity {
                    return MatchOutcome::NoMatch;
                }
                let satisfied = args
                    .iter()
                    .zip(&parsed.args)
                    .all(|(constraint, arg)| constraint.is_satisfied_by(arg));
                if satisfied {
                    MatchOutcome::Matched
                } else {
                    MatchOutcome::NoMatch
                }
            }
        }
    }
}

impl fmt::Display for TypePattern
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            TypePattern::Exact(name) => write!(f, "{name}"),
            TypePattern::Regex(regex) => write!(f, "/{}/", regex.as_str()),
            TypePattern::Template { base, arity, .. } => {
                match base {
                    BaseMatcher::Exact(name) => write!(f, "{name}")?,
                    BaseMatcher::Regex(regex) => write!(f, "/{}/", regex.as_str())?,
                }
                write!(f, "<")?;
                for index in 0..*arity {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "_")?;
                }
                write!(f, ">")
            }
        }
    }
}

fn compile_anchored(pattern: &str) -> Result<Regex>
{
    Regex::new(&format!("^(?:{pattern})$")).map_err(|err| FormatterError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

/// Names to try, most specific first.
///
/// `dynamic` (if any) comes before `ty`; each contributes its name as written
/// and its canonical name when that differs. Duplicates are removed.
pub fn candidate_names(dynamic: Option<&TypeDescriptor>, ty: &TypeDescriptor) -> SmallVec<[String; 4]>
{
    let mut names: SmallVec<[String; 4]> = SmallVec::new();
    let mut push = |name: &str| {
        let normalized = normalize_type_name(name);
        let name = strip_cv(&normalized).1.to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    };
    for ty in dynamic.into_iter().chain(std::iter::once(ty)) {
        push(ty.name());
        push(ty.canonical().name());
    }
    names
}
