//! Type-name normalisation and template parsing.
//!
//! Debug info, user input and formatter patterns spell the same type in
//! different ways (`Parent*` vs `Parent *`, `vector<int> >` vs
//! `vector<int>>`, `struct S` vs `S`). Everything that compares type names
//! goes through [`normalize_type_name`] first.

use crate::error::{FormatterError, Result};
use crate::types::Qualifiers;

const ELABORATED_KEYWORDS: &[&str] = &["struct ", "class ", "union ", "enum "];

/// Canonical spelling of a type name.
///
/// ```rust
/// use prism_core::types::name::normalize_type_name;
///
/// assert_eq!(normalize_type_name("struct  std::atomic< Parent* >"), "std::atomic<Parent *>");
/// assert_eq!(normalize_type_name("std::pair<int,int>"), "std::pair<int, int>");
/// ```
pub fn normalize_type_name(name: &str) -> String
{
    let mut trimmed = name.trim();
    for keyword in ELABORATED_KEYWORDS {
        if let Some(rest) = trimmed.strip_prefix(keyword) {
            trimmed = rest.trim_start();
        }
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut pending_space = false;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        match ch {
            '>' | ',' | ')' | ']' => {}
            '*' | '&' => {
                let last = out.chars().last();
                if !matches!(last, None | Some('*' | '&' | '(' | '<')) {
                    out.push(' ');
                }
            }
            _ => {
                let last = out.chars().last();
                if pending_space && !matches!(last, None | Some('<' | '(' | '[')) {
                    out.push(' ');
                }
            }
        }
        pending_space = false;
        out.push(ch);
        if ch == ',' {
            pending_space = true;
        }
    }
    out
}

/// Split top-level cv-qualifiers off a normalized name.
///
/// Handles both `const T` and `T const`. A `*` binds tighter than a trailing
/// qualifier, so `Parent * const` is a const pointer.
pub fn strip_cv(name: &str) -> (Qualifiers, &str)
{
    let mut qualifiers = Qualifiers::default();
    let mut rest = name.trim();
    loop {
        if let Some(stripped) = rest.strip_prefix("const ") {
            qualifiers.is_const = true;
            rest = stripped.trim_start();
        } else if let Some(stripped) = rest.strip_prefix("volatile ") {
            qualifiers.is_volatile = true;
            rest = stripped.trim_start();
        } else if let Some(stripped) = rest.strip_suffix(" const") {
            qualifiers.is_const = true;
            rest = stripped.trim_end();
        } else if let Some(stripped) = rest.strip_suffix(" volatile") {
            qualifiers.is_volatile = true;
            rest = stripped.trim_end();
        } else {
            return (qualifiers, rest);
        }
    }
}

/// A type name split into its template base and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTypeName
{
    /// Everything before the outermost trailing `<...>`
    pub base: String,
    /// Top-level template arguments, normalized
    pub args: Vec<String>,
}

impl ParsedTypeName
{
    pub fn is_template(&self) -> bool
    {
        !self.args.is_empty()
    }
}

/// Parse `ns::tmpl<A, B<C>>` into base `ns::tmpl` and arguments `[A, B<C>]`.
///
/// Names that only contain templates in a qualifier (`Outer<int>::Inner`)
/// parse as non-template names.
///
/// ## Errors
///
/// Returns [`FormatterError::MalformedTemplateArgs`] when brackets are
/// unbalanced or an argument is empty (`atomic<>`, `pair<int,>`).
pub fn parse_type_name(name: &str) -> Result<ParsedTypeName>
{
    let normalized = normalize_type_name(name);
    let malformed = || FormatterError::MalformedTemplateArgs(normalized.clone());

    let mut depth = 0i32;
    for ch in normalized.chars() {
        match ch {
            '<' | '(' => depth += 1,
            '>' | ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(malformed());
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(malformed());
    }

    if !normalized.ends_with('>') {
        return Ok(ParsedTypeName {
            base: normalized.clone(),
            args: Vec::new(),
        });
    }

    // Walk back to the '<' that opens the trailing argument list.
    let bytes = normalized.as_bytes();
    let mut depth = 0i32;
    let mut open = None;
    for (index, byte) in bytes.iter().enumerate().rev() {
        match byte {
            b'>' | b')' => depth += 1,
            b'<' | b'(' => {
                depth -= 1;
                if depth == 0 {
                    open = Some(index);
                    break;
                }
            }
            _ => {}
        }
    }
    let open = open.ok_or_else(malformed)?;
    let base = normalized[..open].trim();
    if base.is_empty() {
        return Err(malformed());
    }

    let inner = &normalized[open + 1..normalized.len() - 1];
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (index, ch) in inner.char_indices() {
        match ch {
            '<' | '(' => depth += 1,
            '>' | ')' => depth -= 1,
            ',' if depth == 0 => {
                args.push(inner[start..index].trim().to_string());
                start = index + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim().to_string());
    if args.iter().any(String::is_empty) {
        return Err(malformed());
    }

    Ok(ParsedTypeName {
        base: base.to_string(),
        args,
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_normalize_spacing()
    {
        assert_eq!(normalize_type_name("Parent*"), "Parent *");
        assert_eq!(normalize_type_name("Parent  **"), "Parent **");
        assert_eq!(normalize_type_name("std::vector<std::vector<int> >"), "std::vector<std::vector<int>>");
        assert_eq!(normalize_type_name("class Foo"), "Foo");
        assert_eq!(normalize_type_name("unsigned   int"), "unsigned int");
    }

    #[test]
    fn test_strip_cv()
    {
        let (q, rest) = strip_cv("const volatile int");
        assert!(q.is_const && q.is_volatile);
        assert_eq!(rest, "int");

        let (q, rest) = strip_cv("Parent * const");
        assert!(q.is_const);
        assert_eq!(rest, "Parent *");

        let (q, rest) = strip_cv("int");
        assert_eq!(q, Qualifiers::default());
        assert_eq!(rest, "int");
    }

    #[test]
    fn test_parse_template()
    {
        let parsed = parse_type_name("std::__1::atomic<Parent *>").unwrap();
        assert_eq!(parsed.base, "std::__1::atomic");
        assert_eq!(parsed.args, vec!["Parent *".to_string()]);

        let nested = parse_type_name("std::map<int, std::pair<int, int>>").unwrap();
        assert_eq!(nested.base, "std::map");
        assert_eq!(nested.args, vec!["int".to_string(), "std::pair<int, int>".to_string()]);
    }

    #[test]
    fn test_parse_non_template()
    {
        let parsed = parse_type_name("Outer<int>::Inner").unwrap();
        assert_eq!(parsed.base, "Outer<int>::Inner");
        assert!(!parsed.is_template());
    }

    #[test]
    fn test_parse_malformed()
    {
        assert!(matches!(
            parse_type_name("std::atomic<int"),
            Err(FormatterError::MalformedTemplateArgs(_))
        ));
        assert!(matches!(parse_type_name("std::atomic<>"), Err(FormatterError::MalformedTemplateArgs(_))));
        assert!(matches!(
            parse_type_name("std::pair<int,>"),
            Err(FormatterError::MalformedTemplateArgs(_))
        ));
        assert!(matches!(parse_type_name("int>"), Err(FormatterError::MalformedTemplateArgs(_))));
    }
}
