//! Dotted path resolution (`child.parent`, `items[2].name`, `node->next`).
//!
//! Each segment resolves exactly one hop from the value reached so far;
//! handles are only created along the requested path.

use tracing::trace;

use super::ValueHandle;
use crate::error::{FormatterError, Result};
use crate::types::TypeKind;

/// Fallback levels a single member lookup may descend.
const MAX_LOOKUP_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep
{
    Member(String),
    Index(usize),
}

fn parse_path(path: &str) -> Result<Vec<PathStep>>
{
    let invalid = |reason: &str| FormatterError::InvalidArgument(format!("invalid value path `{path}`: {reason}"));

    let mut steps = Vec::new();
    let mut rest = path.trim();
    let mut expect_member = true;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("->").or_else(|| rest.strip_prefix('.')) {
            if expect_member && !steps.is_empty() {
                return Err(invalid("empty member name"));
            }
            rest = after;
            expect_member = true;
            continue;
        }
        if let Some(after) = rest.strip_prefix('[') {
            let close = after.find(']').ok_or_else(|| invalid("unterminated `[`"))?;
            let index = after[..close]
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid("index is not a non-negative integer"))?;
            steps.push(PathStep::Index(index));
            rest = &after[close + 1..];
            expect_member = false;
            continue;
        }
        if !expect_member {
            return Err(invalid("expected `.`, `->` or `[` between segments"));
        }
        let end = rest.find(['.', '[', '-']).unwrap_or(rest.len());
        let member = rest[..end].trim();
        if member.is_empty() {
            return Err(invalid("empty member name"));
        }
        if member.starts_with('*') || member.starts_with('&') {
            return Err(invalid("dereference and address-of are not supported"));
        }
        steps.push(PathStep::Member(member.to_string()));
        rest = &rest[end..];
        expect_member = false;
    }
    if expect_member && !steps.is_empty() {
        return Err(invalid("trailing separator"));
    }
    Ok(steps)
}

impl ValueHandle
{
    /// Resolve a path relative to this value.
    ///
    /// Members are separated by `.` or `->`; `[n]` selects a child by index.
    /// Member lookup continues through base classes, an atomic's wrapped
    /// value, and pointers, one hop at a time.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: the path does not parse
    /// - `NoSuchMember`: a segment names no child
    /// - `IndexOutOfRange`: an index is past the end
    pub fn value_for_path(&self, path: &str) -> Result<ValueHandle>
    {
        let mut current = self.clone();
        for step in parse_path(path)? {
            current = match step {
                PathStep::Member(name) => current.child_by_name(&name)?,
                PathStep::Index(index) => current.child_at_index(index)?,
            };
        }
        trace!(root = %self.name(), path, resolved = %current.path_expression(), "resolved value path");
        Ok(current)
    }

    /// The child called `name`.
    ///
    /// Lookup falls back to base classes, the synthetic value and the pointee,
    /// but crosses at most one pointer and [`MAX_LOOKUP_DEPTH`] levels, so a
    /// type that points back at itself fails instead of recursing.
    ///
    /// ## Errors
    ///
    /// Returns `NoSuchMember` if neither this value, its base classes, its
    /// synthetic value nor its pointee has such a member.
    pub fn child_by_name(&self, name: &str) -> Result<ValueHandle>
    {
        self.find_child(name, 0, false).ok_or_else(|| FormatterError::NoSuchMember {
            value: self.path_expression(),
            member: name.to_string(),
        })
    }

    fn find_child(&self, name: &str, depth: usize, crossed_pointer: bool) -> Option<ValueHandle>
    {
        if let Some(index) = self.index_of_child(name) {
            return self.child_at_index(index).ok();
        }
        if depth >= MAX_LOOKUP_DEPTH {
            return None;
        }

        if !self.is_synthetic() {
            let ty = self.value_type();
            let ty = ty.canonical();
            if matches!(ty.kind(), TypeKind::Aggregate(_)) {
                for (index, field) in ty.fields().iter().enumerate() {
                    if !field.is_base {
                        continue;
                    }
                    let found = self
                        .child_at_index(index)
                        .ok()
                        .and_then(|base| base.find_child(name, depth + 1, crossed_pointer));
                    if found.is_some() {
                        return found;
                    }
                }
            }
        }

        if let Some(value) = self.synthetic_value() {
            if let Some(found) = value.find_child(name, depth + 1, crossed_pointer) {
                return Some(found);
            }
        }

        if !crossed_pointer && self.value_type().is_pointer() {
            let pointee = if !self.is_synthetic() && self.num_children() == 1 {
                self.child_at_index(0)
            } else {
                self.dereference()
            };
            return pointee.ok()?.find_child(name, depth + 1, true);
        }
        None
    }
}
