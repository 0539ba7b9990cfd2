//! # Textual Rendering
//!
//! Turns a [`ValueHandle`] into the text a `frame variable` style command
//! prints.
//!
//! ## Format
//!
//! Multi-line (default):
//!
//! ```text
//! (Parent) p = {
//!   child = {
//!     parent = {
//!       Value = 0x00007ffc0000a000
//!     }
//!   }
//! }
//! ```
//!
//! One-line: `(S) s = { x = 1, y = 2 }`.
//!
//! - scalars print their literal: `Value = 5`, `flag = true`, `c = 'a'`
//! - pointers print their address as `0x` plus 16 hex digits and are only
//!   followed while the pointer depth allows
//! - a summary, when present, precedes the children: `i = 5 {`
//! - unreadable values print `<unreadable: ...>`; siblings still render
//!
//! Rendering walks at most `max_depth` levels and only ever asks each value
//! for its own children, so self-referential structures terminate.

use std::fmt::Write as _;

use crate::settings::DisplaySettings;
use crate::value::ValueHandle;

const INDENT: &str = "  ";

/// Rendering knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions
{
    /// Pointer levels to follow (0 = print addresses only)
    pub ptr_depth: usize,
    /// Levels below the root to expand
    pub max_depth: usize,
    /// `{ a = 1, b = 2 }` instead of one child per line
    pub one_line: bool,
    /// Prefix the root with `(type)`
    pub show_types: bool,
}

impl Default for RenderOptions
{
    fn default() -> Self
    {
        Self::from_settings(&DisplaySettings::default())
    }
}

impl RenderOptions
{
    #[must_use]
    pub fn from_settings(settings: &DisplaySettings) -> Self
    {
        Self {
            ptr_depth: settings.ptr_depth,
            max_depth: settings.max_depth,
            one_line: false,
            show_types: true,
        }
    }

    #[must_use]
    pub fn one_line(mut self) -> Self
    {
        self.one_line = true;
        self
    }

    #[must_use]
    pub fn without_types(mut self) -> Self
    {
        self.show_types = false;
        self
    }
}

/// Render `value` under its path expression, followed by a newline.
pub fn render(value: &ValueHandle, options: &RenderOptions) -> String
{
    render_as(value, &value.path_expression(), options)
}

/// Render `value` under an explicit label.
pub fn render_as(value: &ValueHandle, label: &str, options: &RenderOptions) -> String
{
    let mut out = String::new();
    if options.show_types {
        let _ = write!(out, "({}) ", value.type_name());
    }
    let _ = write!(out, "{label} = ");
    Renderer { options }.write_body(&mut out, value, 0, options.ptr_depth, 0);
    out.push('\n');
    out
}

struct Renderer<'a>
{
    options: &'a RenderOptions,
}

impl Renderer<'_>
{
    fn write_body(&self, out: &mut String, value: &ValueHandle, depth: usize, ptr_budget: usize, indent: usize)
    {
        let ty = value.value_type();
        let raw_pointer = ty.is_pointer() && !value.is_synthetic();

        let mut head = Vec::new();
        if ty.is_scalar() || ty.is_pointer() {
            match value.scalar() {
                Ok(scalar) => head.push(scalar.to_string()),
                Err(err) => {
                    let _ = write!(out, "<{err}>");
                    return;
                }
            }
        }
        let expand = if raw_pointer {
            ptr_budget > 0 && value.num_children() > 0
        } else {
            value.num_children() > 0
        };
        // Children first: the summary is composed from their cached bytes.
        let body = (expand && depth < self.options.max_depth)
            .then(|| self.children_text(value, raw_pointer, depth, ptr_budget, indent));
        if let Some(summary) = value.summary() {
            head.push(summary);
        }
        let head = head.join(" ");

        if !expand {
            if head.is_empty() {
                out.push_str(if ty.is_aggregate() || value.is_synthetic() { "{}" } else { "<no value>" });
            } else {
                out.push_str(&head);
            }
            return;
        }
        if !head.is_empty() {
            out.push_str(&head);
            out.push(' ');
        }
        out.push_str(body.as_deref().unwrap_or("{...}"));
    }

    fn children_text(&self, value: &ValueHandle, raw_pointer: bool, depth: usize, ptr_budget: usize, indent: usize)
        -> String
    {
        let children = self.children_to_show(value, raw_pointer);
        let ptr_budget = if raw_pointer { ptr_budget - 1 } else { ptr_budget };

        let mut out = String::new();
        if self.options.one_line {
            out.push_str("{ ");
            for (position, child) in children.iter().enumerate() {
                if position > 0 {
                    out.push_str(", ");
                }
                self.write_child(&mut out, child, depth, ptr_budget, indent);
            }
            out.push_str(" }");
        } else {
            out.push_str("{\n");
            for child in &children {
                push_indent(&mut out, indent + 1);
                self.write_child(&mut out, child, depth, ptr_budget, indent + 1);
                out.push('\n');
            }
            push_indent(&mut out, indent);
            out.push('}');
        }
        out
    }

    fn write_child(
        &self,
        out: &mut String,
        child: &Result<ValueHandle, (usize, String)>,
        depth: usize,
        ptr_budget: usize,
        indent: usize,
    )
    {
        match child {
            Ok(child) => {
                let _ = write!(out, "{} = ", child.name());
                self.write_body(out, child, depth + 1, ptr_budget, indent);
            }
            Err((index, err)) => {
                let _ = write!(out, "[{index}] = <{err}>");
            }
        }
    }

    /// Children of `value`, or of its pointee when `value` is a raw pointer
    /// to an aggregate (`ptr = 0x... { x = 1 }`).
    fn children_to_show(&self, value: &ValueHandle, raw_pointer: bool) -> Vec<Result<ValueHandle, (usize, String)>>
    {
        let mut source = value.clone();
        if raw_pointer {
            if let Ok(pointee) = value.child_at_index(0) {
                if pointee.value_type().is_aggregate() {
                    source = pointee;
                }
            }
        }
        (0..source.num_children())
            .map(|index| source.child_at_index(index).map_err(|err| (index, err.to_string())))
            .collect()
    }
}

fn push_indent(out: &mut String, level: usize)
{
    for _ in 0..level {
        out.push_str(INDENT);
    }
}
