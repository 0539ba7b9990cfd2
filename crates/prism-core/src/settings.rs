//! # Display Settings
//!
//! Knobs that shape how values are expanded and rendered.
//!
//! ## Environment Variables
//!
//! - `PRISM_PTR_DEPTH`: how many pointer levels the renderer follows (default 0)
//! - `PRISM_MAX_DEPTH`: maximum nesting the renderer walks (default 8)
//! - `PRISM_MAX_CHILDREN`: children shown per value (default 256)
//! - `PRISM_DYNAMIC`: `none`, `no-run` or `run`
//! - `PRISM_CATEGORIES`: comma separated `+category` / `-category` toggles
//!
//! Unparseable values are ignored with a warning and the default kept.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::error::{FormatterError, Result};
use crate::registry::FormatterRegistry;

/// Whether values are matched against their runtime (dynamic) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DynamicPreference
{
    /// Static type only
    #[default]
    NoDynamic,
    /// Use dynamic type information that can be read from memory
    DontRunTarget,
    /// Accepted for compatibility. Formatting never runs target code, so this
    /// behaves exactly like [`DynamicPreference::DontRunTarget`].
    CanRunTarget,
}

impl DynamicPreference
{
    /// The preference actually applied.
    pub fn effective(self) -> Self
    {
        match self {
            DynamicPreference::CanRunTarget => DynamicPreference::DontRunTarget,
            other => other,
        }
    }

    pub fn is_enabled(self) -> bool
    {
        self != DynamicPreference::NoDynamic
    }
}

impl FromStr for DynamicPreference
{
    type Err = FormatterError;

    fn from_str(s: &str) -> Result<Self>
    {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "no" | "off" => Ok(DynamicPreference::NoDynamic),
            "no-run" | "no-run-target" => Ok(DynamicPreference::DontRunTarget),
            "run" | "run-target" => Ok(DynamicPreference::CanRunTarget),
            other => Err(FormatterError::InvalidArgument(format!("unknown dynamic preference `{other}`"))),
        }
    }
}

/// Enable (`+name`) or disable (`-name`) a formatter category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOverride
{
    pub category: String,
    pub enabled: bool,
}

impl FromStr for CategoryOverride
{
    type Err = FormatterError;

    fn from_str(s: &str) -> Result<Self>
    {
        let s = s.trim();
        let (enabled, name) = if let Some(name) = s.strip_prefix('+') {
            (true, name)
        } else if let Some(name) = s.strip_prefix('-') {
            (false, name)
        } else {
            (true, s)
        };
        if name.is_empty() {
            return Err(FormatterError::InvalidArgument(format!("empty category in `{s}`")));
        }
        Ok(CategoryOverride {
            category: name.to_string(),
            enabled,
        })
    }
}

/// Expansion and rendering limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings
{
    /// Pointer levels followed when rendering (0 = print addresses only)
    pub ptr_depth: usize,
    /// Maximum nesting rendered below the root
    pub max_depth: usize,
    /// Children listed per value
    pub max_children: usize,
    /// Default dynamic-type preference for new values
    pub dynamic: DynamicPreference,
    /// Default synthetic preference for new values
    pub prefer_synthetic: bool,
    /// Category toggles applied by [`Self::apply_categories`]
    pub category_overrides: Vec<CategoryOverride>,
}

impl Default for DisplaySettings
{
    fn default() -> Self
    {
        Self {
            ptr_depth: 0,
            max_depth: 8,
            max_children: 256,
            dynamic: DynamicPreference::NoDynamic,
            prefer_synthetic: true,
            category_overrides: Vec::new(),
        }
    }
}

impl DisplaySettings
{
    /// Defaults overridden by `PRISM_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self
    {
        let mut settings = Self::default();
        parse_into(&lookup, "PRISM_PTR_DEPTH", &mut settings.ptr_depth);
        parse_into(&lookup, "PRISM_MAX_DEPTH", &mut settings.max_depth);
        parse_into(&lookup, "PRISM_MAX_CHILDREN", &mut settings.max_children);
        parse_into(&lookup, "PRISM_DYNAMIC", &mut settings.dynamic);

        if let Some(list) = lookup("PRISM_CATEGORIES") {
            for item in list.split(',').filter(|item| !item.trim().is_empty()) {
                match item.parse::<CategoryOverride>() {
                    Ok(toggle) => settings.category_overrides.push(toggle),
                    Err(err) => warn!(value = item, error = %err, "ignoring PRISM_CATEGORIES entry"),
                }
            }
        }
        settings
    }

    /// Apply [`Self::category_overrides`] to `registry`.
    ///
    /// ## Errors
    ///
    /// Returns `UnknownCategory` for the first override naming a category the
    /// registry does not have. Earlier overrides stay applied.
    pub fn apply_categories(&self, registry: &FormatterRegistry) -> Result<()>
    {
        for toggle in &self.category_overrides {
            registry.set_category_enabled(&toggle.category, toggle.enabled)?;
        }
        Ok(())
    }
}

fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T)
where
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(err) => warn!(key, value = %raw, error = %err, "ignoring invalid setting"),
    }
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    fn settings_from(vars: &[(&str, &str)]) -> DisplaySettings
    {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        DisplaySettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults()
    {
        let settings = settings_from(&[]);
        assert_eq!(settings, DisplaySettings::default());
        assert_eq!(settings.ptr_depth, 0);
        assert!(settings.prefer_synthetic);
    }

    #[test]
    fn test_env_overrides()
    {
        let settings = settings_from(&[
            ("PRISM_PTR_DEPTH", "2"),
            ("PRISM_MAX_CHILDREN", "16"),
            ("PRISM_DYNAMIC", "run"),
            ("PRISM_CATEGORIES", "-libcxx, +libstdcpp"),
        ]);
        assert_eq!(settings.ptr_depth, 2);
        assert_eq!(settings.max_children, 16);
        assert_eq!(settings.dynamic.effective(), DynamicPreference::DontRunTarget);
        assert_eq!(
            settings.category_overrides,
            vec![
                CategoryOverride {
                    category: "libcxx".into(),
                    enabled: false
                },
                CategoryOverride {
                    category: "libstdcpp".into(),
                    enabled: true
                },
            ]
        );
    }

    #[test]
    fn test_invalid_values_keep_default()
    {
        let settings = settings_from(&[("PRISM_MAX_DEPTH", "deep"), ("PRISM_DYNAMIC", "sometimes")]);
        assert_eq!(settings.max_depth, 8);
        assert_eq!(settings.dynamic, DynamicPreference::NoDynamic);
    }

    #[test]
    fn test_apply_categories()
    {
        let registry = FormatterRegistry::with_builtin();
        let settings = settings_from(&[("PRISM_CATEGORIES", "-msvcstl,+libstdcpp")]);
        settings.apply_categories(&registry).unwrap();
        assert!(!registry.is_category_enabled("msvcstl").unwrap());
        assert!(registry.is_category_enabled("libstdcpp").unwrap());

        let bad = settings_from(&[("PRISM_CATEGORIES", "+nope")]);
        assert!(bad.apply_categories(&registry).is_err());
    }
}
