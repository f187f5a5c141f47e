//! Safe `$VAR` / `${VAR}` substitution
//!
//! Placeholders use shell-like syntax: `$NAME`, `${NAME}` and `$$` for a
//! literal dollar sign. Substitution is "safe": placeholders without a
//! binding, and stray `$` characters, are left in the output untouched.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|([_a-zA-Z][_a-zA-Z0-9]*)|\{([_a-zA-Z][_a-zA-Z0-9]*)\})")
            .expect("Invalid placeholder regex")
    })
}

/// Variable bindings for a substitution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    values: HashMap<String, String>,
}

impl Vars {
    /// Create an empty binding set
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    /// Look up a bound variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Substitute every bound placeholder in `input`
    pub fn substitute(&self, input: &str) -> String {
        safe_substitute(input, self)
    }

    /// Substitute every string of a list
    pub fn substitute_all(&self, inputs: &[String]) -> Vec<String> {
        inputs.iter().map(|s| self.substitute(s)).collect()
    }
}

/// Replace bound placeholders in `input`, leaving unknown ones literal.
///
/// # Examples
/// ```
/// use unibuild::core::template::{safe_substitute, Vars};
///
/// let vars = Vars::new().with("ARCH", "x86_64");
/// assert_eq!(safe_substitute("--host=${ARCH}-apple", &vars), "--host=x86_64-apple");
/// assert_eq!(safe_substitute("$PREFIX/$ARCH", &vars), "$PREFIX/x86_64");
/// ```
pub fn safe_substitute(input: &str, vars: &Vars) -> String {
    placeholder_regex()
        .replace_all(input, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str());
            match vars.get(name) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
