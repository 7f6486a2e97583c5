//! Hook reference parsing (`Class` or `Class::method`).

use std::fmt;
use std::str::FromStr;

/// A reference to an installer or uninstaller hook as declared in a manifest.
/// Format: "class" or "class::method"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRef {
    pub class: String,
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookRefError {
    #[error("hook class cannot be empty")]
    EmptyClass,
    #[error("hook method after '::' cannot be empty")]
    EmptyMethod,
}

impl HookRef {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: None,
        }
    }

    pub fn with_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: Some(method.into()),
        }
    }

    /// The declared method, or `default` when only the class was named.
    pub fn method_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.method.as_deref().unwrap_or(default)
    }
}

impl fmt::Display for HookRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(m) => write!(f, "{}::{}", self.class, m),
            None => write!(f, "{}", self.class),
        }
    }
}

impl FromStr for HookRef {
    type Err = HookRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only the first "::" separates class from method
        let (class, method) = match s.split_once("::") {
            Some((class, method)) => {
                if method.is_empty() {
                    return Err(HookRefError::EmptyMethod);
                }
                (class, Some(method.to_string()))
            }
            None => (s, None),
        };

        if class.is_empty() {
            return Err(HookRefError::EmptyClass);
        }

        Ok(HookRef {
            class: class.to_string(),
            method,
        })
    }
}
