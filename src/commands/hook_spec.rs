//! `--hook` argument parsing.

use anyhow::{Result, anyhow};
use std::path::PathBuf;
use std::str::FromStr;

/// An external hook program registered under a component identifier.
/// Format: "ID=PROGRAM"
#[derive(Debug, PartialEq, Clone)]
pub struct HookSpec {
    pub id: String,
    pub program: PathBuf,
}

impl std::fmt::Display for HookSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.id, self.program.display())
    }
}

impl FromStr for HookSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split at the first '=' so the program path may contain '='
        let (id, program) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid hook format: expected ID=PROGRAM."))?;

        let id = id.trim();
        if id.is_empty() {
            return Err(anyhow!("Invalid hook format: ID cannot be empty."));
        }
        if id.contains("::") {
            return Err(anyhow!("Invalid hook format: ID cannot contain '::'."));
        }
        if program.is_empty() {
            return Err(anyhow!("Invalid hook format: PROGRAM cannot be empty."));
        }

        Ok(HookSpec {
            id: id.to_string(),
            program: PathBuf::from(program),
        })
    }
}
