//! Subprocess invocation value and its log-safe rendering.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Replacement text for redacted secrets.
pub const REDACTED: &str = "[REDACTED]";

/// A fully assembled uploader command.
///
/// Arguments are discrete tokens and are never joined into a shell string
/// for execution. `env` is an overlay on top of the inherited environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn arg(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments as lossy UTF-8 strings.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Whether `flag` appears as a whole argument.
    pub fn has_arg(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// The argument following `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&OsStr> {
        let pos = self.args.iter().position(|a| a == flag)?;
        self.args.get(pos + 1).map(OsString::as_os_str)
    }

    /// Render the command line for diagnostics.
    ///
    /// Every occurrence of a non-empty entry of `secrets` inside the
    /// program or an argument is replaced with [`REDACTED`]. Environment
    /// values are not rendered.
    pub fn display_redacted(&self, secrets: &[&str]) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|token| quote(&redact(&token.to_string_lossy(), secrets)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn redact(token: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(token.to_string(), |acc, secret| acc.replace(secret, REDACTED))
}

fn quote(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '$' | '`' | '\\' | ';' | '&' | '|'));
    if needs_quotes {
        format!("'{}'", token.replace('\'', "'\\''"))
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_of() {
        let mut inv = Invocation::new("tool");
        inv.args(["--version", "1.0", "--dry-run"]);
        assert_eq!(inv.value_of("--version"), Some(OsStr::new("1.0")));
        assert_eq!(inv.value_of("--dry-run"), None);
        assert_eq!(inv.value_of("--missing"), None);
        assert!(inv.has_arg("--dry-run"));
        assert!(!inv.has_arg("--dry"));
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let mut inv = Invocation::new("tool");
        inv.args(["--path", "/tmp/My App.dSYM", ""]);
        assert_eq!(inv.display_redacted(&[]), "tool --path '/tmp/My App.dSYM' ''");
    }

    #[test]
    fn test_display_redacts_secret_substrings() {
        let mut inv = Invocation::new("tool");
        inv.args(["--api-key", "s3cr3t", "--header=key:s3cr3t"]);
        let shown = inv.display_redacted(&["s3cr3t"]);
        assert!(!shown.contains("s3cr3t"));
        assert_eq!(shown, "tool --api-key [REDACTED] --header=key:[REDACTED]");
    }

    #[test]
    fn test_empty_secret_ignored() {
        let mut inv = Invocation::new("tool");
        inv.arg("value");
        assert_eq!(inv.display_redacted(&[""]), "tool value");
    }

    #[test]
    fn test_display_never_shows_env() {
        let mut inv = Invocation::new("tool");
        inv.env.insert("API_KEY".to_string(), "hidden".to_string());
        assert!(!inv.display_redacted(&[]).contains("hidden"));
    }
}
