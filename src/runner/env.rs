//! Environment overlay for the uploader process.
//!
//! Only variables the uploader reads are touched; everything else is
//! inherited as-is.

use std::collections::BTreeMap;

use symup_command::Credential;

/// Variable the uploader reads its API key from.
pub const API_KEY_VAR: &str = "DATADOG_API_KEY";

/// Older name for [`API_KEY_VAR`], still honoured by the uploader.
pub const LEGACY_API_KEY_VAR: &str = "DD_API_KEY";

/// Variable selecting the upload region.
pub const SITE_VAR: &str = "DATADOG_SITE";

/// Stand-in key for dry runs. Never valid against the real service.
pub const DRY_RUN_PLACEHOLDER_KEY: &str = "DRY_RUN_PLACEHOLDER_API_KEY";

/// Where the uploader's API key comes from for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Passed in with the request
    Supplied,
    /// Already present in the inherited environment
    Ambient,
    /// Dry run without any key; placeholder injected
    Placeholder,
    /// Real run without any key; the uploader will decide
    Missing,
}

/// Variables to set on the child, plus how the key was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverlay {
    pub vars: BTreeMap<String, String>,
    pub credential: CredentialSource,
}

/// Compute the overlay.
///
/// `ambient` looks a variable up in the environment the child would
/// inherit; blank values count as absent.
pub fn credential_overlay<F>(
    credential: Option<&Credential>,
    site: Option<&str>,
    dry_run: bool,
    ambient: F,
) -> EnvOverlay
where
    F: Fn(&str) -> Option<String>,
{
    let mut vars = BTreeMap::new();

    let present = |name: &str| ambient(name).is_some_and(|v| !v.trim().is_empty());

    let source = match credential.filter(|c| !c.is_blank()) {
        Some(credential) => {
            vars.insert(API_KEY_VAR.to_string(), credential.expose().to_string());
            CredentialSource::Supplied
        }
        None if present(API_KEY_VAR) || present(LEGACY_API_KEY_VAR) => CredentialSource::Ambient,
        None if dry_run => {
            vars.insert(API_KEY_VAR.to_string(), DRY_RUN_PLACEHOLDER_KEY.to_string());
            CredentialSource::Placeholder
        }
        None => CredentialSource::Missing,
    };

    if let Some(site) = site.map(str::trim).filter(|s| !s.is_empty()) {
        vars.insert(SITE_VAR.to_string(), site.to_string());
    }

    EnvOverlay {
        vars,
        credential: source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_supplied_credential_wins() {
        let key = Credential::new("real-key");
        let overlay = credential_overlay(Some(&key), None, true, |_| Some("ambient".to_string()));
        assert_eq!(overlay.credential, CredentialSource::Supplied);
        assert_eq!(overlay.vars.get(API_KEY_VAR).map(String::as_str), Some("real-key"));
    }

    #[test]
    fn test_ambient_credential_left_alone() {
        let overlay = credential_overlay(None, None, true, |name| {
            (name == API_KEY_VAR).then(|| "from-env".to_string())
        });
        assert_eq!(overlay.credential, CredentialSource::Ambient);
        assert!(overlay.vars.is_empty());
    }

    #[test]
    fn test_legacy_variable_counts_as_ambient() {
        let overlay = credential_overlay(None, None, false, |name| {
            (name == LEGACY_API_KEY_VAR).then(|| "legacy".to_string())
        });
        assert_eq!(overlay.credential, CredentialSource::Ambient);
        assert!(!overlay.vars.contains_key(API_KEY_VAR));
    }

    #[test]
    fn test_dry_run_gets_placeholder() {
        let overlay = credential_overlay(None, None, true, no_env);
        assert_eq!(overlay.credential, CredentialSource::Placeholder);
        assert_eq!(
            overlay.vars.get(API_KEY_VAR).map(String::as_str),
            Some(DRY_RUN_PLACEHOLDER_KEY)
        );
    }

    #[test]
    fn test_real_run_without_key_is_untouched() {
        let overlay = credential_overlay(None, None, false, no_env);
        assert_eq!(overlay.credential, CredentialSource::Missing);
        assert!(overlay.vars.is_empty());
    }

    #[test]
    fn test_blank_values_count_as_absent() {
        let blank = Credential::new("  ");
        let overlay = credential_overlay(Some(&blank), None, true, |_| Some(String::new()));
        assert_eq!(overlay.credential, CredentialSource::Placeholder);
    }

    #[test]
    fn test_site_applied_when_given() {
        let overlay = credential_overlay(None, Some("datadoghq.eu"), false, no_env);
        assert_eq!(overlay.vars.get(SITE_VAR).map(String::as_str), Some("datadoghq.eu"));

        let overlay = credential_overlay(None, Some(" "), false, no_env);
        assert!(!overlay.vars.contains_key(SITE_VAR));
    }
}
