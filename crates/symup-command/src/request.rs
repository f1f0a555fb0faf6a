//! Upload request model.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::platform::{Platform, UnknownPlatform};

/// Errors raised while assembling an [`UploadRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("version must not be empty")]
    EmptyVersion,

    #[error(transparent)]
    UnknownPlatform(#[from] UnknownPlatform),

    #[error("invalid service name override '{0}', expected <platform>=<name>")]
    MalformedOverride(String),
}

/// Secret credential for the uploader.
///
/// `Debug` and `Display` never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// One upload attempt. Immutable once built.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    platform: Platform,
    version: String,
    artifact_path: Option<PathBuf>,
    service_name: Option<String>,
    service_name_overrides: BTreeMap<Platform, String>,
    flavor: Option<String>,
    dry_run: bool,
    credential: Option<Credential>,
    site: Option<String>,
}

impl UploadRequest {
    pub fn builder(platform: Platform, version: impl Into<String>) -> UploadRequestBuilder {
        UploadRequestBuilder {
            request: UploadRequest {
                platform,
                version: version.into(),
                artifact_path: None,
                service_name: None,
                service_name_overrides: BTreeMap::new(),
                flavor: None,
                dry_run: false,
                credential: None,
                site: None,
            },
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    /// Override for `platform`, as given (may be blank).
    pub fn service_name_override(&self, platform: Platform) -> Option<&str> {
        self.service_name_overrides.get(&platform).map(String::as_str)
    }

    pub fn service_name_overrides(&self) -> &BTreeMap<Platform, String> {
        &self.service_name_overrides
    }

    pub fn flavor(&self) -> Option<&str> {
        self.flavor.as_deref()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }
}

/// Builder for [`UploadRequest`].
#[derive(Debug, Clone)]
pub struct UploadRequestBuilder {
    request: UploadRequest,
}

impl UploadRequestBuilder {
    pub fn artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.artifact_path = Some(path.into());
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.request.service_name = Some(name.into());
        self
    }

    /// Set the override for one platform. A later call for the same
    /// platform replaces the earlier one.
    pub fn service_name_override(mut self, platform: Platform, name: impl Into<String>) -> Self {
        self.request
            .service_name_overrides
            .insert(platform, name.into());
        self
    }

    pub fn flavor(mut self, flavor: impl Into<String>) -> Self {
        self.request.flavor = Some(flavor.into());
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.request.dry_run = dry_run;
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.request.credential = Some(credential);
        self
    }

    pub fn site(mut self, site: impl Into<String>) -> Self {
        self.request.site = Some(site.into());
        self
    }

    pub fn build(self) -> Result<UploadRequest, RequestError> {
        if self.request.version.trim().is_empty() {
            return Err(RequestError::EmptyVersion);
        }
        Ok(self.request)
    }
}

/// Parse a `<platform>=<name>` override pair as given on the command line.
///
/// The name is kept verbatim, so `ios=` yields a blank override that the
/// identity resolver skips.
pub fn parse_override(raw: &str) -> Result<(Platform, String), RequestError> {
    let (platform, name) = raw
        .split_once('=')
        .ok_or_else(|| RequestError::MalformedOverride(raw.to_string()))?;
    let platform: Platform = platform.parse()?;
    Ok((platform, name.to_string()))
}

/// A service name that is known to be non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity(String);

impl ResolvedIdentity {
    /// Trim `name`, returning `None` when nothing is left.
    pub fn new(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
