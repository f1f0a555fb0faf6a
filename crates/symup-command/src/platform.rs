//! Supported platforms and their uploader flag pairs.
//!
//! Every platform is a row in [`PLATFORMS`]. A row names the platform id
//! (matched case-insensitively), the boolean flag that enables symbol
//! upload for that platform, and the flag that carries the artifact
//! location. Supporting another platform means adding a row here.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Static description of one platform.
#[derive(Debug)]
pub struct PlatformSpec {
    /// Lowercase identifier (e.g. "android")
    pub id: &'static str,
    /// Boolean flag that selects this platform's symbols
    pub symbols_flag: &'static str,
    /// Flag whose value is the artifact path
    pub location_flag: &'static str,
    /// What the artifact looks like, for log lines
    pub artifact: &'static str,
}

const ANDROID_SPEC: PlatformSpec = PlatformSpec {
    id: "android",
    symbols_flag: "--android-mapping",
    location_flag: "--android-mapping-location",
    artifact: "obfuscation mapping file",
};

const IOS_SPEC: PlatformSpec = PlatformSpec {
    id: "ios",
    symbols_flag: "--ios-dsyms",
    location_flag: "--ios-dsyms-location",
    artifact: "dSYM bundle directory",
};

/// A platform from the closed set in [`PLATFORMS`].
#[derive(Clone, Copy)]
pub struct Platform(&'static PlatformSpec);

impl Platform {
    pub const ANDROID: Platform = Platform(&ANDROID_SPEC);
    pub const IOS: Platform = Platform(&IOS_SPEC);

    /// All supported platforms, in table order.
    pub fn all() -> &'static [Platform] {
        PLATFORMS
    }

    /// Look up a platform by id, ignoring ASCII case and surrounding
    /// whitespace.
    pub fn lookup(id: &str) -> Option<Platform> {
        let id = id.trim();
        PLATFORMS
            .iter()
            .copied()
            .find(|p| p.0.id.eq_ignore_ascii_case(id))
    }

    pub fn id(&self) -> &'static str {
        self.0.id
    }

    pub fn spec(&self) -> &'static PlatformSpec {
        self.0
    }
}

/// The platform table.
pub const PLATFORMS: &[Platform] = &[Platform::ANDROID, Platform::IOS];

/// Comma-separated list of platform ids, for error messages.
pub fn supported_ids() -> String {
    PLATFORMS
        .iter()
        .map(|p| p.id())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Platform {}

impl Hash for Platform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for Platform {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Platform {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.id.cmp(other.0.id)
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Platform").field(&self.0.id).finish()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.id)
    }
}

/// Unknown platform id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform '{given}' (supported: {supported})")]
pub struct UnknownPlatform {
    pub given: String,
    pub supported: String,
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::lookup(s).ok_or_else(|| UnknownPlatform {
            given: s.to_string(),
            supported: supported_ids(),
        })
    }
}

impl Serialize for Platform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.id)
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
