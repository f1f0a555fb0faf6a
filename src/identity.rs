//! Service name resolution.
//!
//! First non-blank value wins: the override for the request's platform,
//! then the global service name. Blank overrides fall through.

use symup_command::{ResolvedIdentity, UploadRequest};

pub fn resolve_identity(request: &UploadRequest) -> Option<ResolvedIdentity> {
    request
        .service_name_override(request.platform())
        .and_then(ResolvedIdentity::new)
        .or_else(|| request.service_name().and_then(ResolvedIdentity::new))
}
