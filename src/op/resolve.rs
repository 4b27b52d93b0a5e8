//! Resolve Signing Identity
//!
//! Resolve the signing identity of a single build variant from the
//! credentials file on disk.

/// Resolve Errors
///
/// This is the exhaustive list of possible errors raised by the resolve
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The credentials file exists but cannot be loaded.
    #[error("cannot load credentials: {0}")]
    Credentials(#[from] crate::properties::Error),
    /// The credentials file is incomplete.
    #[error(transparent)]
    Signing(#[from] crate::signing::Error),
}

/// Resolved Signing
///
/// Result of the resolve operation: the signing resolution of the variant,
/// together with the directory of the credentials file, which relative
/// key-store paths are based on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub variant: crate::signing::BuildVariant,
    pub resolution: crate::signing::Resolution,
    pub base: Option<std::path::PathBuf>,
}

impl Resolved {
    /// Return the resolved key-store location, if any
    pub fn key_store_location(&self) -> Option<std::path::PathBuf> {
        self.resolution.identity().map(|v| v.key_store_location(self.base.as_deref()))
    }
}

// Log the outcome of a resolution. Secrets are never logged.
pub(crate) fn trace_resolution(
    variant: crate::signing::BuildVariant,
    resolution: &crate::signing::Resolution,
) {
    if resolution.is_release_fallback(variant) {
        tracing::warn!(
            variant = variant.as_str(),
            "no credentials file, signing release with the debug identity"
        );
    } else if let Some(id) = resolution.identity() {
        tracing::debug!(
            variant = variant.as_str(),
            alias = id.alias(),
            "signing with credentials file identity"
        );
    } else {
        tracing::debug!(variant = variant.as_str(), "signing with the debug identity");
    }
}

/// Resolve signing identity from file-system
///
/// Load the credentials file at `path` and resolve the signing identity of
/// `variant`. The file is read at most once, and not at all for debug
/// builds. A missing file is not an error.
pub fn resolve(
    variant: crate::signing::BuildVariant,
    path: &std::path::Path,
) -> Result<Resolved, Error> {
    let credentials = match variant {
        crate::signing::BuildVariant::Debug => crate::properties::CredentialsFile::absent(),
        crate::signing::BuildVariant::Release => crate::properties::CredentialsFile::load(path)?,
    };

    let resolution = crate::signing::resolve(variant, &credentials)?;
    trace_resolution(variant, &resolution);

    Ok(
        Resolved {
            variant: variant,
            resolution: resolution,
            base: credentials.dir().map(|v| v.to_path_buf()),
        }
    )
}
