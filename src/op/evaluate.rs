//! Evaluate Build Configuration
//!
//! The `evaluate` operation binds every build variant to its signing identity
//! and build flags, as the Gradle build would do during configuration
//! evaluation. The result is serializable and meant as build metadata: it
//! records for each variant where its signing identity came from, so a
//! release signed with the debug identity is recognizable downstream.

/// Evaluate Errors
///
/// This is the exhaustive list of possible errors raised by the evaluate
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The credentials file exists but cannot be loaded.
    #[error("cannot load credentials: {0}")]
    Credentials(#[from] crate::properties::Error),
    /// The credentials file is incomplete. This aborts the evaluation of all
    /// variants.
    #[error("{variant} variant: {source}")]
    Signing {
        variant: crate::signing::BuildVariant,
        #[source]
        source: crate::signing::Error,
    },
}

/// Signing Source
///
/// Origin of the signing identity of a variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SigningSource {
    /// Development identity of the Android Gradle plugin.
    DebugDefault,
    /// Release identity from the credentials file.
    CredentialsFile,
}

/// Variant Signing
///
/// Serializable view of a signing resolution. Passwords are not part of it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Signing {
    pub config: &'static str,
    pub source: SigningSource,
    pub release_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_store: Option<std::path::PathBuf>,
}

/// Variant Evaluation
///
/// Everything a single build variant is bound to.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Variant {
    pub variant: &'static str,
    #[serde(flatten)]
    pub build_type: crate::manifest::BuildType,
    pub signing: Signing,
    /// Full resolution, including passwords, for use by `emit`.
    #[serde(skip)]
    pub resolution: crate::signing::Resolution,
}

/// Evaluation
///
/// The evaluated build configuration. The static application and android
/// configuration is copied verbatim from the manifest.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Evaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<crate::manifest::RawApplication>,
    pub android: crate::manifest::RawAndroid,
    pub credentials: std::path::PathBuf,
    pub credentials_present: bool,
    pub variants: Vec<Variant>,
}

impl Signing {
    fn new(
        variant: crate::signing::BuildVariant,
        resolution: &crate::signing::Resolution,
        base: Option<&std::path::Path>,
    ) -> Self {
        let identity = resolution.identity();

        Self {
            config: resolution.signing_config(),
            source: match identity {
                None => SigningSource::DebugDefault,
                Some(_) => SigningSource::CredentialsFile,
            },
            release_fallback: resolution.is_release_fallback(variant),
            alias: identity.map(|v| v.alias().to_string()),
            key_store: identity.map(|v| v.key_store_location(base)),
        }
    }
}

impl Evaluation {
    /// Find the evaluation of a variant
    pub fn variant(&self, variant: crate::signing::BuildVariant) -> Option<&Variant> {
        self.variants.iter().find(|v| v.variant == variant.as_str())
    }
}

/// Evaluate build configuration
///
/// Load the credentials file configured in the manifest and bind each build
/// variant to its signing identity and build flags. The credentials path is
/// relative to `manifest_dir`. The file is read once for all variants.
///
/// Any incomplete credentials fail the whole evaluation, so no partial
/// configuration is ever returned.
pub fn evaluate(
    manifest: &crate::manifest::Manifest,
    manifest_dir: &std::path::Path,
) -> Result<Evaluation, Error> {
    let path = manifest_dir.join(manifest.raw.credentials());
    let credentials = crate::properties::CredentialsFile::load(&path)?;
    let mut variants = Vec::new();

    for variant in crate::signing::BuildVariant::ALL {
        let resolution = crate::signing::resolve(variant, &credentials)
            .map_err(|v| Error::Signing { variant: variant, source: v })?;
        crate::op::resolve::trace_resolution(variant, &resolution);

        variants.push(
            Variant {
                variant: variant.as_str(),
                build_type: manifest.raw.build_type(variant),
                signing: Signing::new(variant, &resolution, credentials.dir()),
                resolution: resolution,
            }
        );
    }

    Ok(
        Evaluation {
            application: manifest.raw.application.clone(),
            android: manifest.raw.android.clone(),
            credentials: path,
            credentials_present: credentials.exists(),
            variants: variants,
        }
    )
}
