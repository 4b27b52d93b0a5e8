//! Signing Manifest
//!
//! Applications describe the static part of their Android build
//! configuration in a TOML manifest, usually called `android-signing.toml`.
//! None of its values are interpreted beyond validation. They are passed
//! through verbatim to the Gradle build, alongside the signing resolution.

use serde;
use toml;

/// Default path of the credentials file relative to the manifest.
pub const DEFAULT_CREDENTIALS: &str = "key.properties";

/// Default proguard files of the release build type.
pub const DEFAULT_PROGUARD_FILES: [&str; 2] = [
    "proguard-android-optimize.txt",
    "proguard-rules.pro",
];

/// Manifest Errors
///
/// This is the exhaustive list of possible errors raised when parsing and
/// validating a manifest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the manifest failed with the given error.
    #[error("cannot read manifest: {0}")]
    Io(#[from] std::io::Error),
    /// The manifest is not valid TOML or does not match the manifest schema.
    #[error("invalid manifest syntax: {0}")]
    Syntax(#[from] toml::de::Error),
    /// The manifest format version is not supported.
    #[error("unsupported manifest version {0}")]
    Version(u32),
    /// The specified key holds an invalid value.
    #[error("invalid value for '{0}'")]
    Invalid(&'static str),
}

/// Raw Manifest Application Table
///
/// Sub-type of `Raw` representing the `Application` table.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawApplication {
    /// Identifier of the application. Only alphanumeric and `-`, `_`
    /// allowed.
    pub id: Option<String>,
    /// Human-readable name of the application.
    pub name: Option<String>,
}

/// Raw Manifest Android Table
///
/// Sub-type of `Raw` defining the Android build configuration. The options
/// in this table are one-to-one mappings of their equivalents in the Android
/// Gradle plugin.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawAndroid {
    pub application_id: Option<String>,
    pub namespace: Option<String>,

    pub compile_sdk: Option<u32>,
    pub min_sdk: Option<u32>,
    pub target_sdk: Option<u32>,

    pub version_code: Option<u32>,
    pub version_name: Option<String>,

    pub ndk_version: Option<String>,
    pub jvm_target: Option<String>,

    /// Path to the credentials file relative from the manifest.
    #[serde(skip_serializing)]
    pub credentials: Option<String>,
}

/// Raw Manifest Build-Type Table
///
/// Sub-type of `Raw` with the per-variant build flags. Unset flags take the
/// defaults of the respective build variant.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawBuildType {
    pub debuggable: Option<bool>,
    pub minify: Option<bool>,
    pub shrink_resources: Option<bool>,
    pub proguard_files: Option<Vec<String>>,
}

/// Raw Manifest Build-Types Table
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawBuildTypes {
    pub debug: Option<RawBuildType>,
    pub release: Option<RawBuildType>,
}

/// Raw Manifest Content
///
/// This type contains the raw manifest content as parsed by `toml` and
/// converted into rust types via `serde`.
///
/// Note that content of the type is not verified other than for syntactic
/// correctness required by the given types. Semantic correctness needs to
/// be verified by the caller.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Raw {
    /// Version of the manifest format. Only version `1` is currently
    /// supported.
    pub version: u32,

    /// Application table specifying properties of the application itself.
    pub application: Option<RawApplication>,
    /// Android table specifying the static build configuration.
    #[serde(default)]
    pub android: RawAndroid,
    /// Build-type table specifying per-variant build flags.
    #[serde(default)]
    pub build_type: RawBuildTypes,
}

/// Build-Type Flags
///
/// The effective build flags of a build variant with all defaults applied.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildType {
    pub debuggable: bool,
    pub minify: bool,
    pub shrink_resources: bool,
    pub proguard_files: Vec<String>,
}

/// Manifest Abstraction
///
/// This type represents a valid and verified manifest. The manifest content
/// can be directly accessed via the `raw` field. The data is verified for
/// semantic correctness (unlike the `Raw` type).
#[derive(Clone, Debug)]
pub struct Manifest {
    /// Raw manifest content as parsed by the TOML module.
    pub raw: Raw,
}

impl BuildType {
    /// Return the defaults of a build variant
    ///
    /// Debug builds are debuggable and not minified. Release builds are not
    /// debuggable, minified, resource-shrunk, and use the default proguard
    /// files.
    pub fn defaults(variant: crate::signing::BuildVariant) -> Self {
        match variant {
            crate::signing::BuildVariant::Debug => Self {
                debuggable: true,
                minify: false,
                shrink_resources: false,
                proguard_files: Vec::new(),
            },
            crate::signing::BuildVariant::Release => Self {
                debuggable: false,
                minify: true,
                shrink_resources: true,
                proguard_files: DEFAULT_PROGUARD_FILES.iter().map(|v| v.to_string()).collect(),
            },
        }
    }
}

impl RawBuildType {
    fn apply(&self, mut base: BuildType) -> BuildType {
        if let Some(v) = self.debuggable {
            base.debuggable = v;
        }
        if let Some(v) = self.minify {
            base.minify = v;
        }
        if let Some(v) = self.shrink_resources {
            base.shrink_resources = v;
        }
        if let Some(v) = self.proguard_files.as_ref() {
            base.proguard_files = v.clone();
        }
        base
    }
}

impl Raw {
    fn parse_str(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    /// Return the effective build flags of a variant
    ///
    /// Apply the build-type table of the given variant over its defaults.
    pub fn build_type(&self, variant: crate::signing::BuildVariant) -> BuildType {
        let raw = match variant {
            crate::signing::BuildVariant::Debug => self.build_type.debug.as_ref(),
            crate::signing::BuildVariant::Release => self.build_type.release.as_ref(),
        };
        let base = BuildType::defaults(variant);

        match raw {
            Some(v) => v.apply(base),
            None => base,
        }
    }

    /// Return `android.credentials` or its default
    ///
    /// Return the configured credentials path, or `key.properties` if
    /// missing.
    pub fn credentials(&self) -> &str {
        self.android.credentials.as_deref().unwrap_or(DEFAULT_CREDENTIALS)
    }
}

impl Manifest {
    // Check whether a string is a valid identifier
    //
    // This verifies that the given string consists of only alphanumeric
    // characters plus `-`, `_`. Empty identifiers are rejected.
    //
    // Any unicode alpha/numeric character is allowed.
    fn is_identifier(s: &str) -> bool {
        !s.is_empty() && s.chars().all(
            |v| v.is_alphanumeric() || v == '-' || v == '_'
        )
    }

    // Check whether a string contains no quotes or escapes
    //
    // This verifies that a string does not contain quotes or backslashes, nor
    // any control characters. Such strings can be interpolated into Gradle
    // build scripts and properties files without escaping.
    fn is_quotable(s: &str) -> bool {
        s.chars().all(
            |v| !v.is_control()
                && v != '\\'
                && v != '\''
                && v != '"'
        )
    }

    // Verify an optional quotable value.
    fn check_quotable(v: Option<&String>, key: &'static str) -> Result<(), Error> {
        match v {
            Some(v) if !Self::is_quotable(v) => Err(Error::Invalid(key)),
            _ => Ok(()),
        }
    }

    // Verify the build flags of a variant.
    fn check_build_type(
        raw: &Raw,
        variant: crate::signing::BuildVariant,
        key_shrink: &'static str,
        key_proguard: &'static str,
    ) -> Result<(), Error> {
        let build_type = raw.build_type(variant);

        // The Android Gradle plugin refuses to shrink resources without
        // code shrinking.
        if build_type.shrink_resources && !build_type.minify {
            return Err(Error::Invalid(key_shrink));
        }

        if !build_type.proguard_files.iter().all(|v| !v.is_empty() && Self::is_quotable(v)) {
            return Err(Error::Invalid(key_proguard));
        }

        Ok(())
    }

    /// Parse manifest from raw
    ///
    /// Take a raw representation of the manifest and perform post-parsing
    /// validation, ensuring the final manifest will not contain invalid
    /// entries.
    fn parse_raw(raw: Raw) -> Result<Self, Error> {
        // We only support version '1'. Any other version number is explicitly
        // defined to be incompatible, so fail parsing.
        //
        // Unknown fields are accepted and silently ignored.
        if raw.version != 1 {
            return Err(Error::Version(raw.version));
        }

        if let Some(application) = &raw.application {
            if let Some(v) = &application.id {
                if !Self::is_identifier(v) {
                    return Err(Error::Invalid("application.id"));
                }
            }

            Self::check_quotable(application.name.as_ref(), "application.name")?;
        }

        let android = &raw.android;
        Self::check_quotable(android.application_id.as_ref(), "android.application-id")?;
        Self::check_quotable(android.namespace.as_ref(), "android.namespace")?;
        Self::check_quotable(android.version_name.as_ref(), "android.version-name")?;
        Self::check_quotable(android.ndk_version.as_ref(), "android.ndk-version")?;
        Self::check_quotable(android.jvm_target.as_ref(), "android.jvm-target")?;

        // The credentials path must fit on a single line and be non-empty.
        if let Some(v) = &android.credentials {
            if v.is_empty() || v.chars().any(|c| c.is_control()) {
                return Err(Error::Invalid("android.credentials"));
            }
        }

        Self::check_build_type(
            &raw,
            crate::signing::BuildVariant::Debug,
            "build-type.debug.shrink-resources",
            "build-type.debug.proguard-files",
        )?;
        Self::check_build_type(
            &raw,
            crate::signing::BuildVariant::Release,
            "build-type.release.shrink-resources",
            "build-type.release.proguard-files",
        )?;

        Ok(
            Self {
                raw: raw,
            }
        )
    }

    /// Parse manifest from string
    ///
    /// Parse the given string as a literal manifest in TOML representation.
    /// Content is verified and invalid manifests are refused.
    pub fn parse_str(content: &str) -> Result<Self, Error> {
        Raw::parse_str(content).and_then(Self::parse_raw)
    }

    /// Parse manifest from file-system
    ///
    /// Open the specified file and parse it as a manifest. The content is
    /// verified and invalid manifests are refused. The file is completely
    /// parsed into memory and then closed again before the function returns.
    pub fn parse_path(path: &std::path::Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::BuildVariant;

    // Verify basic parsing of `Raw`
    //
    // Parse a minimal raw manifest into `Raw` to have a base-level test for
    // the parsing capabilities. Not complex content verification is done.
    #[test]
    fn raw_parse_minimal() {
        let s = "version = 1";

        Raw::parse_str(s).unwrap();
    }

    // Verify unknown versions in `Raw`
    //
    // The raw parser does not care for the version other than syntactic
    // correctness, but the manifest refuses it.
    #[test]
    fn parse_unknown_version() {
        let s = "version = 2";

        Raw::parse_str(s).unwrap();
        assert!(matches!(Manifest::parse_str(s), Err(Error::Version(2))));
    }

    // Verify defaults
    //
    // A minimal manifest uses `key.properties` and the build-type defaults
    // of the Android Gradle plugin templates.
    #[test]
    fn manifest_parse_defaults() {
        let m = Manifest::parse_str("version = 1").unwrap();

        assert_eq!(m.raw.credentials(), "key.properties");
        assert_eq!(m.raw.build_type(BuildVariant::Debug), BuildType::defaults(BuildVariant::Debug));

        let release = m.raw.build_type(BuildVariant::Release);
        assert!(release.minify);
        assert!(release.shrink_resources);
        assert!(!release.debuggable);
        assert_eq!(release.proguard_files, ["proguard-android-optimize.txt", "proguard-rules.pro"]);
    }

    // Verify a complete manifest
    //
    // All fields are passed through verbatim, and build-type tables
    // override only what they set.
    #[test]
    fn manifest_parse_full() {
        let s = "
            version = 1
            [application]
            id = \"ussd_emulator\"
            name = \"USSD Emulator\"
            [android]
            application-id = \"com.iden.ussd_emulator\"
            namespace = \"com.iden.ussd_emulator\"
            compile-sdk = 35
            min-sdk = 21
            target-sdk = 35
            version-code = 3
            version-name = \"1.0.2\"
            ndk-version = \"27.0.12077973\"
            jvm-target = \"11\"
            credentials = \"../key.properties\"
            [build-type.release]
            proguard-files = [\"rules.pro\"]
        ";

        let m = Manifest::parse_str(s).unwrap();

        assert_eq!(m.raw.android.compile_sdk, Some(35));
        assert_eq!(m.raw.android.ndk_version.as_deref(), Some("27.0.12077973"));
        assert_eq!(m.raw.credentials(), "../key.properties");

        let release = m.raw.build_type(BuildVariant::Release);
        assert!(release.minify);
        assert_eq!(release.proguard_files, ["rules.pro"]);
    }

    // Verify application ids
    //
    // Application IDs use a restrictive character set.
    #[test]
    fn manifest_parse_application_id() {
        let s = "
            version = 1
            [application]
            id = \"\"
        ";

        assert!(matches!(Manifest::parse_str(s), Err(Error::Invalid("application.id"))));
    }

    // Verify quotable strings
    //
    // Strings interpolated into Gradle must not contain quotes.
    #[test]
    fn manifest_parse_quotable() {
        let s = "
            version = 1
            [android]
            namespace = \"com.foo\\\"bar\"
        ";

        assert!(matches!(Manifest::parse_str(s), Err(Error::Invalid("android.namespace"))));
    }

    // Verify resource shrinking constraints
    //
    // Shrinking resources without minification is refused.
    #[test]
    fn manifest_parse_shrink_without_minify() {
        let s = "
            version = 1
            [build-type.release]
            minify = false
        ";

        assert!(matches!(
            Manifest::parse_str(s),
            Err(Error::Invalid("build-type.release.shrink-resources")),
        ));

        let s = "
            version = 1
            [build-type.release]
            minify = false
            shrink-resources = false
        ";

        Manifest::parse_str(s).unwrap();
    }

    // Verify credentials paths
    //
    // Credentials paths must be single-line and non-empty.
    #[test]
    fn manifest_parse_credentials() {
        let s = "
            version = 1
            [android]
            credentials = \"key\\n.properties\"
        ";

        assert!(matches!(Manifest::parse_str(s), Err(Error::Invalid("android.credentials"))));
    }

    // Verify syntax errors
    #[test]
    fn manifest_parse_syntax() {
        assert!(matches!(Manifest::parse_str("version = "), Err(Error::Syntax(_))));
        assert!(matches!(Manifest::parse_str("version = \"1\""), Err(Error::Syntax(_))));
    }
}
