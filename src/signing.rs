//! Signing Resolution
//!
//! Every build variant is bound to exactly one signing identity for the
//! duration of a configuration evaluation. This module implements the rules
//! of that binding as a pure function of the build variant and the content of
//! the credentials file.
//!
//! The outcome is a [`Resolution`]: either the development identity of the
//! Android Gradle plugin, or a release identity assembled from the
//! credentials file. A credentials file that exists but lacks a required
//! field is an [`Error`].

/// Credentials file key of the signing key alias.
pub const KEY_ALIAS: &str = "keyAlias";
/// Credentials file key of the password for the alias.
pub const KEY_PASSWORD: &str = "keyPassword";
/// Credentials file key of the key-store path.
pub const STORE_FILE: &str = "storeFile";
/// Credentials file key of the key-store password.
pub const STORE_PASSWORD: &str = "storePassword";

/// Required credentials keys, in the order they are validated.
pub const REQUIRED_KEYS: [&str; 4] = [KEY_ALIAS, KEY_PASSWORD, STORE_FILE, STORE_PASSWORD];

/// Name of the Gradle signing configuration of the development identity.
pub const DEBUG_SIGNING_CONFIG: &str = "debug";
/// Name of the Gradle signing configuration assembled from credentials.
pub const RELEASE_SIGNING_CONFIG: &str = "release";

/// Signing Errors
///
/// This is the exhaustive list of possible errors raised by the signing
/// resolution. See each error for details.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Credentials file exists but the specified key is missing or empty.
    #[error("missing '{0}' in credentials file")]
    MissingCredentialField(&'static str),
}

/// Build Variant
///
/// This enum is an enumeration of supported build variants. It implements
/// `FromStr` to allow creation from string representation. Use `as_str()`
/// to get a static string-representation back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildVariant {
    Debug,
    Release,
}

/// Signing Identity
///
/// A release signing identity as read from the credentials file. All fields
/// are guaranteed to be non-empty. The key-store path is kept exactly as
/// written in the credentials file, use `key_store_location()` to resolve it.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    alias: String,
    alias_password: String,
    key_store_path: std::path::PathBuf,
    key_store_password: String,
}

/// Signing Resolution
///
/// The signing identity a build variant is bound to. The development identity
/// has no fields of its own. Its key-store, alias, and passwords are supplied
/// by the Android Gradle plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Development identity of the Android Gradle plugin.
    DebugDefault,
    /// Release identity assembled from the credentials file.
    FromFile(SigningIdentity),
}

impl BuildVariant {
    /// All build variants, in evaluation order.
    pub const ALL: [BuildVariant; 2] = [BuildVariant::Debug, BuildVariant::Release];

    /// Get string representation
    ///
    /// Return the string representation of the build variant. This is
    /// guaranteed to be parsable by the `FromStr` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildVariant::Debug => "debug",
            BuildVariant::Release => "release",
        }
    }
}

impl std::fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Parse build variants from strings
//
// This implements `FromStr` to allow using `std::str::parse()` and thus
// get build variants from their respective string representation. Note that
// this uses case-insensitive matching.
impl std::str::FromStr for BuildVariant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("debug") {
            Ok(Self::Debug)
        } else if s.eq_ignore_ascii_case("release") {
            Ok(Self::Release)
        } else {
            Err(())
        }
    }
}

// Passwords never show up in debug output.
impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("alias", &self.alias)
            .field("alias_password", &"<redacted>")
            .field("key_store_path", &self.key_store_path)
            .field("key_store_password", &"<redacted>")
            .finish()
    }
}

impl SigningIdentity {
    /// Return the signing key alias
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Return the password for the alias
    pub fn alias_password(&self) -> &str {
        &self.alias_password
    }

    /// Return the key-store path as written in the credentials file
    pub fn key_store_path(&self) -> &std::path::Path {
        &self.key_store_path
    }

    /// Return the key-store password
    pub fn key_store_password(&self) -> &str {
        &self.key_store_password
    }

    /// Resolve the key-store path
    ///
    /// Relative key-store paths are relative to the directory of the
    /// credentials file, which is passed as `base`. Absolute paths and
    /// paths without a base are returned unchanged. The existence of the
    /// key-store is not checked.
    pub fn key_store_location(
        &self,
        base: Option<&std::path::Path>,
    ) -> std::path::PathBuf {
        match base {
            Some(base) if self.key_store_path.is_relative() => {
                base.join(&self.key_store_path)
            },
            _ => self.key_store_path.clone(),
        }
    }
}

impl Resolution {
    /// The development identity of the Android Gradle plugin.
    pub const DEBUG_DEFAULT: Resolution = Resolution::DebugDefault;

    /// Return the release identity, if any
    pub fn identity(&self) -> Option<&SigningIdentity> {
        match self {
            Resolution::DebugDefault => None,
            Resolution::FromFile(v) => Some(v),
        }
    }

    /// Return the name of the Gradle signing configuration
    pub fn signing_config(&self) -> &'static str {
        match self {
            Resolution::DebugDefault => DEBUG_SIGNING_CONFIG,
            Resolution::FromFile(_) => RELEASE_SIGNING_CONFIG,
        }
    }

    /// Check for a debug-signed release
    ///
    /// Return `true` if this resolution binds the release variant to the
    /// development identity, which happens when no credentials file exists.
    pub fn is_release_fallback(&self, variant: BuildVariant) -> bool {
        variant == BuildVariant::Release && *self == Resolution::DebugDefault
    }
}

// Fetch a required credentials field. Empty values count as missing.
fn required<'a>(
    credentials: &'a crate::properties::CredentialsFile,
    key: &'static str,
) -> Result<&'a str, Error> {
    match credentials.get(key) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MissingCredentialField(key)),
    }
}

/// Resolve signing identity
///
/// Bind the given build variant to its signing identity:
///
///  * `Debug` always resolves to the development identity. The credentials
///    are not consulted.
///  * `Release` resolves to the development identity if the credentials file
///    does not exist.
///  * `Release` with an existing credentials file resolves to the identity
///    assembled from its four required keys. The first missing or empty key
///    (in the order of `REQUIRED_KEYS`) fails the resolution. There is no
///    fallback in this case.
pub fn resolve(
    variant: BuildVariant,
    credentials: &crate::properties::CredentialsFile,
) -> Result<Resolution, Error> {
    if variant == BuildVariant::Debug {
        return Ok(Resolution::DEBUG_DEFAULT);
    }

    if !credentials.exists() {
        return Ok(Resolution::DEBUG_DEFAULT);
    }

    let alias = required(credentials, KEY_ALIAS)?;
    let alias_password = required(credentials, KEY_PASSWORD)?;
    let key_store_path = required(credentials, STORE_FILE)?;
    let key_store_password = required(credentials, STORE_PASSWORD)?;

    Ok(
        Resolution::FromFile(
            SigningIdentity {
                alias: alias.to_string(),
                alias_password: alias_password.to_string(),
                key_store_path: key_store_path.into(),
                key_store_password: key_store_password.to_string(),
            }
        )
    )
}
