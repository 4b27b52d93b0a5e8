//! Android Release Signing Resolution
//!
//! The Android Gradle build signs every packaged artifact with a signing
//! identity. Debug builds use the development identity provided by the
//! Android Gradle plugin. Release builds are supposed to be signed with a
//! dedicated release key, whose credentials are kept out of source control
//! in an external properties file, usually called `key.properties`.
//!
//! This crate implements the decision procedure that binds each build variant
//! to a signing identity at configuration-evaluation time:
//!
//!  * Debug builds always use the development identity. The credentials file
//!    is never consulted.
//!  * Release builds without a credentials file fall back to the development
//!    identity. This is a soft failure for local and CI builds that lack the
//!    release secrets. The fallback is reported in the evaluation metadata,
//!    so debug-signed release artifacts can be told apart downstream.
//!  * Release builds with a credentials file require all four signing fields
//!    (`keyAlias`, `keyPassword`, `storeFile`, `storePassword`). A missing or
//!    empty field is a hard configuration error that aborts the build before
//!    any packaging work is done.
//!
//! Model
//! -----
//!
//! The resolution itself is a pure function in the [`signing`] module. File
//! access is left to the [`properties`] module, which reads the credentials
//! file exactly once and hands a flat string mapping to the resolver.
//!
//! Static build configuration (SDK levels, namespace, build-type flags) is
//! kept in a TOML manifest usually called `android-signing.toml`, see the
//! [`manifest`] module. It carries no resolution logic and is passed through
//! verbatim.
//!
//! The `android-signing` command-line tool drives the operations in [`op`]
//! and is meant to be invoked from the Gradle build. It either prints the
//! Android Gradle plugin injected signing properties, or writes them to a
//! properties file that the build script loads.

pub mod manifest;
pub mod properties;
pub mod signing;

/// Signing Operations
///
/// The `op` module is a collection of all operations that can be performed via
/// the command-line interface. Each operation is implemented in a submodule
/// and can be used independently.
pub mod op {
    pub mod emit;
    pub mod evaluate;
    pub mod resolve;
}
