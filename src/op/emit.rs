//! Emit Injected Signing Properties
//!
//! The Android Gradle plugin accepts a signing identity through the injected
//! `android.injected.signing.*` project properties, overriding the signing
//! configuration of the build script. The `emit` operation writes these
//! properties to a file the Gradle build loads, or removes the file if the
//! variant is signed with the debug identity.

/// Injected property of the key-store path.
pub const INJECTED_STORE_FILE: &str = "android.injected.signing.store.file";
/// Injected property of the key-store password.
pub const INJECTED_STORE_PASSWORD: &str = "android.injected.signing.store.password";
/// Injected property of the signing key alias.
pub const INJECTED_KEY_ALIAS: &str = "android.injected.signing.key.alias";
/// Injected property of the password for the alias.
pub const INJECTED_KEY_PASSWORD: &str = "android.injected.signing.key.password";

/// Emit Errors
///
/// This is the exhaustive list of possible errors raised by the emit
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Creation of the directory at the specified path failed.
    #[error("cannot create directory {0:?}")]
    DirectoryCreation(std::ffi::OsString),
    /// Updating the file at the specified path failed with the given error.
    #[error("cannot update {0:?}: {1}")]
    FileUpdate(std::ffi::OsString, std::io::Error),
    /// Removing the file at the specified path failed with the given error.
    #[error("cannot remove {0:?}: {1}")]
    FileRemoval(std::ffi::OsString, std::io::Error),
}

/// Emit Outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The properties file was written.
    Written,
    /// The properties file was removed, or did not exist.
    Removed,
}

// Update a file if required
//
// This writes the given content to the specified file, but only if the file
// content does not already match the new content. This avoids modifying a file
// unless necessary. Thus, the file timestamp is only modified if the content
// really changed.
//
// Note that this reads in the entire file content. Thus, use it only on
// trusted content.
fn update_file(
    path: &std::path::Path,
    content: &str,
) -> Result<(), Error> {
    let mut f = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(
            |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
        )?;

    let mut old = String::new();
    <std::fs::File as std::io::Read>::read_to_string(&mut f, &mut old)
        .map_err(
            |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
        )?;

    if old != content {
        <std::fs::File as std::io::Seek>::rewind(&mut f)
            .map_err(
                |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
            )?;

        f.set_len(0).map_err(
            |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
        )?;

        <std::fs::File as std::io::Write>::write_all(&mut f, content.as_bytes())
            .map_err(
                |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
            )?;
    }

    // Sync the file now to ensure errors are caught properly.
    f.sync_all().map_err(
        |v| Error::FileUpdate(path.as_os_str().to_os_string(), v),
    )?;

    Ok(())
}

// Unlink file if it exists
//
// Unlink the file at the specified path, but only if it exists. This is
// effectively like `std::fs::remove_file()`, but ignores errors about missing
// files.
fn unlink_file(path: &std::path::Path) -> Result<(), Error> {
    match std::fs::remove_file(path) {
        Err(v) if v.kind() != std::io::ErrorKind::NotFound => {
            Err(Error::FileRemoval(path.as_os_str().to_os_string(), v))
        },
        _ => {
            Ok(())
        }
    }
}

/// Render injected signing properties
///
/// Return the properties document carrying the given release identity, with
/// its key-store path resolved against `base`. The debug identity has no
/// properties and yields `None`.
pub fn render(
    resolution: &crate::signing::Resolution,
    base: Option<&std::path::Path>,
) -> Option<String> {
    let identity = resolution.identity()?;
    let store = identity.key_store_location(base);
    let store = store.to_string_lossy();

    Some(
        crate::properties::render(
            Some("Generated by android-signing"),
            [
                (INJECTED_STORE_FILE, &*store),
                (INJECTED_STORE_PASSWORD, identity.key_store_password()),
                (INJECTED_KEY_ALIAS, identity.alias()),
                (INJECTED_KEY_PASSWORD, identity.alias_password()),
            ],
        )
    )
}

/// Emit injected signing properties
///
/// Write the injected signing properties of a release identity to `path`,
/// creating parent directories as needed. For the debug identity, a stale
/// file at `path` is removed, so the Gradle build falls back to its own
/// debug signing configuration.
pub fn emit(
    resolution: &crate::signing::Resolution,
    base: Option<&std::path::Path>,
    path: &std::path::Path,
) -> Result<Outcome, Error> {
    let Some(content) = render(resolution, base) else {
        unlink_file(path)?;
        tracing::debug!(path = %path.display(), "removed injected signing properties");
        return Ok(Outcome::Removed);
    };

    if let Some(dir) = path.parent().filter(|v| !v.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(
            |_| Error::DirectoryCreation(dir.as_os_str().to_os_string())
        )?;
    }

    update_file(path, &content)?;
    tracing::debug!(path = %path.display(), "wrote injected signing properties");

    Ok(Outcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::CredentialsFile;
    use crate::signing::{resolve, BuildVariant, Resolution};

    fn release() -> Resolution {
        let entries = [
            ("keyAlias", "app"),
            ("keyPassword", "p1"),
            ("storeFile", "release.jks"),
            ("storePassword", "p2"),
        ];
        let file = CredentialsFile::present(
            entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        );

        resolve(BuildVariant::Release, &file).unwrap()
    }

    // Verify rendering
    //
    // The release identity renders into the four injected properties, the
    // debug identity into nothing.
    #[test]
    fn render_identity() {
        let base = std::path::Path::new("/keys");
        let s = render(&release(), Some(base)).unwrap();
        let m = crate::properties::parse(&s).unwrap();

        assert_eq!(m.len(), 4);
        assert_eq!(m[INJECTED_STORE_FILE], base.join("release.jks").to_string_lossy());
        assert_eq!(m[INJECTED_STORE_PASSWORD], "p2");
        assert_eq!(m[INJECTED_KEY_ALIAS], "app");
        assert_eq!(m[INJECTED_KEY_PASSWORD], "p1");

        assert_eq!(render(&Resolution::DEBUG_DEFAULT, Some(base)), None);
    }

    // Verify writing and removal
    //
    // Emitting the release identity writes the file, including missing
    // parent directories. Emitting the debug identity removes it again, and
    // tolerates it being absent.
    #[test]
    fn emit_write_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build/signing.properties");

        assert_eq!(emit(&release(), None, &path).unwrap(), Outcome::Written);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Generated by android-signing\n"));
        assert!(content.contains("android.injected.signing.key.alias=app\n"));

        assert_eq!(emit(&release(), None, &path).unwrap(), Outcome::Written);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);

        assert_eq!(emit(&Resolution::DEBUG_DEFAULT, None, &path).unwrap(), Outcome::Removed);
        assert!(!path.exists());
        assert_eq!(emit(&Resolution::DEBUG_DEFAULT, None, &path).unwrap(), Outcome::Removed);
    }
}
