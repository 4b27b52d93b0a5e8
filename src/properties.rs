//! Properties Files
//!
//! This is a rust implementation of the line-oriented key/value format of
//! `java.util.Properties`, which the Android Gradle build uses for its
//! `*.properties` files, including the signing credentials file
//! `key.properties`.
//!
//! Only the flat key/value mapping is exposed. Comments, ordering, and the
//! original escaping of a document are not retained.

/// Properties Errors
///
/// This is the exhaustive list of possible errors raised when loading or
/// parsing properties files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the file at the specified path failed with the given error.
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file at the specified path is not valid UTF-8.
    #[error("{path:?} is not valid UTF-8")]
    Encoding {
        path: std::path::PathBuf,
    },
    /// Malformed `\uXXXX` escape on the specified (1-based) line.
    #[error("malformed unicode escape on line {line}")]
    Escape {
        line: usize,
    },
}

/// Credentials File
///
/// Content of an optional credentials file as read at configuration
/// evaluation time. An absent file is represented with an empty mapping and
/// the existence flag cleared. The content is immutable once loaded.
#[derive(Clone, Default, PartialEq)]
pub struct CredentialsFile {
    exists: bool,
    dir: Option<std::path::PathBuf>,
    entries: std::collections::BTreeMap<String, String>,
}

// Whitespace as understood by the properties format.
fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0c'
}

// Check whether a physical line ends in an unescaped backslash, thus
// continuing on the next line.
fn is_continued(line: &str) -> bool {
    line.chars().rev().take_while(|v| *v == '\\').count() % 2 == 1
}

// Decode four hex digits of a `\uXXXX` escape into a UTF-16 code unit.
fn unescape_unit(
    chars: &mut std::str::Chars,
    line: usize,
) -> Result<u16, Error> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 {
        return Err(Error::Escape { line });
    }
    u16::from_str_radix(&hex, 16).map_err(|_| Error::Escape { line })
}

// Resolve all escape sequences of a key or value.
//
// Surrogate pairs encoded as two consecutive `\uXXXX` escapes are combined
// into a single character. Unpaired surrogates are refused.
fn unescape(raw: &str, line: usize) -> Result<String, Error> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let high = unescape_unit(&mut chars, line)?;
                let mut units = vec![high];

                if (0xd800..0xdc00).contains(&high) {
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err(Error::Escape { line });
                    }
                    units.push(unescape_unit(&mut chars, line)?);
                }

                let decoded = String::from_utf16(&units)
                    .map_err(|_| Error::Escape { line })?;
                out.push_str(&decoded);
            },
            Some(v) => out.push(v),
            // A trailing backslash is a continuation at end-of-input.
            None => {},
        }
    }

    Ok(out)
}

// Split a logical line into its key and value, and store the unescaped pair.
fn parse_logical(
    logical: &str,
    line: usize,
    entries: &mut std::collections::BTreeMap<String, String>,
) -> Result<(), Error> {
    let mut key_end = logical.len();
    let mut escaped = false;

    for (i, c) in logical.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || is_blank(c) {
            key_end = i;
            break;
        }
    }

    // Skip whitespace around a single separator. Whatever remains is the
    // value, including trailing whitespace.
    let mut rest = logical[key_end..].trim_start_matches(is_blank);
    if let Some(v) = rest.strip_prefix(|c: char| c == '=' || c == ':') {
        rest = v.trim_start_matches(is_blank);
    }

    let key = unescape(&logical[..key_end], line)?;
    let value = unescape(rest, line)?;
    entries.insert(key, value);

    Ok(())
}

/// Parse properties from string
///
/// Parse the given string as a properties document and return the flat
/// key/value mapping. Later assignments to the same key replace earlier ones.
pub fn parse(
    content: &str,
) -> Result<std::collections::BTreeMap<String, String>, Error> {
    let mut entries = std::collections::BTreeMap::new();
    let mut logical = String::new();
    let mut continuing = false;
    let mut start = 0;

    let normalized = content.replace("\r\n", "\n");
    let physical = normalized.split(|c: char| c == '\n' || c == '\r');

    for (idx, line) in physical.enumerate() {
        let line = line.trim_start_matches(is_blank);

        // Comments and blank lines only count outside of continuations.
        if !continuing {
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            start = idx + 1;
        }

        if is_continued(line) {
            logical.push_str(&line[..line.len() - 1]);
            continuing = true;
            continue;
        }

        logical.push_str(line);
        continuing = false;
        parse_logical(&logical, start, &mut entries)?;
        logical.clear();
    }

    if continuing {
        parse_logical(&logical, start, &mut entries)?;
    }

    Ok(entries)
}

// Escape a key or value for inclusion in a properties document.
//
// Spaces are escaped everywhere in keys, but only in leading position in
// values. Everything outside of printable ASCII is written as `\uXXXX`.
fn escape(s: &str, key: bool, out: &mut String) {
    for (i, c) in s.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            ' ' if key || i == 0 => out.push_str("\\ "),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            },
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04X}", unit));
                }
            },
        }
    }
}

/// Render properties document
///
/// Write the given key/value pairs as a properties document, preserving their
/// order. Each line of the optional header is written as a comment. The
/// output parses back into the same mapping via [`parse()`].
pub fn render<'a>(
    header: Option<&str>,
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut out = String::new();

    if let Some(header) = header {
        for line in header.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }

    for (key, value) in entries {
        escape(key, true, &mut out);
        out.push('=');
        escape(value, false, &mut out);
        out.push('\n');
    }

    out
}

// Print keys only, never values. Values are signing secrets.
impl std::fmt::Debug for CredentialsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsFile")
            .field("exists", &self.exists)
            .field("dir", &self.dir)
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CredentialsFile {
    /// Create an absent credentials file
    ///
    /// This represents a credentials file that does not exist. Its mapping
    /// is empty.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Create a present credentials file
    ///
    /// This represents an existing credentials file with the given content.
    /// No base directory is recorded, so relative key-store paths stay
    /// relative.
    pub fn present(entries: std::collections::BTreeMap<String, String>) -> Self {
        Self {
            exists: true,
            dir: None,
            entries: entries,
        }
    }

    /// Load credentials file from file-system
    ///
    /// Read the file at the given path. A missing file is not an error but
    /// yields an absent credentials file. The file is completely read into
    /// memory and closed again before its content is parsed.
    pub fn load(path: &std::path::Path) -> Result<Self, Error> {
        let bytes = match std::fs::read(path) {
            Ok(v) => v,
            Err(v) if v.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "credentials file absent");
                return Ok(Self::absent());
            },
            Err(v) => {
                return Err(Error::Io { path: path.to_path_buf(), source: v });
            },
        };

        let content = String::from_utf8(bytes)
            .map_err(|_| Error::Encoding { path: path.to_path_buf() })?;
        let entries = parse(&content)?;

        tracing::debug!(
            path = %path.display(),
            keys = entries.len(),
            "credentials file loaded"
        );

        Ok(
            Self {
                exists: true,
                dir: path.parent().map(|v| v.to_path_buf()),
                entries: entries,
            }
        )
    }

    /// Return whether the credentials file exists
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Return the directory containing the credentials file, if known
    pub fn dir(&self) -> Option<&std::path::Path> {
        self.dir.as_deref()
    }

    /// Look up a key
    ///
    /// Return the value assigned to `key`, or `None` if it is not assigned.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.as_str())
    }
}
