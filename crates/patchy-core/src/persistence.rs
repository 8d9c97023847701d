//! Reading and writing patch documents.
//!
//! A patch is stored as JSON: an object mapping each output port to an
//! object whose keys are the connected input ports, each set to `true`.
//!
//! ```json
//! {"system:capture_1":{"system:playback_1":true}}
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::patch::Patch;

/// Where a patch document is read from or written to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PatchLocation {
    /// Standard input when reading, standard output when writing
    #[default]
    Stdio,
    File(PathBuf),
}

impl PatchLocation {
    /// Interpret a command-line argument. `None` and `-` select standard streams.
    #[must_use]
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("" | "-") => Self::Stdio,
            Some(path) => Self::File(PathBuf::from(path)),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::Stdio => Path::new("-"),
            Self::File(path) => path,
        }
    }
}

impl fmt::Display for PatchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("standard stream"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Output layout for written documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentStyle {
    /// Single line
    #[default]
    Compact,
    /// Indented, one port per line
    Pretty,
}

/// Write `patch` to `writer` followed by a newline.
///
/// # Errors
/// Returns an error if the writer fails.
pub fn write_patch<W: Write>(patch: &Patch, mut writer: W, style: DocumentStyle) -> Result<()> {
    match style {
        DocumentStyle::Compact => serde_json::to_writer(&mut writer, patch),
        DocumentStyle::Pretty => serde_json::to_writer_pretty(&mut writer, patch),
    }
    .map_err(json_error)?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|source| Error::Io { path: PathBuf::from("-"), source })
}

/// Read a patch document from `reader`.
///
/// # Errors
/// [`Error::Parse`] if the input is not a well-formed patch document.
pub fn read_patch<R: Read>(reader: R) -> Result<Patch> {
    serde_json::from_reader(reader).map_err(json_error)
}

/// Load a patch from a file or standard input.
///
/// # Errors
/// [`Error::Io`] if the file cannot be opened, [`Error::Parse`] if its
/// contents are malformed.
pub fn load(location: &PatchLocation) -> Result<Patch> {
    debug!(%location, "Loading patch");
    let patch = match location {
        PatchLocation::Stdio => read_patch(io::stdin().lock()),
        PatchLocation::File(path) => {
            let file = File::open(path).map_err(|source| io_error(location, source))?;
            read_patch(BufReader::new(file))
        }
    }
    .map_err(|e| relocate(e, location))?;
    debug!(connections = patch.len(), "Patch loaded");
    Ok(patch)
}

/// Store a patch to a file or standard output.
///
/// # Errors
/// [`Error::Io`] if the file cannot be created or written.
pub fn store(patch: &Patch, location: &PatchLocation, style: DocumentStyle) -> Result<()> {
    debug!(%location, connections = patch.len(), "Storing patch");
    match location {
        PatchLocation::Stdio => write_patch(patch, io::stdout().lock(), style),
        PatchLocation::File(path) => {
            let file = File::create(path).map_err(|source| io_error(location, source))?;
            write_patch(patch, BufWriter::new(file), style)
        }
    }
    .map_err(|e| relocate(e, location))
}

/// Split stream failures from syntax errors.
fn json_error(error: serde_json::Error) -> Error {
    if error.is_io() {
        Error::Io { path: PathBuf::from("-"), source: io::Error::from(error) }
    } else {
        Error::Parse(error)
    }
}

fn io_error(location: &PatchLocation, source: io::Error) -> Error {
    Error::Io { path: location.path().to_path_buf(), source }
}

/// Attach the real location to I/O errors raised by the stream helpers.
fn relocate(error: Error, location: &PatchLocation) -> Error {
    match error {
        Error::Io { source, .. } => io_error(location, source),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    use super::*;

    fn sample() -> Patch {
        let mut patch = Patch::new();
        patch.insert("a_out", "c_in");
        patch.insert("a_out", "b_in");
        patch.insert("d_out", "b_in");
        patch
    }

    #[test]
    fn test_compact_document() {
        let mut out = Vec::new();
        write_patch(&sample(), &mut out, DocumentStyle::Compact).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"a_out\":{\"b_in\":true,\"c_in\":true},\"d_out\":{\"b_in\":true}}\n"
        );
    }

    #[test]
    fn test_pretty_document_reads_back() {
        let mut out = Vec::new();
        write_patch(&sample(), &mut out, DocumentStyle::Pretty).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.lines().count() > 1);
        assert_eq!(read_patch(out.as_slice()).unwrap(), sample());
    }

    #[test]
    fn test_empty_patch_document() {
        let mut out = Vec::new();
        write_patch(&Patch::new(), &mut out, DocumentStyle::Compact).unwrap();

        assert_eq!(out, b"{}\n");
        assert!(read_patch(out.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_documents_are_parse_errors() {
        for input in [
            "",
            "{\"a_out\":{\"b_in\":tr",
            "[]",
            "null",
            "\"a_out\"",
            "{\"a_out\":[\"b_in\"]}",
            "{\"a_out\":{\"b_in\":1}}",
        ] {
            assert_matches!(read_patch(input.as_bytes()), Err(Error::Parse(_)), "input {input:?}");
        }
    }

    #[test]
    fn test_location_from_arg() {
        assert_eq!(PatchLocation::from_arg(None), PatchLocation::Stdio);
        assert_eq!(PatchLocation::from_arg(Some("-")), PatchLocation::Stdio);
        assert_eq!(
            PatchLocation::from_arg(Some("studio.json")),
            PatchLocation::File(PathBuf::from("studio.json"))
        );
    }

    #[test]
    fn test_store_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let location = PatchLocation::File(dir.path().join("studio.json"));

        store(&sample(), &location, DocumentStyle::Compact).unwrap();

        assert_eq!(load(&location).unwrap(), sample());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = load(&PatchLocation::File(path.clone())).unwrap_err();

        assert_matches!(err, Error::Io { path: p, .. } if p == path);
    }

    #[test]
    fn test_store_into_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let location = PatchLocation::File(dir.path().join("no/such/dir/patch.json"));

        assert_matches!(store(&sample(), &location, DocumentStyle::Compact), Err(Error::Io { .. }));
    }

    fn port_name() -> impl Strategy<Value = String> {
        "[a-z]{1,6}:[a-z_]{1,8}[0-9]?"
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            pairs in proptest::collection::vec((port_name(), port_name()), 0..24),
            pretty in any::<bool>(),
        ) {
            let patch: Patch = pairs
                .into_iter()
                .map(|(output, input)| crate::patch::Connection::new(output, input))
                .collect();
            let style = if pretty { DocumentStyle::Pretty } else { DocumentStyle::Compact };

            let mut out = Vec::new();
            write_patch(&patch, &mut out, style).unwrap();

            prop_assert_eq!(read_patch(out.as_slice()).unwrap(), patch);
        }
    }
}
