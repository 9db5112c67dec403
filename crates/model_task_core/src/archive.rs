use std::fs;
use std::io::Cursor;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveError {
    message: String,
}

impl ArchiveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ArchiveError {}

/// Extract a tar or tar-gzip archive into `dest`.
///
/// Compression is detected from the gzip magic bytes so plain tarballs are
/// accepted as well.
pub fn unpack_archive(bytes: &[u8], dest: &Path) -> Result<(), ArchiveError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        tar::Archive::new(GzDecoder::new(Cursor::new(bytes)))
            .unpack(dest)
            .map_err(|error| ArchiveError::new(format!("Failed to extract archive: {error}")))
    } else {
        tar::Archive::new(Cursor::new(bytes))
            .unpack(dest)
            .map_err(|error| ArchiveError::new(format!("Failed to extract archive: {error}")))
    }
}

/// Package the entries of `dir` into a tar-gzip archive.
///
/// Entries are added in name order with archive paths relative to `dir`;
/// directories are added recursively.
pub fn pack_directory(dir: &Path) -> Result<Vec<u8>, ArchiveError> {
    let mut names = Vec::new();
    let entries = fs::read_dir(dir)
        .map_err(|error| ArchiveError::new(format!("Failed to list output directory: {error}")))?;
    for entry in entries {
        let entry = entry.map_err(|error| {
            ArchiveError::new(format!("Failed to list output directory: {error}"))
        })?;
        let name = entry.file_name().into_string().map_err(|name| {
            ArchiveError::new(format!("Output file name is not valid UTF-8: {name:?}"))
        })?;
        names.push(name);
    }
    names.sort_unstable();

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for name in &names {
        let path = dir.join(name);
        let appended = if path.is_dir() {
            builder.append_dir_all(name, &path)
        } else {
            builder.append_path_with_name(&path, name)
        };
        appended
            .map_err(|error| ArchiveError::new(format!("Failed to archive '{name}': {error}")))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|error| ArchiveError::new(format!("Failed to finalize archive: {error}")))?;
    encoder
        .finish()
        .map_err(|error| ArchiveError::new(format!("Failed to finalize archive: {error}")))
}

/// Decode a base64 event body into raw archive bytes.
pub fn decode_body(text: &str) -> Result<Vec<u8>, ArchiveError> {
    STANDARD
        .decode(text.trim())
        .map_err(|error| ArchiveError::new(format!("Request body is not valid base64: {error}")))
}

/// Encode raw archive bytes as a base64 response body.
pub fn encode_body(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_files(dir: &Path, files: &[(&str, &str)]) {
        for (name, content) in files {
            fs::write(dir.join(name), content).expect("test file should write");
        }
    }

    fn read_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("directory should list")
            .map(|entry| {
                entry
                    .expect("entry should read")
                    .file_name()
                    .into_string()
                    .expect("name should be UTF-8")
            })
            .collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn pack_then_unpack_preserves_names_and_contents() {
        let source = TempDir::new().expect("tempdir should create");
        write_files(source.path(), &[("greet.txt", "Greet\n"), ("hello.txt", "Hello\n")]);

        let archive = pack_directory(source.path()).expect("directory should pack");
        assert!(archive.starts_with(&GZIP_MAGIC));

        let dest = TempDir::new().expect("tempdir should create");
        unpack_archive(&archive, dest.path()).expect("archive should unpack");

        assert_eq!(read_names(dest.path()), vec!["greet.txt", "hello.txt"]);
        assert_eq!(
            fs::read_to_string(dest.path().join("greet.txt")).expect("file should read"),
            "Greet\n"
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("hello.txt")).expect("file should read"),
            "Hello\n"
        );
    }

    #[test]
    fn pack_recurses_into_subdirectories() {
        let source = TempDir::new().expect("tempdir should create");
        fs::create_dir(source.path().join("output")).expect("subdir should create");
        fs::write(source.path().join("output").join("result.nc"), "netcdf")
            .expect("test file should write");
        write_files(source.path(), &[("model.log", "done\n")]);

        let archive = pack_directory(source.path()).expect("directory should pack");
        let dest = TempDir::new().expect("tempdir should create");
        unpack_archive(&archive, dest.path()).expect("archive should unpack");

        assert_eq!(read_names(dest.path()), vec!["model.log", "output"]);
        assert_eq!(
            fs::read_to_string(dest.path().join("output").join("result.nc"))
                .expect("file should read"),
            "netcdf"
        );
    }

    #[test]
    fn unpacks_plain_uncompressed_tar() {
        let source = TempDir::new().expect("tempdir should create");
        write_files(source.path(), &[("input.nml", "&config /\n")]);

        let mut builder = tar::Builder::new(Vec::new());
        builder
            .append_path_with_name(source.path().join("input.nml"), "input.nml")
            .expect("entry should append");
        let plain_tar = builder.into_inner().expect("archive should finalize");

        let dest = TempDir::new().expect("tempdir should create");
        unpack_archive(&plain_tar, dest.path()).expect("plain tar should unpack");
        assert_eq!(
            fs::read_to_string(dest.path().join("input.nml")).expect("file should read"),
            "&config /\n"
        );
    }

    #[test]
    fn rejects_truncated_archive() {
        let dest = TempDir::new().expect("tempdir should create");
        let error =
            unpack_archive(&[0x1f, 0x8b, 0x00], dest.path()).expect_err("archive should fail");
        assert!(error.message().starts_with("Failed to extract archive"));
    }

    #[test]
    fn body_codec_round_trips() {
        let encoded = encode_body(b"model input bytes");
        assert_eq!(
            decode_body(&encoded).expect("body should decode"),
            b"model input bytes"
        );
    }

    #[test]
    fn rejects_invalid_base64_body() {
        let error = decode_body("not base64!!").expect_err("body should fail");
        assert!(error.message().starts_with("Request body is not valid base64"));
    }
}
