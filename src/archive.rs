//! Archive extraction for the aggregation stage.
//!
//! Results and test cases arrive as directory-tree tar archives, optionally
//! gzip-compressed. Extraction is a hard precondition of aggregation: any
//! failure here aborts the run before a single row is written.

use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::info;

use crate::error::ArchiveError;

/// Extracts `archive` into `dest`.
///
/// Gzip compression is sniffed from the `.gz`/`.tgz` extension; any other
/// extension is read as a plain tar stream.
pub fn extract(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    info!(archive = %archive.display(), dest = %dest.display(), "Extracting archive");

    let file = File::open(archive).map_err(|source| ArchiveError::Open {
        path: archive.to_path_buf(),
        source,
    })?;

    let extract_err = |source| ArchiveError::Extract {
        path: archive.to_path_buf(),
        source,
    };

    if is_gzip(archive) {
        tar::Archive::new(GzDecoder::new(file))
            .unpack(dest)
            .map_err(extract_err)
    } else {
        tar::Archive::new(file).unpack(dest).map_err(extract_err)
    }
}

fn is_gzip(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"),
        None => false,
    }
}
