//! Input validation: make sure a user-supplied path is a readable PDF before
//! pdfium sees it.
//!
//! Checking the `%PDF` magic bytes up front turns "pdfium could not parse
//! this" into an error that names the actual problem.

use crate::error::Pdf2BwError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Validate a local PDF path: it must exist, be readable and start with
/// `%PDF`.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<PathBuf, Pdf2BwError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(Pdf2BwError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(Pdf2BwError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2BwError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2BwError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Spill in-memory PDF bytes to a managed temporary file.
///
/// The file is deleted when the returned handle is dropped.
pub fn spill_to_tempfile(bytes: &[u8]) -> Result<NamedTempFile, Pdf2BwError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(Pdf2BwError::NotAPdf {
            path: PathBuf::from("<memory>"),
            magic,
        });
    }

    let mut tmp =
        NamedTempFile::new().map_err(|e| Pdf2BwError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| Pdf2BwError::Internal(format!("tempfile write: {e}")))?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local("/definitely/not/a/real/file.pdf").unwrap_err();
        assert!(matches!(err, Pdf2BwError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected_with_magic() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"\x89PNG rest of file").unwrap();
        match resolve_local(tmp.path()).unwrap_err() {
            Pdf2BwError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7\n%fake body").unwrap();
        let resolved = resolve_local(tmp.path()).unwrap();
        assert_eq!(resolved, tmp.path());
    }

    #[test]
    fn spilled_bytes_are_readable() {
        let tmp = spill_to_tempfile(b"%PDF-1.4 minimal").unwrap();
        assert_eq!(std::fs::read(tmp.path()).unwrap(), b"%PDF-1.4 minimal");
    }

    #[test]
    fn spilling_non_pdf_bytes_fails() {
        assert!(matches!(
            spill_to_tempfile(b"GIF89a..."),
            Err(Pdf2BwError::NotAPdf { .. })
        ));
    }
}
