// src/packages/archive.rs

//! Package artifact extraction
//!
//! Artifacts are tarballs, optionally compressed with gzip, xz or zstd.
//! The compression is detected from the file extension and, failing that,
//! from the leading magic bytes.

use super::traits::Extractor;
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tar::Archive;
use tracing::{debug, info};
use xz2::read::XzDecoder;

/// Offset of the `ustar` marker in a tar header
const USTAR_OFFSET: usize = 257;

/// Artifact compression format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression from extension, then from magic bytes
    pub fn detect(path: &Path) -> Result<Self> {
        if let Some(compression) = Self::from_extension(path) {
            return Ok(compression);
        }

        let mut file = File::open(path)
            .map_err(|e| Error::ExtractError(format!("Failed to open {}: {}", path.display(), e)))?;
        let mut magic = Vec::with_capacity(USTAR_OFFSET + 5);
        file.by_ref()
            .take((USTAR_OFFSET + 5) as u64)
            .read_to_end(&mut magic)
            .map_err(|e| Error::ExtractError(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::from_magic(&magic).ok_or_else(|| {
            Error::ExtractError(format!(
                "Unable to detect archive format for: {}",
                path.display()
            ))
        })
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Compression::Gzip)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Compression::Xz)
        } else if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
            Some(Compression::Zstd)
        } else if name.ends_with(".tar") {
            Some(Compression::None)
        } else {
            None
        }
    }

    fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(&[0x1F, 0x8B]) {
            Some(Compression::Gzip)
        } else if magic.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
            Some(Compression::Xz)
        } else if magic.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
            Some(Compression::Zstd)
        } else if magic.get(USTAR_OFFSET..USTAR_OFFSET + 5) == Some(b"ustar".as_slice()) {
            Some(Compression::None)
        } else {
            None
        }
    }
}

/// Extracts tarballs with the `tar` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct TarExtractor;

impl TarExtractor {
    /// Open and decompress the archive
    fn open_archive(path: &Path) -> Result<Archive<Box<dyn Read>>> {
        let compression = Compression::detect(path)?;
        debug!("Detected {:?} compression for {}", compression, path.display());

        let file = File::open(path).map_err(|e| {
            Error::ExtractError(format!("Failed to open package file {}: {}", path.display(), e))
        })?;

        let reader: Box<dyn Read> = match compression {
            Compression::None => Box::new(file),
            Compression::Gzip => Box::new(GzDecoder::new(file)),
            Compression::Xz => Box::new(XzDecoder::new(file)),
            Compression::Zstd => {
                let decoder = zstd::Decoder::new(file).map_err(|e| {
                    Error::ExtractError(format!("Failed to create zstd decoder: {}", e))
                })?;
                Box::new(decoder)
            }
        };

        Ok(Archive::new(reader))
    }
}

impl Extractor for TarExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        info!("Extracting {} into {}", archive.display(), dest_dir.display());

        fs::create_dir_all(dest_dir).map_err(|e| {
            Error::IoError(format!("Failed to create directory {}: {}", dest_dir.display(), e))
        })?;

        let mut tarball = Self::open_archive(archive)?;
        tarball.set_preserve_permissions(true);
        tarball.unpack(dest_dir).map_err(|e| {
            Error::ExtractError(format!("Failed to unpack {}: {}", archive.display(), e))
        })?;

        debug!("Extraction of {} complete", archive.display());
        Ok(())
    }
}
