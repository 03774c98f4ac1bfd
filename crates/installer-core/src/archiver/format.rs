//! Archive format detection by content sniffing

use crate::error::{InstallerError, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const SNIFF_LEN: u64 = 512;
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_MAGIC: &[u8] = &[0x50, 0x4b, 0x03, 0x04];
const USTAR_OFFSET: usize = 257;
const USTAR_MAGIC: &[u8] = b"ustar";
// Pre-POSIX tar headers leave the magic field zeroed.
const LEGACY_TAR_MAGIC: &[u8] = &[0; 5];

/// Archive formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }

    /// Identify a format from the leading bytes of a file
    pub fn from_header(header: &[u8]) -> Option<Self> {
        if header.starts_with(GZIP_MAGIC) {
            return Some(ArchiveFormat::TarGz);
        }

        if let Some(magic) = header.get(USTAR_OFFSET..USTAR_OFFSET + USTAR_MAGIC.len()) {
            if magic == USTAR_MAGIC || magic == LEGACY_TAR_MAGIC {
                return Some(ArchiveFormat::Tar);
            }
        }

        if header.starts_with(ZIP_MAGIC) {
            return Some(ArchiveFormat::Zip);
        }

        None
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read the first 512 bytes of `path` and detect its format
pub fn detect_format(path: &Path) -> Result<Option<ArchiveFormat>> {
    let read_error = |source| InstallerError::ReadError {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_error)?;
    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN)
        .read_to_end(&mut header)
        .map_err(read_error)?;

    Ok(ArchiveFormat::from_header(&header))
}
