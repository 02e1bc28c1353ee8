use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use tracing::debug;

use crate::error::{Result, TransportError};

/// A shared, read-write mapping of one device resource.
///
/// Fields drop in declaration order: the mapping is released before the
/// descriptor is closed.
pub(crate) struct MappedRegion {
    map: MmapMut,
    file: File,
    path: PathBuf,
}

impl MappedRegion {
    /// Open `path` read-write with `O_SYNC` and map `len` bytes shared.
    ///
    /// If mapping fails the descriptor is closed before returning.
    pub(crate) fn open(path: &Path, len: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let map_error = |source: io::Error| TransportError::Map {
            path: path.to_path_buf(),
            source,
        };

        // Regular files shorter than the region would fault on access.
        // Device nodes report no meaningful size and are mapped as-is.
        let metadata = file.metadata().map_err(map_error)?;
        if metadata.is_file() && metadata.len() < len as u64 {
            return Err(map_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("resource is {} bytes, region needs {len}", metadata.len()),
            )));
        }

        // SAFETY: the mapping is private to this value and the resource is
        // only modified through it or by the peer device, which is the
        // shared-memory contract of the backbone.
        let map = unsafe { MmapOptions::new().len(len).map_mut(&file) }.map_err(map_error)?;

        debug!(?path, len, "mapped device resource");
        Ok(Self {
            map,
            file,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.map
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.map
    }

    /// Synchronously flush the first `len` bytes to the device (`MS_SYNC`).
    pub(crate) fn sync(&self, len: usize) -> io::Result<()> {
        self.map.flush_range(0, len.min(self.map.len()))
    }

    pub(crate) fn fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        debug!(path = ?self.path, "releasing device resource");
    }
}

impl std::fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegion")
            .field("path", &self.path)
            .field("len", &self.map.len())
            .finish()
    }
}
