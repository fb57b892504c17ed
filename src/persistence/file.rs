//! File-backed storage.
//!
//! File format:
//! ```text
//! [magic: 4 bytes "QST\0"]
//! [version: 1 byte]
//! [body_len: u64 LE]
//! [body: body_len bytes of JSON]
//! [checksum: u32 LE, crc32 of body]
//! ```
//!
//! Writes go to a temp file which is then renamed over the target, so a crash
//! leaves either the old payload or the new one. A `LOCK` file next to the
//! payload is held exclusively for the lifetime of the storage.

use super::storage::{PersistedState, StateStorage};
use crate::error::{Result, StoreError};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for state files.
const STATE_MAGIC: &[u8; 4] = b"QST\0";

/// Current file format version.
const FILE_VERSION: u8 = 1;

const STATE_FILE: &str = "state.bin";
const TEMP_FILE: &str = "state.bin.tmp";
const LOCK_FILE: &str = "LOCK";

/// Stores the persisted slice in a directory.
pub struct FileStorage {
    dir: PathBuf,
    _lock_file: File,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (creating if needed) the storage directory and lock it.
    ///
    /// Fails with [`StoreError::Locked`] if another storage holds the lock.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let lock_file = Self::acquire_lock(&dir)?;

        Ok(Self {
            dir,
            _lock_file: lock_file,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    fn acquire_lock(dir: &Path) -> Result<File> {
        let lock_file = File::create(dir.join(LOCK_FILE))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;
        Ok(lock_file)
    }

    fn encode(state: &PersistedState) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut bytes = Vec::with_capacity(body.len() + 17);
        bytes.extend_from_slice(STATE_MAGIC);
        bytes.push(FILE_VERSION);
        bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&body);
        bytes.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        Ok(bytes)
    }

    fn decode(mut reader: impl Read) -> Result<PersistedState> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != STATE_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid state file magic".into()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != FILE_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported state file version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        reader.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let expected = u32::from_le_bytes(checksum_bytes);
        let got = crc32fast::hash(&body);
        if expected != got {
            return Err(StoreError::ChecksumMismatch { expected, got });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

impl StateStorage for FileStorage {
    fn save(&self, state: &PersistedState) -> Result<()> {
        let bytes = Self::encode(state)?;
        let _guard = self.write_lock.lock();

        let temp_path = self.dir.join(TEMP_FILE);
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, self.path())?;

        tracing::trace!(path = %self.path().display(), bytes = bytes.len(), "state saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedState>> {
        let file = match File::open(self.path()) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::decode(std::io::BufReader::new(file)).map(Some)
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
