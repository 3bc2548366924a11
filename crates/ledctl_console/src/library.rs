// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence library persisted as a RON file.
//!
//! Wraps an in-memory store and writes the whole library back after every
//! change. Binary sequence files are imported by parsing their header; the
//! file itself stays where it is and is referenced by path.

use ledctl_sequencer::{
    parse_binary_sequence, BinaryMetadata, BinarySequence, MemoryStore, ParseError, Sequence,
    SequenceId, SequenceStore, SequenceType, StoreError, StoreResult,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current library format version
pub const LIBRARY_FORMAT_VERSION: u32 = 1;

/// Extensions probed for a companion audio track
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg"];

/// Errors opening or saving the library file
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// Reading or writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a valid library
    #[error("Invalid library file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Library could not be written as RON
    #[error("Failed to serialize library: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer version
    #[error("Library version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// Two entries share an ID
    #[error("Library contains duplicate sequence {0}")]
    Duplicate(SequenceId),

    /// Store rejected an entry
    #[error(transparent)]
    Store(StoreError),
}

/// Errors importing a binary sequence file
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// File could not be read
    #[error("cannot read {path:?}: {source}")]
    Io {
        /// File being imported
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File header is malformed
    #[error("rejected {path:?}: {source}")]
    Rejected {
        /// File being imported
        path: PathBuf,
        /// Structural defect found
        source: ParseError,
    },

    /// File name has no usable stem to derive an ID from
    #[error("cannot derive a sequence name from {0:?}")]
    NoName(PathBuf),

    /// Library refused the sequence
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryDocument {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    sequences: Vec<Sequence>,
}

/// RON-backed sequence store
#[derive(Debug)]
pub struct LibraryFile {
    path: PathBuf,
    store: MemoryStore,
}

impl LibraryFile {
    /// Open a library, starting empty if the file does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let path = path.into();
        if !path.exists() {
            tracing::info!("No library at {:?}, starting empty", path);
            return Ok(Self { path, store: MemoryStore::new() });
        }

        let content = std::fs::read_to_string(&path)?;
        let document: LibraryDocument = ron::from_str(&content)?;

        if document.version > LIBRARY_FORMAT_VERSION {
            return Err(LibraryError::UnsupportedVersion {
                found: document.version,
                supported: LIBRARY_FORMAT_VERSION,
            });
        }

        let mut store = MemoryStore::new();
        for sequence in document.sequences {
            store.create_sequence(sequence).map_err(|e| match e {
                StoreError::AlreadyExists(id) => LibraryError::Duplicate(id),
                other => LibraryError::Store(other),
            })?;
        }

        tracing::info!("Loaded {} sequence(s) from {:?}", store.len(), path);
        Ok(Self { path, store })
    }

    /// Write the library back to disk
    pub fn save(&self) -> Result<(), LibraryError> {
        let document = LibraryDocument {
            version: LIBRARY_FORMAT_VERSION,
            sequences: self.store.iter().cloned().collect(),
        };

        let config = ron::ser::PrettyConfig::default().struct_names(true);
        let content = ron::ser::to_string_pretty(&document, config)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Library file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Iterate over all sequences
    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.store.iter()
    }

    /// Parse a binary sequence file and add it to the library.
    ///
    /// The sequence ID is the file stem. Re-importing a file replaces the
    /// earlier binary sequence of the same name; a step sequence with that
    /// ID is never overwritten.
    pub fn import_binary(&mut self, path: &Path) -> Result<SequenceId, ImportError> {
        let metadata = read_metadata(path)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ImportError::NoName(path.to_path_buf()))?;
        let id = SequenceId::from(stem);

        let existing = self.store.get_sequence(&id)?;
        if let Some(existing) = &existing {
            if existing.sequence_type() != SequenceType::Binary {
                return Err(ImportError::Store(StoreError::AlreadyExists(id)));
            }
        }

        let mut body = BinarySequence::new(path, metadata);
        body.audio_file = companion_audio(path);
        if let Some(previous) = existing.as_ref().and_then(Sequence::binary_body) {
            body.looping = previous.looping;
        }

        let mut sequence = Sequence::binary(stem, body).with_id(id.clone());
        if let Some(existing) = existing {
            sequence.created_at = existing.created_at;
            sequence.description = existing.description;
        }

        self.commit(|store| {
            store.put_sequence(sequence);
            Ok(())
        })?;

        tracing::info!(
            "Imported {:?} as {} ({} channels, {} frames, {} s)",
            path,
            id,
            metadata.channel_count(),
            metadata.frame_count(),
            metadata.duration_secs()
        );
        Ok(id)
    }

    /// Apply `change` to the in-memory store and save. If the save fails the
    /// store is rolled back, so memory never holds unsaved changes.
    fn commit<T>(&mut self, change: impl FnOnce(&mut MemoryStore) -> StoreResult<T>) -> StoreResult<T> {
        let snapshot = self.store.clone();
        let value = change(&mut self.store)?;

        if let Err(e) = self.save() {
            tracing::error!("Failed to save library {:?}: {}", self.path, e);
            self.store = snapshot;
            return Err(StoreError::Unavailable(e.to_string()));
        }
        Ok(value)
    }
}

impl SequenceStore for LibraryFile {
    fn get_sequence(&self, id: &SequenceId) -> StoreResult<Option<Sequence>> {
        self.store.get_sequence(id)
    }

    fn list_sequences(&self) -> StoreResult<Vec<Sequence>> {
        self.store.list_sequences()
    }

    fn create_sequence(&mut self, sequence: Sequence) -> StoreResult<SequenceId> {
        self.commit(|store| store.create_sequence(sequence))
    }

    fn update_step_sequence(&mut self, sequence: Sequence) -> StoreResult<()> {
        self.commit(|store| store.update_step_sequence(sequence))
    }

    fn delete_sequence(&mut self, id: &SequenceId) -> StoreResult<Sequence> {
        self.commit(|store| store.delete_sequence(id))
    }
}

/// Read a file and validate its header without importing it
pub fn read_metadata(path: &Path) -> Result<BinaryMetadata, ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_binary_sequence(&bytes).map_err(|source| ImportError::Rejected {
        path: path.to_path_buf(),
        source,
    })
}

/// Sibling audio file sharing the sequence file's stem
fn companion_audio(path: &Path) -> Option<PathBuf> {
    AUDIO_EXTENSIONS
        .iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}
