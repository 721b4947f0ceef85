use crate::{error::InternalError, sort::SortConfig};
use derive_more::Display;
use std::{
    collections::{BTreeMap, HashMap},
    fs::{self, File},
    io::{BufReader, BufWriter, Cursor, Read, Write},
    path::PathBuf,
    sync::Arc,
};
use tempfile::TempDir;

///
/// SegmentId
///
/// Storage-local identifier of one spilled run segment.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("segment-{_0}")]
pub struct SegmentId(u64);

impl SegmentId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

///
/// SpillStorage
///
/// Temporary storage for sorted run segments.
/// A sealed segment stays re-readable until it is explicitly deleted.
/// Each instance is owned by exactly one sorter.
///

pub trait SpillStorage {
    type Reader: Read;

    /// Build the storage a sorter will own, from its config.
    fn provision(config: &SortConfig) -> Result<Self, InternalError>
    where
        Self: Sized;

    /// Start a new, empty segment.
    fn create(&mut self) -> Result<SegmentId, InternalError>;

    /// Append bytes to an unsealed segment.
    fn append(&mut self, id: SegmentId, bytes: &[u8]) -> Result<(), InternalError>;

    /// Finish writing a segment and return its size in bytes.
    fn seal(&mut self, id: SegmentId) -> Result<u64, InternalError>;

    /// Open a sealed segment for sequential reading.
    fn open(&self, id: SegmentId) -> Result<Self::Reader, InternalError>;

    /// Remove a segment and release its storage.
    fn delete(&mut self, id: SegmentId) -> Result<(), InternalError>;
}

fn unknown_segment(id: SegmentId) -> InternalError {
    InternalError::spill_internal(format!("{id} does not exist"))
}

fn unsealed_segment(id: SegmentId) -> InternalError {
    InternalError::spill_internal(format!("{id} is still being written"))
}

///
/// MemorySpillStorage
///
/// Keeps segments in process memory. Useful for tests and for hosts whose
/// "secondary storage" is another memory tier.
///

#[derive(Debug, Default)]
pub struct MemorySpillStorage {
    segments: BTreeMap<SegmentId, MemorySegment>,
    next_id: u64,
}

// Sealed bytes are shared with every reader instead of copied.
#[derive(Debug)]
enum MemorySegment {
    Writing(Vec<u8>),
    Sealed(Arc<[u8]>),
}

impl MemorySpillStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (not deleted) segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn segment_mut(&mut self, id: SegmentId) -> Result<&mut MemorySegment, InternalError> {
        self.segments
            .get_mut(&id)
            .ok_or_else(|| unknown_segment(id))
    }
}

impl SpillStorage for MemorySpillStorage {
    type Reader = Cursor<Arc<[u8]>>;

    fn provision(_config: &SortConfig) -> Result<Self, InternalError> {
        Ok(Self::new())
    }

    fn create(&mut self) -> Result<SegmentId, InternalError> {
        let id = SegmentId(self.next_id);
        self.next_id += 1;
        self.segments.insert(id, MemorySegment::Writing(Vec::new()));

        Ok(id)
    }

    fn append(&mut self, id: SegmentId, bytes: &[u8]) -> Result<(), InternalError> {
        match self.segment_mut(id)? {
            MemorySegment::Writing(buf) => {
                buf.extend_from_slice(bytes);
                Ok(())
            }
            MemorySegment::Sealed(_) => Err(InternalError::spill_internal(format!(
                "{id} is sealed and cannot be appended to"
            ))),
        }
    }

    fn seal(&mut self, id: SegmentId) -> Result<u64, InternalError> {
        let segment = self.segment_mut(id)?;
        let sealed: Arc<[u8]> = match segment {
            MemorySegment::Writing(buf) => Arc::from(std::mem::take(buf)),
            MemorySegment::Sealed(bytes) => Arc::clone(bytes),
        };
        let len = sealed.len() as u64;
        *segment = MemorySegment::Sealed(sealed);

        Ok(len)
    }

    fn open(&self, id: SegmentId) -> Result<Self::Reader, InternalError> {
        match self.segments.get(&id).ok_or_else(|| unknown_segment(id))? {
            MemorySegment::Sealed(bytes) => Ok(Cursor::new(Arc::clone(bytes))),
            MemorySegment::Writing(_) => Err(unsealed_segment(id)),
        }
    }

    fn delete(&mut self, id: SegmentId) -> Result<(), InternalError> {
        self.segments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| unknown_segment(id))
    }
}

///
/// FileSpillStorage
///
/// One file per segment inside a private temporary directory.
/// The directory and anything left in it are removed on drop.
///

#[derive(Debug)]
pub struct FileSpillStorage {
    dir: TempDir,
    writers: HashMap<SegmentId, BufWriter<File>>,
    sealed: HashMap<SegmentId, u64>,
    next_id: u64,
}

impl FileSpillStorage {
    const DIR_PREFIX: &'static str = "spillmedian-";

    /// Create storage in a fresh temporary directory, under `parent` if given.
    pub fn new(parent: Option<&std::path::Path>) -> Result<Self, InternalError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(Self::DIR_PREFIX);

        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|err| InternalError::spill_io("could not create spill directory", &err))?;

        Ok(Self {
            dir,
            writers: HashMap::new(),
            sealed: HashMap::new(),
            next_id: 0,
        })
    }

    /// Directory holding this storage's segment files.
    #[must_use]
    pub fn dir(&self) -> &std::path::Path {
        self.dir.path()
    }

    fn segment_path(&self, id: SegmentId) -> PathBuf {
        self.dir.path().join(format!("run-{:08}.spill", id.0))
    }
}

impl SpillStorage for FileSpillStorage {
    type Reader = BufReader<File>;

    fn provision(config: &SortConfig) -> Result<Self, InternalError> {
        Self::new(config.spill_dir())
    }

    fn create(&mut self) -> Result<SegmentId, InternalError> {
        let id = SegmentId(self.next_id);
        let file = File::create(self.segment_path(id))
            .map_err(|err| InternalError::spill_io(&format!("could not create {id}"), &err))?;

        self.next_id += 1;
        self.writers.insert(id, BufWriter::new(file));

        Ok(id)
    }

    fn append(&mut self, id: SegmentId, bytes: &[u8]) -> Result<(), InternalError> {
        let writer = self.writers.get_mut(&id).ok_or_else(|| {
            if self.sealed.contains_key(&id) {
                InternalError::spill_internal(format!("{id} is sealed and cannot be appended to"))
            } else {
                unknown_segment(id)
            }
        })?;

        writer
            .write_all(bytes)
            .map_err(|err| InternalError::spill_io(&format!("could not write {id}"), &err))
    }

    fn seal(&mut self, id: SegmentId) -> Result<u64, InternalError> {
        let writer = self.writers.remove(&id).ok_or_else(|| unknown_segment(id))?;
        let file = writer.into_inner().map_err(|err| {
            InternalError::spill_io(&format!("could not flush {id}"), err.error())
        })?;
        let len = file
            .metadata()
            .map_err(|err| InternalError::spill_io(&format!("could not stat {id}"), &err))?
            .len();

        self.sealed.insert(id, len);

        Ok(len)
    }

    fn open(&self, id: SegmentId) -> Result<Self::Reader, InternalError> {
        if self.writers.contains_key(&id) {
            return Err(unsealed_segment(id));
        }
        if !self.sealed.contains_key(&id) {
            return Err(unknown_segment(id));
        }

        let file = File::open(self.segment_path(id))
            .map_err(|err| InternalError::spill_io(&format!("could not open {id}"), &err))?;

        Ok(BufReader::new(file))
    }

    fn delete(&mut self, id: SegmentId) -> Result<(), InternalError> {
        let known = self.writers.remove(&id).is_some() | self.sealed.remove(&id).is_some();
        if !known {
            return Err(unknown_segment(id));
        }

        fs::remove_file(self.segment_path(id))
            .map_err(|err| InternalError::spill_io(&format!("could not delete {id}"), &err))
    }
}
