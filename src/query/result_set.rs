use crate::error::DatabaseError;
use crate::store::{Database, TempResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ID_SIZE: usize = std::mem::size_of::<u64>();

/// Where search and filter keep the ids they match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStorage {
    /// Id lists stay in memory
    Memory,
    /// Id lists are written to the database's temp directory
    #[default]
    Disk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SegmentIds {
    Memory(Vec<u64>),
    /// Little endian `u64` ids, one after another
    File(PathBuf),
}

/// Matching ids inside one chunk, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSegment {
    pub chunk: u32,
    len: usize,
    ids: SegmentIds,
}

impl ResultSegment {
    /// A segment held in memory
    pub fn in_memory(chunk: u32, ids: Vec<u64>) -> Self {
        Self {
            chunk,
            len: ids.len(),
            ids: SegmentIds::Memory(ids),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate the ids, reading them back from disk if the segment was spilled.
    pub fn ids(&self) -> Result<SegmentIter<'_>, DatabaseError> {
        Ok(match &self.ids {
            SegmentIds::Memory(ids) => SegmentIter::Memory(ids.iter()),
            SegmentIds::File(path) => SegmentIter::File {
                reader: BufReader::new(File::open(path)?),
                remaining: self.len,
            },
        })
    }
}

/// Iterator over the ids of a [`ResultSegment`]
pub enum SegmentIter<'a> {
    Memory(std::slice::Iter<'a, u64>),
    File {
        reader: BufReader<File>,
        remaining: usize,
    },
}

impl Iterator for SegmentIter<'_> {
    type Item = Result<u64, DatabaseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SegmentIter::Memory(ids) => ids.next().copied().map(Ok),
            SegmentIter::File { reader, remaining } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                let mut buf = [0u8; ID_SIZE];
                match reader.read_exact(&mut buf) {
                    Ok(()) => Some(Ok(u64::from_le_bytes(buf))),
                    Err(e) => {
                        // stop after the first error
                        *remaining = 0;
                        if e.kind() == ErrorKind::UnexpectedEof {
                            Some(Err(DatabaseError::IO(
                                "temporary result is shorter than expected".to_string(),
                            )))
                        } else {
                            Some(Err(e.into()))
                        }
                    }
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            SegmentIter::Memory(ids) => ids.size_hint(),
            SegmentIter::File { remaining, .. } => (0, Some(*remaining)),
        }
    }
}

/// Collects the ids matched in one chunk.
pub struct SegmentWriter {
    chunk: u32,
    len: usize,
    output: Output,
}

enum Output {
    Memory(Vec<u64>),
    /// The file is only created once the first id is written
    File {
        path: PathBuf,
        writer: Option<BufWriter<File>>,
    },
}

impl SegmentWriter {
    pub fn push(&mut self, id: u64) -> Result<(), DatabaseError> {
        match &mut self.output {
            Output::Memory(ids) => ids.push(id),
            Output::File { path, writer } => {
                if writer.is_none() {
                    *writer = Some(BufWriter::new(File::create(&*path)?));
                }
                if let Some(writer) = writer {
                    writer.write_all(&id.to_le_bytes())?;
                }
            }
        }
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Flush the ids and turn them into a readable segment.
    pub fn finish(self) -> Result<ResultSegment, DatabaseError> {
        let ids = match self.output {
            Output::Memory(ids) => SegmentIds::Memory(ids),
            Output::File { path, writer } => {
                if let Some(mut writer) = writer {
                    writer.flush()?;
                }
                SegmentIds::File(path)
            }
        };
        Ok(ResultSegment {
            chunk: self.chunk,
            len: self.len,
            ids,
        })
    }
}

/// Hands out a [`SegmentWriter`] per chunk and assembles the [`ResultSet`].
pub struct ResultSetBuilder {
    temp: Option<Arc<TempResult>>,
}

impl ResultSetBuilder {
    /// Builder for a result kept in memory
    pub fn in_memory() -> Self {
        Self { temp: None }
    }

    /// Builder storing the result as configured, creating its temp directory if needed.
    pub fn new(db: &Database, storage: ResultStorage) -> Result<Self, DatabaseError> {
        let temp = match storage {
            ResultStorage::Memory => None,
            ResultStorage::Disk => Some(Arc::new(db.new_temporary()?)),
        };
        Ok(Self { temp })
    }

    pub fn segment(&self, chunk: u32) -> SegmentWriter {
        let output = match &self.temp {
            Some(temp) => Output::File {
                path: temp.segment_path(chunk),
                writer: None,
            },
            None => Output::Memory(Vec::new()),
        };
        SegmentWriter {
            chunk,
            len: 0,
            output,
        }
    }

    /// Build from per-chunk segments. Empty segments are dropped.
    pub fn build(self, segments: Vec<ResultSegment>) -> ResultSet {
        let segments: Vec<_> = segments
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .collect();
        let len = segments.iter().map(ResultSegment::len).sum();
        ResultSet {
            generation: 0,
            len,
            segments: segments.into(),
            temp: self.temp,
        }
    }
}

/// The recipes matched by a completed search or filter.
///
/// Immutable once built and cheap to clone, so a stage can keep reading a
/// result while the session swaps in a newer one. A spilled result keeps its
/// temp directory alive until the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    generation: u64,
    len: usize,
    segments: Arc<[ResultSegment]>,
    temp: Option<Arc<TempResult>>,
}

impl ResultSet {
    /// An in-memory result from per-chunk segments.
    pub fn new(segments: Vec<ResultSegment>) -> Self {
        ResultSetBuilder::in_memory().build(segments)
    }

    /// Tag the result with the session generation that produced it
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if the ids are stored in the temp directory
    pub fn is_spilled(&self) -> bool {
        self.temp.is_some()
    }

    /// Directory holding the spilled ids
    pub fn temp_path(&self) -> Option<&Path> {
        self.temp.as_deref().map(TempResult::path)
    }

    pub fn segments(&self) -> &[ResultSegment] {
        &self.segments
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = Result<u64, DatabaseError>> + '_ {
        self.segments
            .iter()
            .flat_map(|segment| match segment.ids() {
                Ok(ids) => itertools::Either::Left(ids),
                Err(e) => itertools::Either::Right(std::iter::once(Err(e))),
            })
    }

    /// Read every id into memory.
    pub fn read_ids(&self) -> Result<Vec<u64>, DatabaseError> {
        self.ids().collect()
    }
}
