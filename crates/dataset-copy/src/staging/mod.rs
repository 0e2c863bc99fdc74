//! Staging between read and write.
//!
//! Small transfers keep their chunks in memory. Large transfers append every
//! chunk to one temporary delimited-text file with a single header row. The
//! file belongs to the staging value and is deleted when it is dropped,
//! whichever way the transfer ends.

use std::fs::File;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::{Chunk, Row, Strategy};
use crate::error::{CopyError, Result};

/// Accepts chunks in arrival order.
pub enum StagingArea {
    Memory(MemoryStage),
    Spill(SpillStage),
}

pub struct MemoryStage {
    columns: Vec<String>,
    chunks: Vec<Chunk>,
    rows: u64,
}

pub struct SpillStage {
    columns: Vec<String>,
    file: NamedTempFile,
    writer: csv::Writer<File>,
    header_written: bool,
    rows: u64,
}

impl StagingArea {
    /// Memory staging for the small strategy, a spill file for the large one.
    pub fn for_strategy(
        strategy: Strategy,
        columns: Vec<String>,
        spill_dir: Option<&Path>,
    ) -> Result<Self> {
        match strategy {
            Strategy::Small => Ok(Self::memory(columns)),
            Strategy::Large => Self::spill(columns, spill_dir),
        }
    }

    pub fn memory(columns: Vec<String>) -> Self {
        StagingArea::Memory(MemoryStage {
            columns,
            chunks: Vec::new(),
            rows: 0,
        })
    }

    pub fn spill(columns: Vec<String>, dir: Option<&Path>) -> Result<Self> {
        let file = match dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        let writer = csv::Writer::from_writer(file.as_file().try_clone()?);
        debug!("spilling to {}", file.path().display());
        Ok(StagingArea::Spill(SpillStage {
            columns,
            file,
            writer,
            header_written: false,
            rows: 0,
        }))
    }

    /// Rows accepted so far.
    pub fn rows(&self) -> u64 {
        match self {
            StagingArea::Memory(m) => m.rows,
            StagingArea::Spill(s) => s.rows,
        }
    }

    /// Append one chunk. Its columns must match the staging columns.
    pub fn append(&mut self, chunk: Chunk) -> Result<()> {
        let (columns, rows) = match &*self {
            StagingArea::Memory(m) => (&m.columns, m.rows),
            StagingArea::Spill(s) => (&s.columns, s.rows),
        };
        if &chunk.columns != columns {
            return Err(CopyError::Schema(format!(
                "chunk after row {} has columns {:?}, expected {:?}",
                rows, chunk.columns, columns
            )));
        }

        match self {
            StagingArea::Memory(m) => {
                m.rows += chunk.len() as u64;
                m.chunks.push(chunk);
            }
            StagingArea::Spill(s) => {
                if !s.header_written {
                    s.writer.write_record(&s.columns)?;
                    s.header_written = true;
                }
                for row in &chunk.rows {
                    write_row(&mut s.writer, row)?;
                }
                s.rows += chunk.len() as u64;
            }
        }
        Ok(())
    }

    /// Close the staging area for handoff to the writer.
    pub fn finish(self) -> Result<StagedData> {
        match self {
            StagingArea::Memory(m) => Ok(StagedData {
                columns: m.columns,
                rows: m.rows,
                body: StagedBody::Memory(m.chunks),
            }),
            StagingArea::Spill(mut s) => {
                if !s.header_written {
                    s.writer.write_record(&s.columns)?;
                }
                s.writer.flush()?;
                drop(s.writer);
                debug!("staged {} rows in {}", s.rows, s.file.path().display());
                Ok(StagedData {
                    columns: s.columns,
                    rows: s.rows,
                    body: StagedBody::Spill(s.file),
                })
            }
        }
    }
}

enum StagedBody {
    Memory(Vec<Chunk>),
    Spill(NamedTempFile),
}

/// Closed staging area, ready to be written.
pub struct StagedData {
    columns: Vec<String>,
    rows: u64,
    body: StagedBody,
}

impl StagedData {
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Location of the spill file, if any.
    pub fn spill_path(&self) -> Option<&Path> {
        match &self.body {
            StagedBody::Spill(file) => Some(file.path()),
            StagedBody::Memory(_) => None,
        }
    }

    /// Number of parts `into_parts(part_size)` will yield.
    pub fn part_count(&self, part_size: usize) -> u32 {
        let per_part = part_size.max(1) as u64;
        self.rows.div_ceil(per_part).max(1) as u32
    }

    /// The whole body, header first.
    pub fn into_csv(self) -> Result<String> {
        let mut parts = self.into_parts(usize::MAX)?;
        Ok(parts.next_part()?.unwrap_or_default())
    }

    /// Split into bodies of at most `part_size` rows. Only the first carries
    /// the header; there is always at least one part.
    pub fn into_parts(self, part_size: usize) -> Result<StagedParts> {
        let source = match self.body {
            StagedBody::Memory(chunks) => PartSource::Memory {
                rows: chunks.into_iter().flat_map(|c| c.rows).collect::<Vec<_>>().into_iter(),
            },
            StagedBody::Spill(file) => {
                let reader = csv::Reader::from_reader(file.reopen()?);
                PartSource::Spill {
                    reader,
                    _file: file,
                }
            }
        };
        Ok(StagedParts {
            columns: self.columns,
            part_size: part_size.max(1),
            emitted: 0,
            exhausted: false,
            source,
        })
    }
}

enum PartSource {
    Memory {
        rows: std::vec::IntoIter<Row>,
    },
    Spill {
        reader: csv::Reader<File>,
        // Keeps the file alive until the last part is read.
        _file: NamedTempFile,
    },
}

/// Iterator over part bodies.
pub struct StagedParts {
    columns: Vec<String>,
    part_size: usize,
    emitted: u32,
    exhausted: bool,
    source: PartSource,
}

impl StagedParts {
    /// Next part body, or `None` when all rows were emitted.
    pub fn next_part(&mut self) -> Result<Option<String>> {
        if self.exhausted && self.emitted > 0 {
            return Ok(None);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.emitted == 0 {
            writer.write_record(&self.columns)?;
        }

        let mut count = 0;
        while count < self.part_size {
            let more = match &mut self.source {
                PartSource::Memory { rows } => match rows.next() {
                    Some(row) => {
                        write_row(&mut writer, &row)?;
                        true
                    }
                    None => false,
                },
                PartSource::Spill { reader, .. } => {
                    let mut record = csv::StringRecord::new();
                    if reader.read_record(&mut record)? {
                        writer.write_record(&record)?;
                        true
                    } else {
                        false
                    }
                }
            };
            if !more {
                self.exhausted = true;
                break;
            }
            count += 1;
        }

        if count == 0 && self.emitted > 0 {
            return Ok(None);
        }
        self.emitted += 1;

        let bytes = writer
            .into_inner()
            .map_err(|e| CopyError::Io(e.into_error()))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| CopyError::Schema(format!("staged data is not valid UTF-8: {}", e)))
    }
}

fn write_row<W: std::io::Write>(writer: &mut csv::Writer<W>, row: &Row) -> Result<()> {
    let fields: Vec<_> = row.iter().map(|v| v.to_field()).collect();
    writer.write_record(fields.iter().map(|f| f.as_bytes()))?;
    Ok(())
}
