use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

#[cfg(feature = "rt")]
use futures::Stream;
#[cfg(feature = "rt")]
use tokio::fs::File as AsyncFile;
#[cfg(feature = "rt")]
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader as AsyncBufReader};

use crate::error::{CoreError, Result};
use crate::records::Record;

/// A decoded line: its 1-based line number and the record or decode error.
pub type NumberedRecord = (usize, Result<Record>);

fn decode_line(line_no: usize, line: &str) -> Result<Record> {
    serde_json::from_str(line).map_err(|err| CoreError::malformed(line_no, err))
}

/// Blocking NDJSON record reader. Blank lines are skipped; a malformed
/// line yields an error for that line and reading continues. A read
/// error is yielded once and ends the stream.
pub struct RecordReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_no: usize,
    done: bool,
}

impl RecordReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = NumberedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => return Some((self.line_no, decode_line(self.line_no, &line))),
                Err(err) => {
                    self.done = true;
                    return Some((self.line_no, Err(err.into())));
                }
            }
        }
    }
}

#[cfg(feature = "rt")]
pub type BoxedAsyncRead = Box<dyn AsyncBufRead + Unpin + Send>;

/// Async counterpart of [`RecordReader`] over files or stdin.
#[cfg(feature = "rt")]
pub struct AsyncRecordReader<R: AsyncBufRead + Unpin> {
    lines: tokio::io::Lines<R>,
    line_no: usize,
    done: bool,
}

#[cfg(feature = "rt")]
impl AsyncRecordReader<BoxedAsyncRead> {
    /// Open a path, or standard input when the path is `-`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader: BoxedAsyncRead = if path == Path::new("-") {
            Box::new(AsyncBufReader::new(tokio::io::stdin()))
        } else {
            Box::new(AsyncBufReader::new(AsyncFile::open(path).await?))
        };
        Ok(Self::new(reader))
    }
}

#[cfg(feature = "rt")]
impl<R: AsyncBufRead + Unpin> AsyncRecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            done: false,
        }
    }

    pub async fn next(&mut self) -> Option<NumberedRecord> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    self.line_no += 1;
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some((self.line_no, decode_line(self.line_no, &line)));
                }
                Ok(None) => return None,
                Err(err) => {
                    self.line_no += 1;
                    self.done = true;
                    return Some((self.line_no, Err(err.into())));
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = NumberedRecord> {
        futures::stream::unfold(self, |mut reader| async move {
            reader.next().await.map(|item| (item, reader))
        })
    }
}

pub struct RecordWriter<W: Write> {
    writer: BufWriter<W>,
}

impl RecordWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|err| CoreError::json(record.kind().as_str(), err))?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
