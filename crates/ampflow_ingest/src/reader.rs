//! Chunked, lazy parsing of one delimited input file.
//!
//! The first line is the header; every later line becomes a [`RawRow`] whose
//! values are addressed by header name. Rows whose field count mismatches
//! the header are still consumed (missing fields read as absent). Input is
//! UTF-8 with an optional leading byte-order mark, which the station
//! exports routinely carry.

use crate::error::ReadError;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// One input line, addressed by header name.
#[derive(Debug, Clone)]
pub struct RawRow {
    headers: Arc<Vec<String>>,
    values: Vec<String>,
    row: u64,
}

impl RawRow {
    pub fn new(headers: Arc<Vec<String>>, values: Vec<String>, row: u64) -> Self {
        Self {
            headers,
            values,
            row,
        }
    }

    /// Value under `column`, or `None` when the column is absent from the
    /// header or this row is too short to reach it.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.values.get(idx).map(String::as_str)
    }

    /// 1-based data row index within the file (the header is not counted).
    pub fn row(&self) -> u64 {
        self.row
    }
}

/// Ordered group of raw rows, at most chunk-size long.
pub type RecordBatch = Vec<RawRow>;

/// Parses one file into fixed-size batches of raw rows.
#[derive(Debug, Clone, Copy)]
pub struct ChunkedRecordReader {
    chunk_size: usize,
}

impl ChunkedRecordReader {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Open `path` and position after the header.
    ///
    /// Returns `Ok(None)` for a file with no header row (empty or
    /// BOM-only); the caller decides how loudly to report that.
    pub fn open(&self, path: &Path) -> Result<Option<FileBatches>, ReadError> {
        let mut input = BufReader::new(File::open(path)?);

        // Peek up to three bytes to strip a UTF-8 BOM; anything shorter or
        // different is data and must be handed back to the csv reader.
        let mut prefix = [0u8; 3];
        let mut filled = 0;
        while filled < prefix.len() {
            let n = input.read(&mut prefix[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }

        let payload: Box<dyn Read + Send> = if filled == 3 && prefix == UTF8_BOM {
            Box::new(input)
        } else {
            Box::new(Cursor::new(prefix[..filled].to_vec()).chain(input))
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(payload);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| ReadError::Csv { row: 0, source })?
            .iter()
            .map(str::to_string)
            .collect();

        // A BOM-only file parses to a single empty header field
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Ok(None);
        }

        Ok(Some(FileBatches {
            records: reader.into_records(),
            headers: Arc::new(headers),
            chunk_size: self.chunk_size,
            next_row: 1,
            failed: false,
        }))
    }
}

/// Lazy batch iterator for one open file.
///
/// Yields `Err` once on the first undecodable record and then stops; rows
/// already yielded stay valid.
pub struct FileBatches {
    records: csv::StringRecordsIntoIter<Box<dyn Read + Send>>,
    headers: Arc<Vec<String>>,
    chunk_size: usize,
    next_row: u64,
    failed: bool,
}

impl FileBatches {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl std::fmt::Debug for FileBatches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileBatches")
            .field("headers", &self.headers)
            .field("chunk_size", &self.chunk_size)
            .field("next_row", &self.next_row)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl Iterator for FileBatches {
    type Item = Result<RecordBatch, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut batch = Vec::with_capacity(self.chunk_size);
        while batch.len() < self.chunk_size {
            match self.records.next() {
                None => break,
                Some(Ok(record)) => {
                    let values = record.iter().map(str::to_string).collect();
                    batch.push(RawRow::new(self.headers.clone(), values, self.next_row));
                    self.next_row += 1;
                }
                Some(Err(source)) => {
                    self.failed = true;
                    return Some(Err(ReadError::Csv {
                        row: self.next_row,
                        source,
                    }));
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    fn batch_lens(path: &Path, chunk_size: usize) -> Vec<usize> {
        ChunkedRecordReader::new(chunk_size)
            .open(path)
            .unwrap()
            .unwrap()
            .map(|batch| batch.unwrap().len())
            .collect()
    }

    #[test]
    fn chunks_preserve_order_and_sizes() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(&tmp, "five.csv", b"A,B\n1,a\n2,b\n3,c\n4,d\n5,e\n");

        assert_eq!(batch_lens(&path, 2), vec![2, 2, 1]);
        assert_eq!(batch_lens(&path, 1000), vec![5]);

        let mut batches = ChunkedRecordReader::new(2).open(&path).unwrap().unwrap();
        let first = batches.next().unwrap().unwrap();
        assert_eq!(first[0].get("A"), Some("1"));
        assert_eq!(first[1].get("B"), Some("b"));
        assert_eq!(first[0].row(), 1);
        assert_eq!(first[1].row(), 2);
    }

    #[test]
    fn strips_leading_bom() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(&tmp, "bom.csv", b"\xef\xbb\xbfA,B\n1,2\n");

        let mut batches = ChunkedRecordReader::new(10).open(&path).unwrap().unwrap();
        assert_eq!(batches.headers(), ["A", "B"]);
        let batch = batches.next().unwrap().unwrap();
        assert_eq!(batch[0].get("A"), Some("1"));
    }

    #[test]
    fn short_file_without_bom_is_not_eaten() {
        let tmp = TempDir::new().unwrap();
        // Two bytes total - shorter than a BOM
        let path = write_file(&tmp, "tiny.csv", b"A\n");

        let batches = ChunkedRecordReader::new(10).open(&path).unwrap().unwrap();
        assert_eq!(batches.headers(), ["A"]);
    }

    #[test]
    fn empty_file_has_no_header() {
        let tmp = TempDir::new().unwrap();
        let empty = write_file(&tmp, "empty.csv", b"");
        let bom_only = write_file(&tmp, "bom_only.csv", &UTF8_BOM);

        let reader = ChunkedRecordReader::new(10);
        assert!(reader.open(&empty).unwrap().is_none());
        assert!(reader.open(&bom_only).unwrap().is_none());
    }

    #[test]
    fn header_only_file_yields_zero_batches() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(&tmp, "header.csv", b"A,B,C\n");

        let mut batches = ChunkedRecordReader::new(10).open(&path).unwrap().unwrap();
        assert!(batches.next().is_none());
    }

    #[test]
    fn ragged_rows_read_best_effort() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(&tmp, "ragged.csv", b"A,B,C\n1,2\n1,2,3,4\n");

        let mut batches = ChunkedRecordReader::new(10).open(&path).unwrap().unwrap();
        let batch = batches.next().unwrap().unwrap();

        // Short row: missing trailing field is absent, not an error
        assert_eq!(batch[0].get("B"), Some("2"));
        assert_eq!(batch[0].get("C"), None);
        // Long row: extra field is ignored
        assert_eq!(batch[1].get("C"), Some("3"));
        assert_eq!(batch[1].get("D"), None);
    }

    #[test]
    fn invalid_utf8_fails_the_file_with_row_context() {
        let tmp = TempDir::new().unwrap();
        let path = write_file(&tmp, "bad.csv", b"A,B\nok,1\n\xff\xff,2\n");

        let mut batches = ChunkedRecordReader::new(10).open(&path).unwrap().unwrap();
        let err = batches.next().unwrap().unwrap_err();
        match err {
            ReadError::Csv { row, .. } => assert_eq!(row, 2),
            other => panic!("expected csv error, got {other:?}"),
        }
        assert!(batches.next().is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let reader = ChunkedRecordReader::new(10);
        let err = reader.open(Path::new("/nonexistent/input.csv")).unwrap_err();
        assert!(matches!(err, ReadError::Io(_)));
    }
}
