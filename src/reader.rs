use std::cmp;
use std::fs::File;
use std::io;
use std::path::Path;

use csv_stream_core::{ScanResult, Scanner, ScannerBuilder};
use log::{debug, warn};

use crate::buffer::{capacity_for_len, ByteBuffer};
use crate::error::{Error, Result, Status};
use crate::row::{self, Row, StringRow};

/// The smallest amount by which a row's field storage grows.
const MIN_GROWTH: usize = 512;

/// The options understood by a CSV reader, as plain data.
///
/// Every field has a documented default, and with the `serde` feature a
/// partially specified config (say, a JSON object with only `delimiter`)
/// deserializes with the missing options set to their defaults. Bytes may
/// be given either as a one character string or as a number.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderConfig {
    /// The field delimiter. Default: `,`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_byte"))]
    pub delimiter: u8,
    /// The quote byte. Default: `"`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_byte"))]
    pub quote: u8,
    /// The byte that starts a comment line. Default: `#`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_byte"))]
    pub comment: u8,
    /// The escape byte inside quoted fields. Default: `"`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_byte"))]
    pub escape: u8,
    /// Drop spaces at the start of fields. Default: off.
    pub skip_initial_space: bool,
    /// Drop lines that hold a single empty field. Default: off.
    pub skip_empty_lines: bool,
    /// Drop comment lines. Default: off.
    pub skip_comments: bool,
}

impl Default for ReaderConfig {
    fn default() -> ReaderConfig {
        ReaderConfig {
            delimiter: b',',
            quote: b'"',
            comment: b'#',
            escape: b'"',
            skip_initial_space: false,
            skip_empty_lines: false,
            skip_comments: false,
        }
    }
}

/// Builds a CSV reader with various configuration knobs.
///
/// This builder can be used to tweak the field delimiter, the quoting rules
/// and which lines get skipped. Once a CSV `Reader` is built, its
/// configuration cannot be changed.
#[derive(Debug, Default)]
pub struct ReaderBuilder {
    config: ReaderConfig,
    capacity: Option<usize>,
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a reader, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use csv_stream::ReaderBuilder;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let data = "\
    /// city;country;pop
    /// Boston;United States;4628910
    /// ";
    ///     let mut rdr = ReaderBuilder::new()
    ///         .delimiter(b';')
    ///         .from_reader(data.as_bytes());
    ///
    ///     let mut rows = vec![];
    ///     while let Some(row) = rdr.next_string_row()? {
    ///         rows.push(row);
    ///     }
    ///     assert_eq!(2, rows.len());
    ///     assert_eq!("United States", &rows[1][1]);
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Create a new builder from a plain configuration value.
    pub fn from_config(config: ReaderConfig) -> ReaderBuilder {
        ReaderBuilder { config, capacity: None }
    }

    /// Returns the configuration that readers built from this builder use.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Build a CSV reader from this configuration that reads data from
    /// `rdr`.
    ///
    /// The source's size is unknown, so the read buffer gets the default
    /// capacity unless `buffer_capacity` was set.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R> {
        Reader::new(self, rdr, self.capacity.unwrap_or(capacity_for_len(None)))
    }

    /// Build a CSV reader from this configuration that reads data from the
    /// file at `path`.
    ///
    /// The file's size picks the read buffer capacity unless
    /// `buffer_capacity` was set. If the file cannot be opened or inspected,
    /// then this returns `Error::Open`.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        let path = path.as_ref();
        let open = |err| Error::Open { path: path.to_path_buf(), err };
        let file = File::open(path).map_err(open)?;
        let len = file.metadata().map_err(open)?.len();
        let capacity =
            self.capacity.unwrap_or_else(|| capacity_for_len(Some(len)));
        Ok(Reader::new(self, file, capacity))
    }

    /// The field delimiter to use when parsing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ReaderBuilder {
        self.config.delimiter = delimiter;
        self
    }

    /// The quote byte to use when parsing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut ReaderBuilder {
        self.config.quote = quote;
        self
    }

    /// The comment byte used when `skip_comments` is enabled.
    ///
    /// The default is `b'#'`.
    pub fn comment(&mut self, comment: u8) -> &mut ReaderBuilder {
        self.config.comment = comment;
        self
    }

    /// The escape byte to use inside quoted fields.
    ///
    /// With the default, `b'"'`, quotes are escaped by doubling them. With
    /// any other byte, that byte followed by any byte inside a quoted field
    /// yields the second byte literally.
    pub fn escape(&mut self, escape: u8) -> &mut ReaderBuilder {
        self.config.escape = escape;
        self
    }

    /// Whether to drop spaces at the start of each field.
    ///
    /// Spaces before an opening quote are dropped too. This is disabled by
    /// default.
    pub fn skip_initial_space(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.skip_initial_space = yes;
        self
    }

    /// Whether to skip lines that hold a single empty field.
    ///
    /// Besides lines with nothing but a line terminator, this skips lines
    /// holding only `""`, and lines of spaces when `skip_initial_space` is
    /// enabled. Skipped lines are not counted by `Reader::rows_read`. When
    /// disabled (the default), an empty line is a row with a single empty
    /// field.
    pub fn skip_empty_lines(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.skip_empty_lines = yes;
        self
    }

    /// Whether to skip lines whose first field starts with the comment byte.
    ///
    /// Spaces dropped by `skip_initial_space` may precede the comment byte.
    /// Skipped lines are not counted by `Reader::rows_read`. This is
    /// disabled by default.
    pub fn skip_comments(&mut self, yes: bool) -> &mut ReaderBuilder {
        self.config.skip_comments = yes;
        self
    }

    /// Set the capacity (in bytes) of the buffer used in the CSV reader.
    ///
    /// This overrides the choice based on the size of the source. A
    /// capacity of `0` leaves the reader without a buffer, and every read
    /// fails with `Error::BufferNotAllocated`.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = Some(capacity);
        self
    }

    fn scanner(&self) -> Scanner {
        ScannerBuilder::new()
            .delimiter(self.config.delimiter)
            .quote(self.config.quote)
            .comment(self.config.comment)
            .escape(self.config.escape)
            .skip_initial_space(self.config.skip_initial_space)
            .skip_empty_lines(self.config.skip_empty_lines)
            .skip_comments(self.config.skip_comments)
            .build()
    }
}

/// A position in CSV data.
///
/// A position records the byte offset (starting at `0`), the line number
/// (starting at `1`) and the row index (starting at `0`).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Position {
    byte: u64,
    line: u64,
    row: u64,
}

impl Default for Position {
    fn default() -> Position {
        Position::new()
    }
}

impl Position {
    /// Returns a new position initialized to the start value.
    pub fn new() -> Position {
        Position { byte: 0, line: 1, row: 0 }
    }

    /// The byte offset, starting at `0`, of this position.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The line number, starting at `1`, of this position.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The row index, starting at the first row at `0`.
    pub fn row(&self) -> u64 {
        self.row
    }

    /// Set the byte offset of this position.
    pub fn set_byte(&mut self, byte: u64) -> &mut Position {
        self.byte = byte;
        self
    }

    /// Set the line number of this position.
    ///
    /// If the line number is less than `1`, then this method panics.
    pub fn set_line(&mut self, line: u64) -> &mut Position {
        assert!(line > 0);
        self.line = line;
        self
    }

    /// Set the row index of this position.
    pub fn set_row(&mut self, row: u64) -> &mut Position {
        self.row = row;
        self
    }
}

/// A streaming CSV reader.
///
/// The reader pulls bytes from its source through a fixed capacity buffer
/// and hands out one `Row` per call to `next_row`, in source order. Each
/// row is a fresh allocation owned by the caller. A row that is split
/// across several reads of the source comes out exactly as if it had been
/// read in one go.
///
/// Rows end at `\r`, `\n`, `\r\n` or NUL outside of quotes, or at the end
/// of the data. The last row of the data needs no terminator. There is no
/// header handling: the first row is just another row.
///
/// # Errors
///
/// `next_row` returns `Ok(None)` at the end of the data, which is distinct
/// from every error. A quoted field still open at the end of the data is
/// reported as `Error::UnterminatedQuote`, after which the reader reports
/// the end of the data. I/O and allocation failures finish the reader: the
/// error is returned once and every later call returns `Ok(None)`. In all
/// cases `status` keeps the outcome of the last call.
#[derive(Debug)]
pub struct Reader<R> {
    scanner: Scanner,
    buf: ByteBuffer<R>,
    /// The position of the next byte to scan.
    pos: Position,
    rows_read: u64,
    status: Status,
    /// Set once the data ended or reading failed for good.
    done: bool,
}

impl<R: io::Read> Reader<R> {
    fn new(builder: &ReaderBuilder, rdr: R, capacity: usize) -> Reader<R> {
        debug!(
            "opening CSV reader with a {} byte buffer: {:?}",
            capacity, builder.config
        );
        Reader {
            scanner: builder.scanner(),
            buf: ByteBuffer::with_capacity(rdr, capacity),
            pos: Position::new(),
            rows_read: 0,
            status: Status::Success,
            done: false,
        }
    }

    /// Create a new CSV reader with a default configuration for the given
    /// source.
    ///
    /// To customize parsing, use a `ReaderBuilder`.
    pub fn from_reader(rdr: R) -> Reader<R> {
        ReaderBuilder::new().from_reader(rdr)
    }

    /// Read the next row.
    ///
    /// This returns `Ok(None)` once all rows have been read. Lines dropped
    /// by `skip_empty_lines` or `skip_comments` are never returned.
    ///
    /// # Example
    ///
    /// ```
    /// use csv_stream::Reader;
    ///
    /// let data = "hi,\"hello, world!\",bye\n";
    /// let mut rdr = Reader::from_reader(data.as_bytes());
    /// let row = rdr.next_row().unwrap().unwrap();
    /// assert_eq!(&row[1], b"hello, world!");
    /// assert!(rdr.next_row().unwrap().is_none());
    /// assert_eq!(1, rdr.rows_read());
    /// ```
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        let res = self.read_row();
        self.status = Status::from(&res);
        res
    }

    /// Read the next row and check that all of its fields are UTF-8.
    ///
    /// A row that is not UTF-8 is still counted as read, and the rows after
    /// it can still be read.
    pub fn next_string_row(&mut self) -> Result<Option<StringRow>> {
        let start = self.pos.clone();
        let res = match self.read_row() {
            Ok(Some(row)) => match StringRow::from_row(row) {
                Ok(row) => Ok(Some(row)),
                Err(err) => Err(Error::Utf8 { pos: start, err }),
            },
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };
        self.status = Status::from(&res);
        res
    }

    /// Returns a borrowed iterator over all rows as `Row`s.
    ///
    /// The iterator stops after the first error.
    pub fn rows(&mut self) -> RowsIter<'_, R> {
        RowsIter { rdr: self, errored: false }
    }

    /// Returns a borrowed iterator over all rows as `StringRow`s.
    ///
    /// The iterator stops after the first error, including a row that is
    /// not valid UTF-8.
    pub fn string_rows(&mut self) -> StringRowsIter<'_, R> {
        StringRowsIter { rdr: self, errored: false }
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        if self.buf.capacity() == 0 {
            return Err(Error::BufferNotAllocated);
        }
        let start = self.pos.clone();
        let mut row = Row::new();
        let (fields, ends) = row::as_parts(&mut row);
        let mut outlen = 0;
        loop {
            let input = match self.buf.fill_buf() {
                Ok(input) => input,
                Err(err) => {
                    self.done = true;
                    return Err(Error::Io(err));
                }
            };
            let (res, nin, nout) =
                self.scanner.scan(input, &mut fields[outlen..]);
            self.buf.consume(nin);
            self.pos.byte += nin as u64;
            self.pos.line = self.scanner.line();
            outlen += nout;
            match res {
                ScanResult::InputEmpty => {}
                ScanResult::OutputFull => {
                    if let Err(err) = grow(fields) {
                        self.done = true;
                        return Err(err);
                    }
                }
                ScanResult::Field { record_end } => {
                    if ends.try_reserve(1).is_err() {
                        warn!("could not grow row to {} fields", ends.len());
                        self.done = true;
                        return Err(Error::OutOfMemory);
                    }
                    ends.push(outlen);
                    if record_end {
                        debug_assert!(self.scanner.is_record_start());
                        fields.truncate(outlen);
                        self.rows_read += 1;
                        self.pos.row += 1;
                        return Ok(Some(row));
                    }
                }
                ScanResult::UnterminatedQuote => {
                    warn!(
                        "quoted field of row {} (byte {}, line {}) is \
                         never closed",
                        start.row(),
                        start.byte(),
                        start.line()
                    );
                    return Err(Error::UnterminatedQuote { pos: start });
                }
                ScanResult::End => {
                    debug!("CSV data ended after {} rows", self.rows_read);
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }

    /// Returns the number of rows returned so far.
    ///
    /// Skipped empty and comment lines do not count.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Returns the position of the next byte this reader will scan.
    ///
    /// The row index of the position is the number of rows returned so
    /// far.
    pub fn position(&self) -> &Position {
        &self.pos
    }

    /// Returns the outcome of the most recent read.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns true once the end of the data was reached or a failure ended
    /// reading for good.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Returns the capacity of the read buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns a reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        self.buf.get_ref()
    }

    /// Returns a mutable reference to the underlying source.
    ///
    /// Reading from the source directly would corrupt the row stream.
    pub fn get_mut(&mut self) -> &mut R {
        self.buf.get_mut()
    }

    /// Unwraps this CSV reader, returning the underlying source.
    ///
    /// Note that any leftover data inside this reader's internal buffer is
    /// lost.
    pub fn into_inner(self) -> R {
        self.buf.into_inner()
    }

    /// Close this reader, releasing its buffer and its source.
    pub fn close(self) {
        debug!("closing CSV reader after {} rows", self.rows_read);
    }
}

impl Reader<File> {
    /// Create a new CSV reader with a default configuration for the file at
    /// `path`.
    ///
    /// To customize parsing, use a `ReaderBuilder`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }
}

/// Grow the field storage of a row that is being built.
fn grow(fields: &mut Vec<u8>) -> Result<()> {
    let additional = cmp::max(fields.len(), MIN_GROWTH);
    if fields.try_reserve_exact(additional).is_err() {
        warn!(
            "could not grow row storage from {} to {} bytes",
            fields.len(),
            fields.len().saturating_add(additional)
        );
        return Err(Error::OutOfMemory);
    }
    let len = fields.len() + additional;
    fields.resize(len, 0);
    Ok(())
}

/// A borrowed iterator over rows as `Row`s.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying CSV
/// `Reader`.
pub struct RowsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
    errored: bool,
}

impl<'r, R: io::Read> RowsIter<'r, R> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }
}

impl<'r, R: io::Read> Iterator for RowsIter<'r, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Result<Row>> {
        if self.errored {
            return None;
        }
        match self.rdr.next_row() {
            Ok(row) => row.map(Ok),
            Err(err) => {
                self.errored = true;
                Some(Err(err))
            }
        }
    }
}

/// A borrowed iterator over rows as `StringRow`s.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying CSV
/// `Reader`.
pub struct StringRowsIter<'r, R: 'r> {
    rdr: &'r mut Reader<R>,
    errored: bool,
}

impl<'r, R: io::Read> StringRowsIter<'r, R> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }
}

impl<'r, R: io::Read> Iterator for StringRowsIter<'r, R> {
    type Item = Result<StringRow>;

    fn next(&mut self) -> Option<Result<StringRow>> {
        if self.errored {
            return None;
        }
        match self.rdr.next_string_row() {
            Ok(row) => row.map(Ok),
            Err(err) => {
                self.errored = true;
                Some(Err(err))
            }
        }
    }
}
