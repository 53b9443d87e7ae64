use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use csv_stream_core::{Quoter, QuoterBuilder};
use log::{debug, trace};

use crate::error::{Error, Result, Status};
use crate::row::Row;

/// The record terminator written after every row.
const CRLF: &[u8] = b"\r\n";

/// The options understood by a CSV writer, as plain data.
///
/// With the `serde` feature, missing options deserialize to their defaults
/// and bytes may be given as one character strings or as numbers.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WriterConfig {
    /// The field delimiter. Default: `,`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_byte"))]
    pub delimiter: u8,
    /// The quote byte. Default: `"`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_byte"))]
    pub quote: u8,
    /// The byte written before quotes inside quoted fields. Default: `"`.
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_byte"))]
    pub escape: u8,
}

impl Default for WriterConfig {
    fn default() -> WriterConfig {
        WriterConfig { delimiter: b',', quote: b'"', escape: b'"' }
    }
}

/// Builds a CSV writer with various configuration knobs.
///
/// Once a CSV `Writer` is built, its configuration cannot be changed.
#[derive(Debug, Default)]
pub struct WriterBuilder {
    config: WriterConfig,
    capacity: Option<usize>,
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    ///
    /// To convert a builder into a writer, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::error::Error;
    /// use csv_stream::WriterBuilder;
    ///
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let mut wtr = WriterBuilder::new().delimiter(b';').from_writer(vec![]);
    ///     wtr.write_row(&["a", "b;c"])?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "a;\"b;c\"\r\n");
    ///     Ok(())
    /// }
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Create a new builder from a plain configuration value.
    pub fn from_config(config: WriterConfig) -> WriterBuilder {
        WriterBuilder { config, capacity: None }
    }

    /// Returns the configuration that writers built from this builder use.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Build a CSV writer from this configuration that writes data to `wtr`.
    ///
    /// The sink is assumed to be empty, so the first row is written without
    /// a preceding record terminator.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer::new(self, wtr, None)
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// file at `path`.
    ///
    /// The file is created if it does not exist and truncated if it does.
    /// If it cannot be opened, then this returns `Error::Open`.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|err| Error::Open { path: path.to_path_buf(), err })?;
        Ok(Writer::new(self, file, None))
    }

    /// Build a CSV writer from this configuration that appends to the file
    /// at `path`.
    ///
    /// The file is created if it does not exist. If the existing data does
    /// not end with a line terminator, the first row written is preceded by
    /// one, so rows never run into a partial last line. If the file cannot
    /// be opened or inspected, then this returns `Error::Open`.
    pub fn from_path_append<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Writer<File>> {
        let path = path.as_ref();
        let open = |err| Error::Open { path: path.to_path_buf(), err };
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(open)?;
        let last = last_byte(&mut file).map_err(open)?;
        Ok(Writer::new(self, file, last))
    }

    /// Build a CSV writer from this configuration that appends to a
    /// seekable sink which may already hold data.
    ///
    /// The sink is positioned at its end. As with `from_path_append`, the
    /// first row is preceded by a record terminator when the existing data
    /// does not end with one.
    pub fn from_appendable<W>(&self, mut wtr: W) -> Result<Writer<W>>
    where
        W: io::Read + io::Write + io::Seek,
    {
        let last = last_byte(&mut wtr)?;
        Ok(Writer::new(self, wtr, last))
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.config.delimiter = delimiter;
        self
    }

    /// The quote byte to use when writing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.config.quote = quote;
        self
    }

    /// The escape byte to use when writing CSV.
    ///
    /// Inside a quoted field, every quote byte is written preceded by the
    /// escape byte. With the default, `b'"'`, this doubles quotes. With any
    /// other byte, occurrences of the escape byte itself are escaped too.
    pub fn escape(&mut self, escape: u8) -> &mut WriterBuilder {
        self.config.escape = escape;
        self
    }

    /// Set the capacity (in bytes) of the internal write buffer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = Some(capacity);
        self
    }

    fn quoter(&self) -> Quoter {
        QuoterBuilder::new()
            .delimiter(self.config.delimiter)
            .quote(self.config.quote)
            .escape(self.config.escape)
            .build()
    }
}

/// Seek to the end of `s` and return its last byte, if it has one.
///
/// `s` is left positioned at its end.
fn last_byte<S: io::Read + io::Seek>(s: &mut S) -> io::Result<Option<u8>> {
    let len = s.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(None);
    }
    s.seek(SeekFrom::End(-1))?;
    let mut byte = [0; 1];
    s.read_exact(&mut byte)?;
    Ok(Some(byte[0]))
}

/// Where a writer is in the lifecycle of a row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RowState {
    /// No row has been started, or a finished row was closed.
    NotStarted,
    /// A row was started and has no fields yet.
    RowStart,
    /// A row was started and has at least one field.
    WritingField,
    /// A row was ended.
    RowEnd,
}

/// A streaming CSV writer.
///
/// Rows are written with the `start_row`, `write_field`, `end_row`
/// protocol, or all at once with `write_row`. Bytes go to the sink (through
/// an internal buffer) as soon as each field is written; rows are never
/// collected in memory.
///
/// Fields are separated by the delimiter, and every row, including the
/// last, ends with `\r\n`. A field is quoted if and only if it contains the
/// delimiter, the quote byte, `\r` or `\n`.
///
/// # Errors
///
/// Calling the protocol methods out of order fails with `Error::NotStarted`
/// or `Error::AlreadyWriting` and writes nothing. A failing operation is
/// never rolled back: whatever it wrote before failing stays written.
/// `status` keeps the outcome of the last operation.
///
/// The internal buffer is flushed when the writer is dropped, but errors
/// are ignored then. Use `flush`, `close` or `into_inner` to see them.
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    wtr: io::BufWriter<W>,
    quoter: Quoter,
    state: RowState,
    /// The last byte in the sink, when the sink is not empty.
    last_byte: Option<u8>,
    status: Status,
}

impl<W: io::Write> Writer<W> {
    fn new(
        builder: &WriterBuilder,
        wtr: W,
        last_byte: Option<u8>,
    ) -> Writer<W> {
        debug!(
            "opening CSV writer (last byte in sink: {:?}): {:?}",
            last_byte, builder.config
        );
        let wtr = match builder.capacity {
            Some(capacity) => io::BufWriter::with_capacity(capacity, wtr),
            None => io::BufWriter::new(wtr),
        };
        Writer {
            wtr,
            quoter: builder.quoter(),
            state: RowState::NotStarted,
            last_byte,
            status: Status::Success,
        }
    }

    /// Build a CSV writer with a default configuration that writes data to
    /// `wtr`.
    ///
    /// To customize the delimiter or the quoting, use a `WriterBuilder`.
    ///
    /// # Example
    ///
    /// ```
    /// use csv_stream::Writer;
    ///
    /// let mut wtr = Writer::from_writer(vec![]);
    /// wtr.write_row(&["x", "y,z"]).unwrap();
    /// assert_eq!(wtr.into_inner().unwrap(), b"x,\"y,z\"\r\n".to_vec());
    /// ```
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    /// Start a new row.
    ///
    /// If this is the first row written to a sink whose data does not end
    /// with a line terminator, a record terminator is written first. If a
    /// row is already open, this fails with `Error::AlreadyWriting`.
    pub fn start_row(&mut self) -> Result<()> {
        let res = self.start_row_imp();
        self.track(res)
    }

    fn start_row_imp(&mut self) -> Result<()> {
        match self.state {
            RowState::RowStart | RowState::WritingField => {
                return Err(Error::AlreadyWriting)
            }
            RowState::NotStarted => {
                if let Some(b) = self.last_byte {
                    if b != b'\n' && b != b'\r' {
                        self.write_bytes(CRLF)?;
                    }
                }
            }
            RowState::RowEnd => {}
        }
        self.state = RowState::RowStart;
        Ok(())
    }

    /// Write a single field of the current row.
    ///
    /// A delimiter is written first unless this is the first field of the
    /// row. The field is quoted only when it has to be. If no row is open,
    /// this fails with `Error::NotStarted`.
    pub fn write_field<T: AsRef<[u8]>>(&mut self, field: T) -> Result<()> {
        let res = self.write_field_imp(field.as_ref());
        self.track(res)
    }

    fn write_field_imp(&mut self, field: &[u8]) -> Result<()> {
        match self.state {
            RowState::NotStarted | RowState::RowEnd => {
                return Err(Error::NotStarted)
            }
            RowState::RowStart => {}
            RowState::WritingField => {
                let delim = self.quoter.delimiter();
                self.write_bytes(&[delim])?;
            }
        }
        if self.quoter.should_quote(field) {
            trace!(
                "quoting a {} byte field as {} bytes",
                field.len(),
                self.quoter.quoted_len(field)
            );
            let quote = self.quoter.quote();
            self.wtr.write_all(&[quote])?;
            for piece in self.quoter.escaped(field) {
                self.wtr.write_all(piece)?;
            }
            self.wtr.write_all(&[quote])?;
            self.last_byte = Some(quote);
        } else {
            self.write_bytes(field)?;
        }
        self.state = RowState::WritingField;
        Ok(())
    }

    /// End the current row.
    ///
    /// This writes the record terminator. Ending a row that was already
    /// ended closes it, writing nothing. If no row was started, this fails
    /// with `Error::NotStarted`.
    pub fn end_row(&mut self) -> Result<()> {
        let res = self.end_row_imp();
        self.track(res)
    }

    fn end_row_imp(&mut self) -> Result<()> {
        match self.state {
            RowState::NotStarted => Err(Error::NotStarted),
            RowState::RowEnd => {
                self.state = RowState::NotStarted;
                Ok(())
            }
            RowState::RowStart | RowState::WritingField => {
                self.write_bytes(CRLF)?;
                self.state = RowState::RowEnd;
                Ok(())
            }
        }
    }

    /// Write an entire row.
    ///
    /// This starts a row, writes every field and ends the row. The first
    /// error stops it, leaving the row as far as it got.
    ///
    /// A row with no fields and a row with a single empty field are both
    /// written as a bare `\r\n`. That reads back as a row with one empty
    /// field, or not at all when empty lines are skipped.
    ///
    /// # Example
    ///
    /// ```
    /// use csv_stream::Writer;
    ///
    /// let mut wtr = Writer::from_writer(vec![]);
    /// wtr.write_row(&["a", "b"]).unwrap();
    /// wtr.write_row(vec![String::from("say \"hi\""), String::new()]).unwrap();
    /// let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    /// assert_eq!(data, "a,b\r\n\"say \"\"hi\"\"\",\r\n");
    /// ```
    pub fn write_row<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.start_row()?;
        for field in row {
            self.write_field(field)?;
        }
        self.end_row()
    }

    /// Write a row that was read by a `Reader`.
    pub fn write_csv_row(&mut self, row: &Row) -> Result<()> {
        self.write_row(row)
    }

    /// Write a line of already formatted CSV data, followed by the record
    /// terminator.
    ///
    /// `line` is written verbatim, so it should not contain a terminator
    /// of its own. If a row is open, this fails with
    /// `Error::AlreadyWriting`.
    pub fn write_raw_row<T: AsRef<[u8]>>(&mut self, line: T) -> Result<()> {
        self.start_row()?;
        let res = self.write_bytes(line.as_ref());
        self.track(res)?;
        self.state = RowState::WritingField;
        self.end_row()
    }

    /// Flush the contents of the internal buffer to the sink.
    pub fn flush(&mut self) -> Result<()> {
        let res = self.wtr.flush().map_err(Error::from);
        self.track(res)
    }

    /// Returns where this writer is in the lifecycle of a row.
    pub fn row_state(&self) -> RowState {
        self.state
    }

    /// Returns the outcome of the most recent operation.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        self.wtr.get_ref()
    }

    /// Flush this writer and return the underlying sink.
    pub fn into_inner(self) -> Result<W> {
        self.wtr.into_inner().map_err(|err| Error::Io(err.into_error()))
    }

    /// Flush this writer and release the underlying sink.
    pub fn close(self) -> Result<()> {
        debug!("closing CSV writer");
        self.into_inner().map(drop)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(&last) = bytes.last() {
            self.wtr.write_all(bytes)?;
            self.last_byte = Some(last);
        }
        Ok(())
    }

    fn track<T>(&mut self, res: Result<T>) -> Result<T> {
        self.status = Status::from(&res);
        res
    }
}
