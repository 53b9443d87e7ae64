use std::fmt;
use std::io;
use std::path::PathBuf;
use std::result;

use crate::reader::Position;

/// A type alias for `Result<T, csv_stream::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or writing CSV data.
///
/// Every error maps to exactly one `Status` code via `Error::status`. Most
/// errors leave the reader or writer usable: it can still be inspected and
/// closed, and a reader that hit malformed input keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error that occurred while reading or writing CSV data.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A file could not be opened.
    #[error("could not open {}: {}", .path.display(), .err)]
    Open {
        /// The path that was given.
        path: PathBuf,
        /// The underlying error.
        #[source]
        err: io::Error,
    },
    /// Growing a row or field buffer failed.
    ///
    /// The partially built row is dropped before this is returned.
    #[error("out of memory while building a CSV row")]
    OutOfMemory,
    /// The data ended inside a quoted field.
    ///
    /// The partially built row is dropped. Reading may continue, in which
    /// case the reader reports the end of the data.
    #[error(
        "CSV parse error: row {} (byte {}, line {}): \
         quoted field is never closed",
        .pos.row(), .pos.byte(), .pos.line()
    )]
    UnterminatedQuote {
        /// Where the row containing the unterminated field starts.
        pos: Position,
    },
    /// A field was not valid UTF-8 when reading rows as strings.
    #[error(
        "CSV parse error: row {} (byte {}, line {}, field {}): {}",
        .pos.row(), .pos.byte(), .pos.line(), .err.field(), .err
    )]
    Utf8 {
        /// Where the offending row starts.
        pos: Position,
        /// The corresponding UTF-8 error.
        #[source]
        err: Utf8Error,
    },
    /// A field or row end was written before a row was started.
    #[error("CSV write error: no row has been started")]
    NotStarted,
    /// A row was started while another one was still being written.
    #[error("CSV write error: a row is already being written")]
    AlreadyWriting,
    /// A row was requested from a reader without a read buffer.
    #[error("CSV read error: the read buffer has no capacity")]
    BufferNotAllocated,
}

impl Error {
    /// Returns the status code that corresponds to this error.
    pub fn status(&self) -> Status {
        match *self {
            Error::Io(_) => Status::Error,
            Error::Open { .. } => Status::OpenFailure,
            Error::OutOfMemory => Status::OutOfMemory,
            Error::UnterminatedQuote { .. } => Status::MalformedRow,
            Error::Utf8 { .. } => Status::MalformedRow,
            Error::NotStarted => Status::WriteNotStarted,
            Error::AlreadyWriting => Status::WriteAlreadyInProgress,
            Error::BufferNotAllocated => Status::BufferNotAllocated,
        }
    }

    /// Returns true if this is an I/O error.
    ///
    /// Failing to open a file counts as an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) | Error::Open { .. } => true,
            _ => false,
        }
    }
}

/// The outcome of the most recent operation on a reader or writer.
///
/// This is a closed set of codes, each with a fixed message. Some codes
/// describe conditions the type system rules out in this crate (there are
/// no null handles or rows, for instance) and are never produced; they
/// exist so that the set lines up with other implementations of the same
/// format.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    /// The operation succeeded.
    Success,
    /// A generic failure, which is what I/O errors map to.
    Error,
    /// A buffer could not grow.
    OutOfMemory,
    /// The input could not be split into a well formed row.
    MalformedRow,
    /// A write happened before `start_row`.
    WriteNotStarted,
    /// `start_row` was called while a row was open.
    WriteAlreadyInProgress,
    /// The handle is missing.
    NullHandle,
    /// The source or sink was opened in the wrong mode.
    BadMode,
    /// A file could not be opened.
    OpenFailure,
    /// The object is not of the expected kind.
    BadObjectType,
    /// The row is missing.
    NullRow,
    /// The read buffer has no capacity.
    BufferNotAllocated,
}

impl Status {
    /// Returns the fixed human readable message for this status.
    pub fn message(&self) -> &'static str {
        match *self {
            Status::Success => "success",
            Status::Error => "error",
            Status::OutOfMemory => "out of memory",
            Status::MalformedRow => "malformed row",
            Status::WriteNotStarted => "writing has not started",
            Status::WriteAlreadyInProgress => "writing is already in progress",
            Status::NullHandle => "null handle",
            Status::BadMode => "bad mode",
            Status::OpenFailure => "could not open file",
            Status::BadObjectType => "bad object type",
            Status::NullRow => "null row",
            Status::BufferNotAllocated => "buffer not allocated",
        }
    }

    /// Returns true if and only if this is `Status::Success`.
    pub fn is_success(&self) -> bool {
        *self == Status::Success
    }
}

impl Default for Status {
    fn default() -> Status {
        Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl<'a, T> From<&'a Result<T>> for Status {
    fn from(res: &'a Result<T>) -> Status {
        match *res {
            Ok(_) => Status::Success,
            Err(ref err) => err.status(),
        }
    }
}

/// A UTF-8 validation error that occurred when attempting to convert a
/// `Row` into a `StringRow`.
///
/// The error includes the index of the field that failed validation, and the
/// last byte at which valid UTF-8 was verified.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error(
    "invalid utf-8: invalid UTF-8 in field {field} near byte index \
     {valid_up_to}"
)]
pub struct Utf8Error {
    /// The field index of a row in which UTF-8 validation failed.
    field: usize,
    /// The index into the given field up to which valid UTF-8 was verified.
    valid_up_to: usize,
}

/// Create a new UTF-8 error.
pub(crate) fn new_utf8_error(field: usize, valid_up_to: usize) -> Utf8Error {
    Utf8Error { field, valid_up_to }
}

impl Utf8Error {
    /// The field index of a row in which UTF-8 validation failed.
    pub fn field(&self) -> usize {
        self.field
    }

    /// The index into the given field up to which valid UTF-8 was verified.
    pub fn valid_up_to(&self) -> usize {
        self.valid_up_to
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::reader::Position;

    use super::{new_utf8_error, Error, Status};

    #[test]
    fn statuses() {
        let io = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(Status::Error, io.status());
        assert!(io.is_io_error());
        assert_eq!(Status::OutOfMemory, Error::OutOfMemory.status());
        assert_eq!(Status::WriteNotStarted, Error::NotStarted.status());
        assert_eq!(
            Status::WriteAlreadyInProgress,
            Error::AlreadyWriting.status()
        );
        assert_eq!(
            Status::BufferNotAllocated,
            Error::BufferNotAllocated.status()
        );
        let err = Error::UnterminatedQuote { pos: Position::new() };
        assert_eq!(Status::MalformedRow, err.status());
        assert!(!err.is_io_error());
    }

    #[test]
    fn status_messages() {
        assert_eq!("success", Status::Success.to_string());
        assert_eq!("malformed row", Status::MalformedRow.to_string());
        assert_eq!(
            "writing has not started",
            Status::WriteNotStarted.message()
        );
        assert!(Status::default().is_success());
        assert!(!Status::NullRow.is_success());
    }

    #[test]
    fn status_from_result() {
        let ok: crate::Result<()> = Ok(());
        assert_eq!(Status::Success, Status::from(&ok));
        let err: crate::Result<()> = Err(Error::AlreadyWriting);
        assert_eq!(Status::WriteAlreadyInProgress, Status::from(&err));
    }

    #[test]
    fn display_parse_errors() {
        let mut pos = Position::new();
        pos.set_byte(10).set_line(2).set_row(1);
        let err = Error::UnterminatedQuote { pos: pos.clone() };
        assert_eq!(
            "CSV parse error: row 1 (byte 10, line 2): \
             quoted field is never closed",
            err.to_string()
        );

        let err = Error::Utf8 { pos, err: new_utf8_error(3, 1) };
        assert_eq!(
            "CSV parse error: row 1 (byte 10, line 2, field 3): \
             invalid utf-8: invalid UTF-8 in field 3 near byte index 1",
            err.to_string()
        );
    }
}
