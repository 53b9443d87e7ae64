/*!
The `csv-stream` crate reads and writes CSV data one row at a time.

A [`Reader`](struct.Reader.html) pulls bytes from any `io::Read` through a
fixed capacity buffer and returns each row as an owned
[`Row`](struct.Row.html). A [`Writer`](struct.Writer.html) sends fields to
any `io::Write` as soon as they are given, quoting them only when needed.
Neither of them ever holds more than one row in memory.

The field splitting itself lives in the `csv-stream-core` crate, which does
no I/O and never allocates.

# Format

* Fields are separated by a delimiter (`,` by default).
* Rows end at `\r`, `\n`, `\r\n` or NUL. The last row needs no terminator.
  The writer ends every row with `\r\n`.
* A field wrapped in quotes (`"` by default) may contain delimiters and line
  terminators. A quote inside a quoted field is written twice, or preceded
  by a distinct escape byte if one is configured.
* Optionally, spaces at the start of fields, empty lines and lines starting
  with a comment byte (`#` by default) are skipped.
* There is no header handling. The first row is just a row.

# Example: reading

```
use csv_stream::ReaderBuilder;

let data = "\
## population by city
city,pop
Boston,\"4,628,910\"

Concord,42695
";
let mut rdr = ReaderBuilder::new()
    .skip_comments(true)
    .skip_empty_lines(true)
    .from_reader(data.as_bytes());
let mut cities = vec![];
while let Some(row) = rdr.next_string_row().unwrap() {
    cities.push(row[0].to_string());
}
assert_eq!(cities, vec!["city", "Boston", "Concord"]);
assert_eq!(3, rdr.rows_read());
```

# Example: writing

```
use csv_stream::Writer;

let mut wtr = Writer::from_writer(vec![]);
wtr.write_row(&["city", "pop"]).unwrap();
wtr.start_row().unwrap();
wtr.write_field("Boston").unwrap();
wtr.write_field("4,628,910").unwrap();
wtr.end_row().unwrap();

let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
assert_eq!(data, "city,pop\r\nBoston,\"4,628,910\"\r\n");
```

# Logging

This crate logs through the `log` facade: reader and writer creation at
`debug`, buffer refills at `trace`, and malformed input and allocation
failures at `warn`. It never installs a logger.
*/

#![deny(missing_docs)]
#![warn(elided_lifetimes_in_paths)]

pub use crate::error::{Error, Result, Status, Utf8Error};
pub use crate::reader::{
    Position, Reader, ReaderBuilder, ReaderConfig, RowsIter, StringRowsIter,
};
pub use crate::row::{Row, RowIter, StringRow, StringRowIter};
pub use crate::writer::{RowState, Writer, WriterBuilder, WriterConfig};

mod buffer;
mod error;
mod reader;
mod row;
#[cfg(feature = "serde")]
mod serde_byte;
mod writer;
