use std::fmt;
use std::iter::FromIterator;
use std::ops;
use std::result;
use std::str;

use bstr::ByteSlice;

use crate::error::{new_utf8_error, Utf8Error};

/// Retrieve the underlying parts of a row: the concatenated field bytes and
/// the end offset of each field.
pub(crate) fn as_parts(row: &mut Row) -> (&mut Vec<u8>, &mut Vec<usize>) {
    (&mut row.fields, &mut row.ends)
}

/// Validate the given row as UTF-8.
///
/// If it's not UTF-8, return an error naming the first offending field.
fn validate(row: &Row) -> result::Result<(), Utf8Error> {
    // If the entire buffer is ASCII, then we have nothing to fear.
    if row.fields.is_ascii() {
        return Ok(());
    }
    // Otherwise, we must check each field individually to ensure that
    // it's valid UTF-8.
    for (i, field) in row.iter().enumerate() {
        if let Err(err) = str::from_utf8(field) {
            return Err(new_utf8_error(i, err.valid_up_to()));
        }
    }
    Ok(())
}

/// A single CSV row stored as raw bytes.
///
/// All fields are stored contiguously in one allocation, along with the
/// offset at which each field ends. Rows returned by a `Reader` are owned by
/// the caller and share nothing with the reader.
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub struct Row {
    /// All fields in this row, stored contiguously.
    fields: Vec<u8>,
    /// The offset at which each field ends.
    ends: Vec<usize>,
}

impl Row {
    /// Create a new empty `Row`.
    pub fn new() -> Row {
        Row::default()
    }

    /// Create a new empty `Row` with room for `bytes` bytes of field data
    /// spread over `fields` fields.
    pub fn with_capacity(bytes: usize, fields: usize) -> Row {
        Row {
            fields: Vec::with_capacity(bytes),
            ends: Vec::with_capacity(fields),
        }
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&[u8]> {
        let end = *self.ends.get(i)?;
        let start = if i == 0 { 0 } else { self.ends[i - 1] };
        Some(&self.fields[start..end])
    }

    /// Returns true if and only if this row has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of fields in this row.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Clear this row so that it has zero fields.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.ends.clear();
    }

    /// Add a new field to the end of this row.
    pub fn push_field(&mut self, field: &[u8]) {
        self.fields.extend_from_slice(field);
        self.ends.push(self.fields.len());
    }

    /// Return the bytes of every field, concatenated, without delimiters.
    pub fn as_slice(&self) -> &[u8] {
        &self.fields
    }

    /// Returns an iterator over all fields in this row.
    pub fn iter(&self) -> RowIter<'_> {
        RowIter { row: self, start: 0, i: 0 }
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<_> = self.iter().map(|field| field.as_bstr()).collect();
        write!(f, "Row({:?})", fields)
    }
}

impl ops::Index<usize> for Row {
    type Output = [u8];
    fn index(&self, i: usize) -> &[u8] {
        match self.get(i) {
            Some(field) => field,
            None => panic!("field index {} out of bounds for row", i),
        }
    }
}

impl<T: AsRef<[u8]>> From<Vec<T>> for Row {
    fn from(fields: Vec<T>) -> Row {
        Row::from_iter(fields)
    }
}

impl<'a, T: AsRef<[u8]>> From<&'a [T]> for Row {
    fn from(fields: &'a [T]) -> Row {
        Row::from_iter(fields)
    }
}

impl<T: AsRef<[u8]>> FromIterator<T> for Row {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Row {
        let mut row = Row::new();
        for field in iter {
            row.push_field(field.as_ref());
        }
        row
    }
}

impl<'a> IntoIterator for &'a Row {
    type IntoIter = RowIter<'a>;
    type Item = &'a [u8];
    fn into_iter(self) -> RowIter<'a> {
        self.iter()
    }
}

/// An iterator over the fields in a row.
#[derive(Clone, Debug)]
pub struct RowIter<'a> {
    row: &'a Row,
    start: usize,
    i: usize,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let end = *self.row.ends.get(self.i)?;
        let field = &self.row.fields[self.start..end];
        self.start = end;
        self.i += 1;
        Some(field)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.row.len() - self.i;
        (n, Some(n))
    }
}

impl<'a> ExactSizeIterator for RowIter<'a> {}

/// A single CSV row whose fields are all valid UTF-8.
#[derive(Clone, Default, Eq, Hash, PartialEq)]
pub struct StringRow(Row);

impl StringRow {
    /// Create a new empty `StringRow`.
    pub fn new() -> StringRow {
        StringRow::default()
    }

    /// Create a new `StringRow` from a `Row`.
    ///
    /// This does UTF-8 validation. If any field is not valid UTF-8, the
    /// error names the first such field.
    pub fn from_row(row: Row) -> result::Result<StringRow, Utf8Error> {
        validate(&row)?;
        Ok(StringRow(row))
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.0.get(i).map(|bytes| {
            // Every field was checked in `from_row` or came from a `&str`.
            unsafe { str::from_utf8_unchecked(bytes) }
        })
    }

    /// Returns true if and only if this row has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of fields in this row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Add a new field to the end of this row.
    pub fn push_field(&mut self, field: &str) {
        self.0.push_field(field.as_bytes());
    }

    /// Borrow this row as a `Row`.
    pub fn as_row(&self) -> &Row {
        &self.0
    }

    /// Convert this `StringRow` into a `Row`.
    pub fn into_row(self) -> Row {
        self.0
    }

    /// Returns an iterator over all fields in this row.
    pub fn iter(&self) -> StringRowIter<'_> {
        StringRowIter(self.0.iter())
    }
}

impl fmt::Debug for StringRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.iter().collect();
        write!(f, "StringRow({:?})", fields)
    }
}

impl ops::Index<usize> for StringRow {
    type Output = str;
    fn index(&self, i: usize) -> &str {
        match self.get(i) {
            Some(field) => field,
            None => panic!("field index {} out of bounds for row", i),
        }
    }
}

impl<T: AsRef<str>> FromIterator<T> for StringRow {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> StringRow {
        let mut row = StringRow::new();
        for field in iter {
            row.push_field(field.as_ref());
        }
        row
    }
}

impl<T: AsRef<str>> From<Vec<T>> for StringRow {
    fn from(fields: Vec<T>) -> StringRow {
        StringRow::from_iter(fields)
    }
}

impl<'a> IntoIterator for &'a StringRow {
    type IntoIter = StringRowIter<'a>;
    type Item = &'a str;
    fn into_iter(self) -> StringRowIter<'a> {
        self.iter()
    }
}

/// An iterator over the fields in a string row.
#[derive(Clone, Debug)]
pub struct StringRowIter<'a>(RowIter<'a>);

impl<'a> Iterator for StringRowIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.0.next().map(|bytes| {
            // See StringRow::get.
            unsafe { str::from_utf8_unchecked(bytes) }
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::{Row, StringRow};

    fn b(s: &str) -> &[u8] {
        s.as_bytes()
    }

    #[test]
    fn row_1() {
        let mut row = Row::new();
        row.push_field(b"foo");

        assert_eq!(row.len(), 1);
        assert_eq!(row.get(0), Some(b("foo")));
        assert_eq!(row.get(1), None);
        assert_eq!(row.get(2), None);
    }

    #[test]
    fn row_2() {
        let mut row = Row::new();
        row.push_field(b"foo");
        row.push_field(b"quux");

        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(b("foo")));
        assert_eq!(row.get(1), Some(b("quux")));
        assert_eq!(row.get(2), None);
        assert_eq!(&row[1], b("quux"));
        assert_eq!(row.as_slice(), b("fooquux"));
    }

    #[test]
    fn empty_row() {
        let row = Row::new();

        assert!(row.is_empty());
        assert_eq!(row.len(), 0);
        assert_eq!(row.get(0), None);
        assert_eq!(row.iter().count(), 0);
    }

    #[test]
    fn empty_fields_surrounded() {
        let row = Row::from(vec!["foo", "", "quux", ""]);

        assert_eq!(row.len(), 4);
        assert_eq!(row.get(0), Some(b("foo")));
        assert_eq!(row.get(1), Some(b("")));
        assert_eq!(row.get(2), Some(b("quux")));
        assert_eq!(row.get(3), Some(b("")));
        assert_eq!(row.get(4), None);
        let fields: Vec<&[u8]> = row.iter().collect();
        assert_eq!(fields, vec![b("foo"), b(""), b("quux"), b("")]);
    }

    #[test]
    fn clear_then_reuse() {
        let mut row = Row::from(vec!["a", "b"]);
        row.clear();
        assert!(row.is_empty());
        row.push_field(b"c");
        assert_eq!(row, Row::from(vec!["c"]));
    }

    #[test]
    fn debug_shows_fields() {
        let row = Row::from(vec![&b"a"[..], &b"\xFF"[..]]);
        assert_eq!(r#"Row(["a", "\xFF"])"#, format!("{:?}", row));

        let row = StringRow::from(vec!["a", "b"]);
        assert_eq!(r#"StringRow(["a", "b"])"#, format!("{:?}", row));
    }

    #[test]
    fn string_row_ok() {
        let row = StringRow::from_row(Row::from(vec!["a", "βγ"])).unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(1), Some("βγ"));
        assert_eq!(&row[0], "a");
        let fields: Vec<&str> = row.iter().collect();
        assert_eq!(fields, vec!["a", "βγ"]);
        assert_eq!(row.into_row(), Row::from(vec!["a", "βγ"]));
    }

    #[test]
    fn utf8_error_1() {
        let row = Row::from(vec![&b"foo"[..], &b"b\xFFar"[..]]);

        let err = StringRow::from_row(row).unwrap_err();
        assert_eq!(err.field(), 1);
        assert_eq!(err.valid_up_to(), 1);
    }

    #[test]
    fn utf8_error_2() {
        let row = Row::from(vec![&b"\xFF"[..]]);

        let err = StringRow::from_row(row).unwrap_err();
        assert_eq!(err.field(), 0);
        assert_eq!(err.valid_up_to(), 0);
    }

    // A single field on its own isn't valid UTF-8, but the concatenation of
    // all fields is.
    #[test]
    fn utf8_error_split_codepoint() {
        let row = Row::from(vec![&b"a\xc9"[..], &b"\x91b"[..]]);

        let err = StringRow::from_row(row).unwrap_err();
        assert_eq!(err.field(), 0);
        assert_eq!(err.valid_up_to(), 1);
    }

    #[test]
    fn utf8_clear_ok() {
        let mut row = Row::from(vec![&b"\xFF"[..]]);
        assert!(StringRow::from_row(row.clone()).is_err());
        row.clear();
        assert!(StringRow::from_row(row).is_ok());
    }
}
