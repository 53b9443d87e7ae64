use core::fmt;
use core::slice;

use memchr::{memchr, memchr2};

/// A builder for configuring a field quoter.
#[derive(Debug, Default)]
pub struct QuoterBuilder {
    quoter: Quoter,
}

impl QuoterBuilder {
    /// Create a new builder for configuring a field quoter.
    pub fn new() -> QuoterBuilder {
        QuoterBuilder::default()
    }

    /// Build a quoter from this configuration.
    pub fn build(&self) -> Quoter {
        let mut quoter = self.quoter.clone();
        quoter.build_table();
        quoter
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut QuoterBuilder {
        self.quoter.delimiter = delimiter;
        self
    }

    /// The quote byte to use when writing CSV.
    ///
    /// The default value is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut QuoterBuilder {
        self.quoter.quote = quote;
        self
    }

    /// The escape byte to use when writing CSV.
    ///
    /// Every quote byte inside a quoted field is written preceded by this
    /// byte. With the default, which is the quote byte itself, quotes are
    /// escaped by doubling them. e.g., `"` escapes to `""`. When this is a
    /// distinct byte, occurrences of the escape byte inside a quoted field
    /// are escaped too.
    pub fn escape(&mut self, escape: u8) -> &mut QuoterBuilder {
        self.quoter.escape = escape;
        self
    }
}

/// Decides which fields need quotes and escapes the ones that do.
///
/// A field needs quotes iff it contains the delimiter, the quote byte, `\r`
/// or `\n`. The quoter never writes anything itself; it hands out the
/// pieces of an escaped field so a caller can write them straight to its
/// sink without building the quoted field in memory.
#[derive(Clone)]
pub struct Quoter {
    delimiter: u8,
    quote: u8,
    escape: u8,
    /// Bytes that force a field to be quoted.
    needs_quote: [bool; 256],
}

impl Default for Quoter {
    fn default() -> Quoter {
        let mut quoter = Quoter {
            delimiter: b',',
            quote: b'"',
            escape: b'"',
            needs_quote: [false; 256],
        };
        quoter.build_table();
        quoter
    }
}

impl fmt::Debug for Quoter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quoter")
            .field("delimiter", &self.delimiter)
            .field("quote", &self.quote)
            .field("escape", &self.escape)
            .finish()
    }
}

impl Quoter {
    /// Creates a new quoter with the default configuration.
    pub fn new() -> Quoter {
        QuoterBuilder::new().build()
    }

    /// The field delimiter.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// The quote byte.
    pub fn quote(&self) -> u8 {
        self.quote
    }

    /// The escape byte.
    pub fn escape(&self) -> u8 {
        self.escape
    }

    /// Returns true if and only if `field` must be wrapped in quotes.
    ///
    /// The field is scanned once.
    pub fn should_quote(&self, field: &[u8]) -> bool {
        field.iter().any(|&b| self.needs_quote[b as usize])
    }

    /// Returns the pieces that make up the escaped body of `field`.
    ///
    /// Concatenating the pieces yields `field` with every quote byte (and
    /// escape byte, when distinct from the quote) preceded by the escape
    /// byte. The surrounding quotes are not included.
    pub fn escaped<'a>(&'a self, field: &'a [u8]) -> Escaped<'a> {
        Escaped { quoter: self, rest: field, escape_next: false, skip: 0 }
    }

    /// Returns the number of bytes the quoted form of `field` occupies,
    /// including the surrounding quotes.
    pub fn quoted_len(&self, field: &[u8]) -> usize {
        2 + self.escaped(field).map(|piece| piece.len()).sum::<usize>()
    }

    fn build_table(&mut self) {
        self.needs_quote = [false; 256];
        self.needs_quote[self.delimiter as usize] = true;
        self.needs_quote[self.quote as usize] = true;
        self.needs_quote[b'\r' as usize] = true;
        self.needs_quote[b'\n' as usize] = true;
    }

    /// Find the next byte in `s` that must be escaped.
    fn find_escapable(&self, s: &[u8]) -> Option<usize> {
        if self.escape == self.quote {
            memchr(self.quote, s)
        } else {
            memchr2(self.quote, self.escape, s)
        }
    }
}

/// An iterator over the pieces of an escaped field.
///
/// Created by `Quoter::escaped`.
#[derive(Debug)]
pub struct Escaped<'a> {
    quoter: &'a Quoter,
    rest: &'a [u8],
    /// Set when `rest` starts with a byte whose escape is due.
    escape_next: bool,
    /// The number of leading bytes of `rest` already escaped.
    skip: usize,
}

impl<'a> Iterator for Escaped<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let quoter = self.quoter;
        if self.escape_next {
            self.escape_next = false;
            self.skip = 1;
            return Some(slice::from_ref(&quoter.escape));
        }
        if self.rest.is_empty() {
            return None;
        }
        match quoter.find_escapable(&self.rest[self.skip..]) {
            None => {
                let piece = self.rest;
                self.rest = &[];
                Some(piece)
            }
            Some(i) => {
                let (piece, rest) = self.rest.split_at(self.skip + i);
                self.rest = rest;
                self.skip = 0;
                if piece.is_empty() {
                    self.skip = 1;
                    Some(slice::from_ref(&quoter.escape))
                } else {
                    self.escape_next = true;
                    Some(piece)
                }
            }
        }
    }
}
