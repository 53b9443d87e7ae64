/// The result of scanning at most one field from CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanResult {
    /// The caller provided input was exhausted before the end of a field or
    /// record was found.
    InputEmpty,
    /// The caller provided output buffer was filled before an entire field
    /// could be written to it.
    ///
    /// No input byte that still needs to be copied has been consumed. The
    /// caller should grow its output buffer and call `scan` again with the
    /// remaining input.
    OutputFull,
    /// The end of a field was found.
    ///
    /// Note that when `record_end` is true, then the end of this field also
    /// corresponds to the end of a record.
    Field {
        /// Whether this was the last field in a record or not.
        record_end: bool,
    },
    /// The end of the data was reached while inside a quoted section.
    ///
    /// This is returned at most once, in place of the final `Field`. The
    /// field data written so far is incomplete. The next call with empty
    /// input returns `End`.
    UnterminatedQuote,
    /// All CSV data has been read.
    ///
    /// This state can only be returned when an empty input buffer is provided
    /// by the caller.
    End,
}

/// Builds a field scanner with various configuration knobs.
///
/// Once a `Scanner` is built, its configuration cannot be changed.
#[derive(Debug, Default)]
pub struct ScannerBuilder {
    scanner: Scanner,
}

impl ScannerBuilder {
    /// Create a new builder.
    pub fn new() -> ScannerBuilder {
        ScannerBuilder::default()
    }

    /// Build a scanner from this configuration.
    pub fn build(&self) -> Scanner {
        let mut scanner = self.scanner.clone();
        scanner.reset();
        scanner
    }

    /// The field delimiter to use when scanning CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ScannerBuilder {
        self.scanner.delimiter = delimiter;
        self
    }

    /// The quote byte to use when scanning CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut ScannerBuilder {
        self.scanner.quote = quote;
        self
    }

    /// The escape byte to use inside quoted fields.
    ///
    /// When this is equal to the quote byte (the default), quotes are
    /// escaped by doubling them. When it is any other byte, say `\`, then
    /// `\` followed by any byte inside a quoted field yields that byte
    /// literally. Doubled quotes are recognized in either case.
    pub fn escape(&mut self, escape: u8) -> &mut ScannerBuilder {
        self.scanner.escape = escape;
        self
    }

    /// The byte that marks a comment line.
    ///
    /// This only has an effect when `skip_comments` is enabled. The default
    /// is `b'#'`.
    pub fn comment(&mut self, comment: u8) -> &mut ScannerBuilder {
        self.scanner.comment = comment;
        self
    }

    /// Whether to drop spaces that precede the contents of a field.
    ///
    /// This is disabled by default.
    pub fn skip_initial_space(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.scanner.skip_initial_space = yes;
        self
    }

    /// Whether to ignore lines that hold a single empty field.
    ///
    /// A line is empty when its terminator (or the end of the data) is
    /// reached before any delimiter and before any field byte. Besides a
    /// bare line terminator, this covers a line holding only `""`, and a
    /// line of spaces when `skip_initial_space` is enabled. When disabled
    /// (the default), such a line is reported as a record with a single
    /// empty field.
    pub fn skip_empty_lines(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.scanner.skip_empty_lines = yes;
        self
    }

    /// Whether to ignore lines whose first field starts with the comment
    /// byte.
    ///
    /// The comment byte must be the first byte of the line, or the first
    /// byte after the spaces dropped by `skip_initial_space`. A quoted
    /// first field is never a comment. A comment line is dropped up to and
    /// including its line terminator, no matter which delimiters or quotes
    /// it contains. This is disabled by default.
    pub fn skip_comments(&mut self, yes: bool) -> &mut ScannerBuilder {
        self.scanner.skip_comments = yes;
        self
    }
}

/// A pull based CSV field scanner.
///
/// The scanner consumes one byte at a time and copies field contents, with
/// quotes removed and escapes resolved, into a caller provided buffer. All
/// of its state lives in this value, so callers may feed it input in chunks
/// of any size: a field or quoted section that spans several chunks is
/// reconstructed exactly as if the data had been given all at once.
///
/// A record ends at `\r`, `\n`, `\r\n` or NUL outside of quotes, or at the
/// end of the data. Quoted sections accept delimiters and line terminators
/// verbatim. A quote byte that appears after a field has started outside of
/// quotes is kept as data.
///
/// The scanner never allocates and never fails. Malformed data always has
/// *a* parse, with one exception: a quoted section that is still open when
/// the data ends is reported as `ScanResult::UnterminatedQuote`.
#[derive(Clone, Debug)]
pub struct Scanner {
    /// The current state of the machine.
    state: State,
    /// The delimiter that separates fields.
    delimiter: u8,
    /// The quotation byte.
    quote: u8,
    /// The byte that escapes the next byte inside quotes.
    escape: u8,
    /// The byte that marks a comment line.
    comment: u8,
    skip_initial_space: bool,
    skip_empty_lines: bool,
    skip_comments: bool,
    /// The current line number.
    line: u64,
    /// Set while no field of the current record has ended.
    first_field: bool,
    /// Set once a byte of the current field was copied.
    field_data: bool,
}

impl Default for Scanner {
    fn default() -> Scanner {
        Scanner {
            state: State::RecordStart,
            delimiter: b',',
            quote: b'"',
            escape: b'"',
            comment: b'#',
            skip_initial_space: false,
            skip_empty_lines: false,
            skip_comments: false,
            line: 1,
            first_field: true,
            field_data: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// Nothing of the current line has been seen yet.
    RecordStart,
    /// Dropping the rest of a comment line.
    InComment,
    FieldStart,
    /// Absorbing leading spaces of a field.
    FieldNotStarted,
    FieldStarted,
    InsideQuotedField,
    /// The previous byte was a (non-quote) escape inside quotes.
    Escaped,
    /// The previous byte closed a quoted section, unless this one is a
    /// quote too.
    MayBeEscaped,
    EndFieldDelim,
    EndRecord,
    /// A record ended at `\r`, so a `\n` right after it belongs to it.
    EndRecordCr,
    AfterCr,
}

impl State {
    fn is_field_final(&self) -> bool {
        match *self {
            State::EndFieldDelim | State::EndRecord | State::EndRecordCr => {
                true
            }
            _ => false,
        }
    }
}

impl Scanner {
    /// Create a new scanner with a default configuration.
    pub fn new() -> Scanner {
        ScannerBuilder::new().build()
    }

    /// Reset the scanner such that it behaves as if it had never been used.
    pub fn reset(&mut self) {
        self.state = State::RecordStart;
        self.line = 1;
        self.first_field = true;
        self.field_data = false;
    }

    /// Return the current line number as measured by the number of
    /// occurrences of `\n` consumed so far.
    ///
    /// Line numbers start at `1` and are reset when `reset` is called.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns true if and only if the scanner is between records.
    ///
    /// This is true before any input was given, right after a record ended
    /// and once the end of the data was reported.
    pub fn is_record_start(&self) -> bool {
        match self.state {
            State::RecordStart
            | State::InComment
            | State::AfterCr
            | State::EndRecord
            | State::EndRecordCr => true,
            _ => false,
        }
    }

    /// Scan CSV data in `input` and copy field data to `output`.
    ///
    /// Calling this routine scans at most a single field and returns three
    /// values: a `ScanResult` telling the caller what to do next, the
    /// number of bytes consumed from `input` and the number of bytes written
    /// to `output`.
    ///
    /// Field data is appended to whatever the caller already holds for the
    /// current field, so after `InputEmpty` or `OutputFull` the caller keeps
    /// its partial field and passes a fresh `output` slice positioned after
    /// it.
    ///
    /// # Termination
    ///
    /// An empty `input` buffer means there is no CSV data left. When the
    /// caller has exhausted all CSV data, it should continue to call `scan`
    /// with an empty input buffer until `ScanResult::End` is returned.
    pub fn scan(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> (ScanResult, usize, usize) {
        self.state = self.resume(self.state);
        if input.is_empty() {
            return (self.finish(), 0, 0);
        }
        let (mut nin, mut nout) = (0, 0);
        let mut state = self.state;
        while nin < input.len() {
            let c = input[nin];
            let (next, consume, copy) = self.transition(state, c);
            if copy {
                if nout >= output.len() {
                    self.state = state;
                    return (ScanResult::OutputFull, nin, nout);
                }
                output[nout] = c;
                nout += 1;
                self.field_data = true;
            }
            if consume {
                self.line += (c == b'\n') as u64;
                nin += 1;
            }
            state = next;
            if state.is_field_final() {
                self.first_field = state != State::EndFieldDelim;
                self.field_data = false;
                break;
            }
        }
        self.state = state;
        let res = match state {
            State::EndFieldDelim => ScanResult::Field { record_end: false },
            State::EndRecord | State::EndRecordCr => {
                ScanResult::Field { record_end: true }
            }
            _ => ScanResult::InputEmpty,
        };
        (res, nin, nout)
    }

    /// Leave a final state once the caller has seen it.
    fn resume(&self, state: State) -> State {
        match state {
            State::EndFieldDelim => State::FieldStart,
            State::EndRecord => State::RecordStart,
            State::EndRecordCr => State::AfterCr,
            state => state,
        }
    }

    /// Handle the end of the data.
    fn finish(&mut self) -> ScanResult {
        use self::State::*;

        match self.state {
            RecordStart | InComment | AfterCr => ScanResult::End,
            FieldStart | FieldNotStarted | FieldStarted | MayBeEscaped => {
                if self.is_empty_line() {
                    self.state = RecordStart;
                    return ScanResult::End;
                }
                self.state = EndRecord;
                self.first_field = true;
                self.field_data = false;
                ScanResult::Field { record_end: true }
            }
            InsideQuotedField | Escaped => {
                self.state = EndRecord;
                self.first_field = true;
                self.field_data = false;
                ScanResult::UnterminatedQuote
            }
            EndFieldDelim | EndRecord | EndRecordCr => {
                unreachable!("final states are left before finishing")
            }
        }
    }

    /// Compute the next state for byte `c`.
    ///
    /// The second value is true when `c` is consumed; otherwise it must be
    /// fed again in the next state. The third value is true when `c` is
    /// field data.
    #[inline(always)]
    fn transition(&self, state: State, c: u8) -> (State, bool, bool) {
        use self::State::*;

        match state {
            RecordStart => {
                if self.skip_empty_lines && is_terminator(c) {
                    (RecordStart, true, false)
                } else if self.is_comment_start(c) {
                    (InComment, true, false)
                } else {
                    (FieldStart, false, false)
                }
            }
            InComment => {
                if c == b'\r' {
                    (AfterCr, true, false)
                } else if is_terminator(c) {
                    (RecordStart, true, false)
                } else {
                    (InComment, true, false)
                }
            }
            FieldStart => self.start_field(c, self.skip_initial_space),
            FieldNotStarted => {
                if c == b' ' {
                    (FieldNotStarted, true, false)
                } else if self.is_comment_start(c) {
                    (InComment, true, false)
                } else {
                    self.start_field(c, false)
                }
            }
            FieldStarted => self.unquoted(c),
            InsideQuotedField => {
                if c == self.quote {
                    (MayBeEscaped, true, false)
                } else if c == self.escape {
                    (Escaped, true, false)
                } else {
                    (InsideQuotedField, true, true)
                }
            }
            Escaped => (InsideQuotedField, true, true),
            MayBeEscaped => {
                if c == self.quote {
                    (InsideQuotedField, true, true)
                } else {
                    (FieldStarted, false, false)
                }
            }
            EndFieldDelim => (FieldStart, false, false),
            EndRecord => (RecordStart, false, false),
            EndRecordCr => (AfterCr, false, false),
            AfterCr => (RecordStart, c == b'\n', false),
        }
    }

    #[inline(always)]
    fn start_field(&self, c: u8, skip_space: bool) -> (State, bool, bool) {
        if c == self.quote {
            (State::InsideQuotedField, true, false)
        } else if skip_space && c == b' ' {
            (State::FieldNotStarted, true, false)
        } else {
            self.unquoted(c)
        }
    }

    #[inline(always)]
    fn unquoted(&self, c: u8) -> (State, bool, bool) {
        if c == self.delimiter {
            (State::EndFieldDelim, true, false)
        } else if c == b'\r' {
            if self.is_empty_line() {
                (State::AfterCr, true, false)
            } else {
                (State::EndRecordCr, true, false)
            }
        } else if is_terminator(c) {
            if self.is_empty_line() {
                (State::RecordStart, true, false)
            } else {
                (State::EndRecord, true, false)
            }
        } else {
            (State::FieldStarted, true, true)
        }
    }

    /// Returns true when a record ending now is an empty line to drop.
    #[inline(always)]
    fn is_empty_line(&self) -> bool {
        self.skip_empty_lines && self.first_field && !self.field_data
    }

    /// Returns true when `c`, the first byte of a record's content, starts
    /// a comment line to drop.
    #[inline(always)]
    fn is_comment_start(&self, c: u8) -> bool {
        self.skip_comments && self.first_field && c == self.comment
    }
}

/// Returns true for the bytes that end a record outside of quotes.
#[inline(always)]
fn is_terminator(c: u8) -> bool {
    c == b'\r' || c == b'\n' || c == b'\x00'
}
