/*!
`csv-stream-core` provides the two state machines behind `csv-stream`: a
field scanner that splits CSV data into fields and records, and a quoter
that decides which fields need quotes and escapes them.

Neither of them allocates or does any I/O. The scanner copies field data
into a caller provided buffer and reports whenever it needs more input or
more room, so callers decide how to buffer. This crate is `no_std`.

# Example: counting fields and records

```
use csv_stream_core::{ScanResult, Scanner};

let data = "foo,bar,baz\na,\"b,c\",d\n";
let mut scanner = Scanner::new();
let mut field = [0; 1024];
let (mut fields, mut records) = (0, 0);
let mut input = data.as_bytes();
loop {
    let (res, nin, _) = scanner.scan(input, &mut field);
    input = &input[nin..];
    match res {
        ScanResult::InputEmpty => continue,
        ScanResult::OutputFull => panic!("field too large"),
        ScanResult::Field { record_end } => {
            fields += 1;
            if record_end {
                records += 1;
            }
        }
        ScanResult::UnterminatedQuote => panic!("unterminated quote"),
        ScanResult::End => break,
    }
}
assert_eq!(6, fields);
assert_eq!(2, records);
```

# Example: quoting a field

```
use csv_stream_core::Quoter;

let quoter = Quoter::new();
assert!(quoter.should_quote(b"say \"hi\""));
let body: Vec<u8> =
    quoter.escaped(b"say \"hi\"").flat_map(|p| p.iter().cloned()).collect();
assert_eq!(&body[..], &b"say \"\"hi\"\""[..]);
```
*/

#![deny(missing_docs)]
#![warn(elided_lifetimes_in_paths)]
#![cfg_attr(not(test), no_std)]

pub use crate::quoter::{Escaped, Quoter, QuoterBuilder};
pub use crate::scanner::{ScanResult, Scanner, ScannerBuilder};

mod quoter;
mod scanner;
