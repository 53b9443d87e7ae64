use std::io::Read;

use csv_stream::{ReaderBuilder, Row};

/// A source that hands out its data in fixed chunks, no matter how much
/// room the caller's buffer has.
#[derive(Debug)]
struct ChunkReader<'a> {
    chunks: Vec<&'a [u8]>,
}

impl<'a> ChunkReader<'a> {
    fn new(chunks: Vec<&'a [u8]>) -> ChunkReader<'a> {
        ChunkReader { chunks }
    }

    /// Split `data` into chunks of `size` bytes.
    fn sized(data: &'a [u8], size: usize) -> ChunkReader<'a> {
        ChunkReader::new(data.chunks(size).collect())
    }
}

impl<'a> Read for ChunkReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        // Skip empty chunks, since an empty read means the end of the data.
        while self.chunks.first().map_or(false, |c| c.is_empty()) {
            self.chunks.remove(0);
        }
        let chunk = match self.chunks.first_mut() {
            None => return Ok(0),
            Some(chunk) => chunk,
        };
        let len = std::cmp::min(buf.len(), chunk.len());
        buf[..len].copy_from_slice(&chunk[..len]);
        *chunk = &chunk[len..];
        Ok(len)
    }
}

fn read_rows<R: Read>(rdr: R, builder: &mut ReaderBuilder) -> Vec<Row> {
    let mut rdr = builder.from_reader(rdr);
    rdr.rows().map(Result::unwrap).collect()
}

const DATA: &[u8] = b"\
# leading comment, \"with a quote\"\r\n\
name,quote,notes\r\n\
\r\n\
  alice , \"she said \"\"hi, there\"\"\",\"multi\r\nline\"\n\
bob,\"\",stray\"quote\n\
\n\
#comment\n\
carol,\"a\"\"\",\"\"\"b\"\r\
dave,,\"x\ny\"";

fn builders() -> Vec<ReaderBuilder> {
    let mut plain = ReaderBuilder::new();
    plain.buffer_capacity(64);
    let mut skipping = ReaderBuilder::new();
    skipping
        .skip_empty_lines(true)
        .skip_comments(true)
        .skip_initial_space(true)
        .buffer_capacity(64);
    vec![plain, skipping]
}

#[test]
fn test_chunks() {
    let input_chunks = vec![
        &b"col_a,col_b,col_c\n0aaaa,0bbbb,0cccc\n1aaaa,1bbbb,1cc"[..],
        &b"cc\n"[..],
        &b"2aaaa,2bbbb"[..],
        &b",2cccc\n"[..],
        &b"3aaaa,3bbbb,3cccc\n4aaaa,4bbbb,4cccc\n5aaaa,5bb"[..],
        &b"bb,5cccc"[..],
        &b"\n"[..],
        &b""[..],
        &b"6aaa"[..],
    ];
    let output =
        read_rows(ChunkReader::new(input_chunks), &mut ReaderBuilder::new());
    assert_eq!(8, output.len());
    assert_eq!(output[0].as_slice(), &b"col_acol_bcol_c"[..]);
    assert_eq!(output[1].as_slice(), &b"0aaaa0bbbb0cccc"[..]);
    assert_eq!(output[2].as_slice(), &b"1aaaa1bbbb1cccc"[..]);
    assert_eq!(output[3].as_slice(), &b"2aaaa2bbbb2cccc"[..]);
    assert_eq!(output[4].as_slice(), &b"3aaaa3bbbb3cccc"[..]);
    assert_eq!(output[5].as_slice(), &b"4aaaa4bbbb4cccc"[..]);
    assert_eq!(output[6].as_slice(), &b"5aaaa5bbbb5cccc"[..]);
    assert_eq!(output[7].as_slice(), &b"6aaa"[..]);
}

#[test]
fn chunk_size_invariance() {
    for mut builder in builders() {
        let expected = read_rows(DATA, &mut builder);
        assert!(expected.len() >= 4);
        for size in 1..=DATA.len() {
            let got = read_rows(ChunkReader::sized(DATA, size), &mut builder);
            assert_eq!(expected, got, "chunk size {}", size);
        }
    }
}

#[test]
fn buffer_capacity_invariance() {
    for mut builder in builders() {
        let expected = read_rows(DATA, &mut builder);
        for capacity in 1..=32 {
            builder.buffer_capacity(capacity);
            let got = read_rows(ChunkReader::sized(DATA, 7), &mut builder);
            assert_eq!(expected, got, "buffer capacity {}", capacity);
        }
    }
}

#[test]
fn expected_rows() {
    let mut builder = ReaderBuilder::new();
    builder.skip_empty_lines(true).skip_comments(true).skip_initial_space(true);
    let rows = read_rows(ChunkReader::sized(DATA, 3), &mut builder);
    let expected = vec![
        Row::from(vec!["name", "quote", "notes"]),
        Row::from(vec!["alice ", "she said \"hi, there\"", "multi\r\nline"]),
        Row::from(vec!["bob", "", "stray\"quote"]),
        Row::from(vec!["carol", "a\"", "\"b"]),
        Row::from(vec!["dave", "", "x\ny"]),
    ];
    assert_eq!(expected, rows);
}
