use std::io::{self, Read};

use crate::core::types::ConvertError;

/// A configuration bundle for the table reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The byte separating fields in a record. Default: `,`.
    pub delimiter: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config { delimiter: b',' }
    }
}

/// One record of the table along with the 1-based line it starts on.
#[derive(Debug, Clone)]
pub struct Record {
    pub line: u64,
    pub fields: csv::StringRecord,
}

/// Wraps the input and remembers where its line breaks are, so a record's byte offset can be
/// turned into the line it starts on.
///
/// The csv reader's own line counter can't be used for this: it undercounts after `\r\n`
/// terminators and after blank lines, which it skips.
#[derive(Debug)]
pub struct LineIndex<R> {
    inner: R,
    offset: u64,
    // offsets of every `\n`
    newlines: Vec<u64>,
    // maximal runs of `\r`/`\n` bytes, as [start, end)
    breaks: Vec<(u64, u64)>,
}

impl<R> LineIndex<R> {
    pub fn new(inner: R) -> LineIndex<R> {
        LineIndex {
            inner,
            offset: 0,
            newlines: Vec::new(),
            breaks: Vec::new(),
        }
    }

    /// The 1-based line of the first byte of a record whose position is `byte`. A record's
    /// position may point into the terminators (or blank lines) in front of it; those are
    /// skipped first. Only bytes already read through the index are taken into account.
    pub fn line_at(&self, byte: u64) -> u64 {
        let after = self.breaks.partition_point(|run| run.0 <= byte);
        let start = match after.checked_sub(1).map(|i| self.breaks[i]) {
            Some((_, end)) if byte < end => end,
            _ => byte,
        };
        self.newlines.partition_point(|&at| at < start) as u64 + 1
    }
}

impl<R: Read> Read for LineIndex<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for (i, b) in buf[..n].iter().enumerate() {
            if *b != b'\r' && *b != b'\n' {
                continue;
            }
            let at = self.offset + i as u64;
            if *b == b'\n' {
                self.newlines.push(at);
            }
            match self.breaks.last_mut() {
                Some(run) if run.1 == at => run.1 = at + 1,
                _ => self.breaks.push((at, at + 1)),
            }
        }
        self.offset += n as u64;
        Ok(n)
    }
}

/// Iterator over the records of a table, header included.
pub struct Records<R> {
    reader: csv::Reader<LineIndex<R>>,
}

impl<R: Read> Iterator for Records<R> {
    type Item = Result<Record, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut fields = csv::StringRecord::new();
        match self.reader.read_record(&mut fields) {
            Ok(true) => Some(Ok(Record {
                line: self.line_of(fields.position()),
                fields,
            })),
            Ok(false) => None,
            Err(error) => Some(Err(self.from_csv_error(error))),
        }
    }
}

impl<R: Read> Records<R> {
    fn line_of(&self, pos: Option<&csv::Position>) -> u64 {
        match pos {
            Some(pos) => self.reader.get_ref().line_at(pos.byte()),
            None => 0,
        }
    }

    fn from_csv_error(&self, error: csv::Error) -> ConvertError {
        let line = error.position().map(|p| self.line_of(Some(p)));
        match error.kind() {
            csv::ErrorKind::UnequalLengths { pos, .. } => ConvertError::RowShape {
                line: pos
                    .as_ref()
                    .map(|p| self.line_of(Some(p)))
                    .or(line)
                    .unwrap_or(0),
            },
            _ => ConvertError::Csv {
                line,
                source: error,
            },
        }
    }
}

/// Reads the table one record at a time. The header is returned as an ordinary record; field
/// counts are checked against it by the csv reader itself.
///
/// The csv reader is lenient in two ways: a `"` inside an unquoted field is kept as a literal
/// character, and a leading UTF-8 byte order mark is dropped.
pub fn records<R: Read>(reader: R, config: &Config) -> Records<R> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .delimiter(config.delimiter)
        .from_reader(LineIndex::new(reader));
    Records { reader }
}

#[cfg(test)]
mod tests {
    use crate::core::reader::*;

    fn read_all(input: &str, config: &Config) -> Result<Vec<Record>, ConvertError> {
        records(input.as_bytes(), config).collect()
    }

    #[test]
    fn header_is_the_first_record() {
        let records = read_all("stack,time/ms\nfoo;bar,1\n", &Config::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 1);
        assert_eq!(&records[0].fields[0], "stack");
        assert_eq!(records[1].line, 2);
        assert_eq!(&records[1].fields[0], "foo;bar");
    }

    #[test]
    fn quoted_fields_can_contain_delimiters() {
        let records =
            read_all("stack,time/ms\n\"a,b;c\",1\n", &Config::default()).unwrap();
        assert_eq!(&records[1].fields[0], "a,b;c");
    }

    #[test]
    fn custom_delimiter() {
        let config = Config { delimiter: b'\t' };
        let records = read_all("stack\ttime/ms\nfoo,bar\t1\n", &config).unwrap();
        assert_eq!(&records[1].fields[0], "foo,bar");
        assert_eq!(&records[1].fields[1], "1");
    }

    #[test]
    fn short_row_reports_line() {
        match read_all("stack,weight\nfoo;bar", &Config::default()) {
            Err(ConvertError::RowShape { line }) => assert_eq!(line, 2),
            other => panic!("expected a row shape error, got {:?}", other),
        }
    }

    #[test]
    fn long_row_reports_line() {
        match read_all("stack,weight\nfoo,1\nbar,2,3\n", &Config::default()) {
            Err(ConvertError::RowShape { line }) => assert_eq!(line, 3),
            other => panic!("expected a row shape error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_utf8_is_a_csv_error() {
        let input: &[u8] = b"stack,weight\n\xff\xfe,1\n";
        let result: Result<Vec<Record>, ConvertError> =
            records(input, &Config::default()).collect();
        assert!(matches!(result, Err(ConvertError::Csv { .. })));
    }

    fn lines(input: &str) -> Vec<u64> {
        read_all(input, &Config::default())
            .expect("read failed")
            .iter()
            .map(|r| r.line)
            .collect()
    }

    fn row_shape_line(input: &str) -> u64 {
        match read_all(input, &Config::default()) {
            Err(ConvertError::RowShape { line }) => line,
            other => panic!("expected a row shape error, got {:?}", other),
        }
    }

    #[test]
    fn line_index_skips_terminators_in_front_of_a_record() -> io::Result<()> {
        let mut index = LineIndex::new("a\r\n\r\nb\nc".as_bytes());
        io::copy(&mut index, &mut io::sink())?;
        assert_eq!(index.line_at(0), 1);
        assert_eq!(index.line_at(1), 3);
        assert_eq!(index.line_at(3), 3);
        assert_eq!(index.line_at(5), 3);
        assert_eq!(index.line_at(6), 4);
        assert_eq!(index.line_at(7), 4);
        Ok(())
    }

    #[test]
    fn crlf_line_numbers() {
        assert_eq!(lines("stack,w\r\nfoo,1\r\nbar,2\r\nbaz,3\r\n"), vec![1, 2, 3, 4]);
        assert_eq!(row_shape_line("stack,w\r\nfoo,1\r\nbar,2\r\nbaz\r\n"), 4);
    }

    #[test]
    fn blank_lines_are_counted() {
        assert_eq!(lines("stack,w\n\nfoo,1\n\n\nbar,2\n"), vec![1, 3, 6]);
        assert_eq!(lines("\nstack,w\nfoo,1\n"), vec![2, 3]);
        assert_eq!(row_shape_line("stack,w\n\nfoo,1,2\n"), 3);
        assert_eq!(row_shape_line("stack,w\r\n\r\nfoo,1\r\n\r\nbar\r\n"), 5);
    }

    #[test]
    fn multiline_quoted_field_starts_on_its_first_line() {
        assert_eq!(lines("stack,w\n\"a\nb\",1\nc,2\n"), vec![1, 2, 4]);
        assert_eq!(row_shape_line("stack,w\n\"a\nb\",1\nc\n"), 4);
    }

    #[test]
    fn bare_quote_in_unquoted_field_is_literal() {
        let records = read_all("stack,w\na\"b,1\n", &Config::default()).unwrap();
        assert_eq!(&records[1].fields[0], "a\"b");
    }

    #[test]
    fn leading_byte_order_mark_is_dropped() {
        let records = read_all("\u{feff}stack,w\nfoo,1\n", &Config::default()).unwrap();
        assert_eq!(&records[0].fields[0], "stack");
        assert_eq!(records[1].line, 2);
    }
}
