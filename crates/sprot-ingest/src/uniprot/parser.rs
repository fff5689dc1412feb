//! UniProtKB flat-file (DAT) record assembler
//!
//! Lines are classified by their two-letter line code and folded into a
//! [`ProteinEntry`]; a `//` line hands the finished entry out and starts a
//! fresh one. Only the line types below influence the result:
//!
//! | Prefix         | Effect                                                 |
//! |----------------|--------------------------------------------------------|
//! | `ID`           | identifier, reviewed status, sequence length           |
//! | `AC`           | primary accession (first `AC` line only)               |
//! | `DE   Flags:`  | fragment flag when the line mentions `Fragment`        |
//! | `FT   NON_TER` | fragment flag                                          |
//! | `OX`           | NCBI taxonomy id                                       |
//! | `SQ`           | CRC-64 checksum                                        |
//! | `//`           | end of record                                          |
//!
//! Parsing never fails. A malformed line leaves its fields at their defaults.
//! See: https://web.expasy.org/docs/userman.html

use std::io::{self, BufRead};

use super::models::{
    bounded_text, ProteinEntry, ACCESSION_MAX_LEN, CRC64_MAX_LEN, IDENTIFIER_MAX_LEN,
};

/// Longest line considered, terminator included. Bytes past the bound are
/// dropped.
pub const MAX_LINE_BYTES: usize = 1024;

const DESCRIPTION_FLAGS: &[u8] = b"DE   Flags:";
const NON_TERMINAL_FEATURE: &[u8] = b"FT   NON_TER";

/// Line classes the assembler reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Identification,
    Accession,
    DescriptionFlags,
    NonTerminalFeature,
    OrganismTaxonomy,
    SequenceHeader,
    EndOfRecord,
    Ignored,
}

impl LineKind {
    /// Classify an already right-trimmed line
    pub fn classify(line: &[u8]) -> Self {
        if line.starts_with(b"ID") {
            LineKind::Identification
        } else if line.starts_with(b"AC") {
            LineKind::Accession
        } else if line.starts_with(DESCRIPTION_FLAGS) {
            LineKind::DescriptionFlags
        } else if line.starts_with(NON_TERMINAL_FEATURE) {
            LineKind::NonTerminalFeature
        } else if line.starts_with(b"OX") {
            LineKind::OrganismTaxonomy
        } else if line.starts_with(b"SQ") {
            LineKind::SequenceHeader
        } else if line.starts_with(b"//") {
            LineKind::EndOfRecord
        } else {
            LineKind::Ignored
        }
    }
}

/// Push-style record assembler.
///
/// Feed it lines in stream order; every `//` line yields exactly one entry.
#[derive(Debug, Default)]
pub struct EntryAssembler {
    current: ProteinEntry,
    /// A classified line has touched `current` since the last emission
    pending: bool,
}

impl EntryAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one raw line (terminator optional).
    ///
    /// Returns the completed entry when `line` is an end-of-record marker.
    pub fn feed(&mut self, line: &[u8]) -> Option<ProteinEntry> {
        let line = trim_end(clamp_line(line));

        match LineKind::classify(line) {
            LineKind::Identification => self.parse_id_line(line),
            LineKind::Accession => self.parse_ac_line(line),
            LineKind::DescriptionFlags => self.parse_de_flags_line(line),
            LineKind::NonTerminalFeature => self.current.is_fragment = true,
            LineKind::OrganismTaxonomy => self.parse_ox_line(line),
            LineKind::SequenceHeader => self.parse_sq_line(line),
            LineKind::EndOfRecord => return Some(self.emit()),
            LineKind::Ignored => return None,
        }

        self.pending = true;
        None
    }

    /// True if a record has been started but not yet terminated by `//`
    pub fn has_partial(&self) -> bool {
        self.pending
    }

    /// Entry under construction
    pub fn current(&self) -> &ProteinEntry {
        &self.current
    }

    fn emit(&mut self) -> ProteinEntry {
        self.pending = false;
        std::mem::take(&mut self.current)
    }

    /// ID   ENTRY_NAME   Reviewed;   123 AA.
    fn parse_id_line(&mut self, line: &[u8]) {
        for (i, token) in fields(line).enumerate() {
            match i {
                1 => self.current.identifier = bounded_text(token, IDENTIFIER_MAX_LEN),
                2 => self.current.is_reviewed = contains(token, b"Reviewed"),
                3 => self.current.length = parse_leading_int(token),
                _ => {},
            }
        }
    }

    /// AC   P12345; P67890;
    fn parse_ac_line(&mut self, line: &[u8]) {
        if !self.current.accession.is_empty() {
            return;
        }

        if let Some(token) = fields(line).nth(1) {
            // Drop the ';' separator
            let token = &token[..token.len() - 1];
            self.current.accession = bounded_text(token, ACCESSION_MAX_LEN);
        }
    }

    /// DE   Flags: Precursor; Fragment;
    fn parse_de_flags_line(&mut self, line: &[u8]) {
        if contains(line, b"Fragment") {
            self.current.is_fragment = true;
        }
    }

    /// OX   NCBI_TaxID=9606;
    ///
    /// Runs of `=` count as one separator.
    fn parse_ox_line(&mut self, line: &[u8]) {
        let mut segments = line.split(|&b| b == b'=').filter(|s| !s.is_empty());
        if let Some(value) = segments.nth(1) {
            self.current.taxon_id = parse_leading_int(value);
        }
    }

    /// SQ   SEQUENCE   256 AA;  28000 MW;  ABCDEF0123456789 CRC64;
    fn parse_sq_line(&mut self, line: &[u8]) {
        if let Some(token) = fields(line).nth(6) {
            self.current.crc64 = bounded_text(token, CRC64_MAX_LEN);
        }
    }
}

/// Pull-style reader yielding one [`ProteinEntry`] per `//` marker.
///
/// A trailing record without a terminating `//` is discarded.
pub struct FlatFileReader<R> {
    reader: R,
    assembler: EntryAssembler,
    buffer: Vec<u8>,
    line_number: u64,
    finished: bool,
}

impl<R: BufRead> FlatFileReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            assembler: EntryAssembler::new(),
            buffer: Vec::with_capacity(MAX_LINE_BYTES),
            line_number: 0,
            finished: false,
        }
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// True once the input is exhausted while a record was still open
    pub fn discarded_partial(&self) -> bool {
        self.finished && self.assembler.has_partial()
    }

    /// Read the next physical line into `buffer`, keeping at most
    /// [`MAX_LINE_BYTES`] of it. The remainder up to `\n` is consumed and
    /// dropped. Returns the number of bytes consumed, 0 at end of input.
    fn read_bounded_line(&mut self) -> io::Result<usize> {
        self.buffer.clear();
        let mut consumed = 0;

        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if available.is_empty() {
                return Ok(consumed);
            }

            let (chunk, line_done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..=i], true),
                None => (available, false),
            };

            let room = MAX_LINE_BYTES.saturating_sub(self.buffer.len());
            self.buffer.extend_from_slice(&chunk[..chunk.len().min(room)]);

            let used = chunk.len();
            self.reader.consume(used);
            consumed += used;

            if line_done {
                return Ok(consumed);
            }
        }
    }
}

impl<R: BufRead> Iterator for FlatFileReader<R> {
    type Item = io::Result<ProteinEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.read_bounded_line() {
                Ok(0) => {
                    self.finished = true;
                    return None;
                },
                Ok(_) => {
                    self.line_number += 1;
                    if let Some(entry) = self.assembler.feed(&self.buffer) {
                        return Some(Ok(entry));
                    }
                },
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                },
            }
        }
    }
}

/// Drop the line terminator and anything past the line bound
fn clamp_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    &line[..line.len().min(MAX_LINE_BYTES - 1)]
}

/// C `isspace`: space, \t, \n, \v, \f, \r
fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line.iter().rposition(|&b| !is_space(b)).map_or(0, |i| i + 1);
    &line[..end]
}

/// Whitespace-separated, non-empty tokens
fn fields(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|&b| is_space(b)).filter(|token| !token.is_empty())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// `atoi`-style parse: leading whitespace, optional sign, then digits up to
/// the first non-digit. Yields 0 when no digit is found and saturates at the
/// `i32` bounds.
pub fn parse_leading_int(bytes: &[u8]) -> i32 {
    let mut rest = bytes;
    while let [first, tail @ ..] = rest {
        if !is_space(*first) {
            break;
        }
        rest = tail;
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        },
        Some(b'+') => {
            rest = &rest[1..];
            false
        },
        _ => false,
    };

    let mut value: i64 = 0;
    for &b in rest.iter().take_while(|b| b.is_ascii_digit()) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }

    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn assemble(text: &str) -> Vec<ProteinEntry> {
        FlatFileReader::new(text.as_bytes())
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(LineKind::classify(b"ID   X"), LineKind::Identification);
        assert_eq!(LineKind::classify(b"AC   P1;"), LineKind::Accession);
        assert_eq!(LineKind::classify(b"DE   Flags: Fragment;"), LineKind::DescriptionFlags);
        assert_eq!(LineKind::classify(b"DE   RecName: Full=X;"), LineKind::Ignored);
        assert_eq!(LineKind::classify(b"FT   NON_TER         1"), LineKind::NonTerminalFeature);
        assert_eq!(LineKind::classify(b"FT   DOMAIN          1..20"), LineKind::Ignored);
        assert_eq!(LineKind::classify(b"OX   NCBI_TaxID=9606;"), LineKind::OrganismTaxonomy);
        assert_eq!(LineKind::classify(b"SQ   SEQUENCE"), LineKind::SequenceHeader);
        assert_eq!(LineKind::classify(b"//"), LineKind::EndOfRecord);
        assert_eq!(LineKind::classify(b"     MKWVTFISLL"), LineKind::Ignored);
    }

    #[test]
    fn test_short_lines_match_nothing() {
        assert_eq!(LineKind::classify(b""), LineKind::Ignored);
        assert_eq!(LineKind::classify(b"I"), LineKind::Ignored);
        assert_eq!(LineKind::classify(b"/"), LineKind::Ignored);
        assert_eq!(LineKind::classify(b"DE   Flags"), LineKind::Ignored);
        assert_eq!(LineKind::classify(b"FT   NON_TE"), LineKind::Ignored);
    }

    #[test]
    fn test_id_line() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"ID   TEST_HUMAN              Reviewed;         256 AA.\n");

        let entry = assembler.current();
        assert_eq!(entry.identifier, "TEST_HUMAN");
        assert!(entry.is_reviewed);
        assert_eq!(entry.length, 256);
    }

    #[test]
    fn test_id_line_unreviewed() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"ID   FRAG_MOUSE              Unreviewed;        50 AA.");

        assert!(!assembler.current().is_reviewed);
        assert_eq!(assembler.current().length, 50);
    }

    #[test]
    fn test_id_line_truncates_identifier() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"ID   ABCDEFGHIJKLMNOPQRSTUVWXYZ   Reviewed;   10 AA.");

        assert_eq!(assembler.current().identifier, "ABCDEFGHIJKLMNOP");
    }

    #[test]
    fn test_id_line_bad_length() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"ID   ODD_HUMAN   Reviewed;   many AA.");

        assert_eq!(assembler.current().length, 0);
    }

    #[test]
    fn test_repeated_id_overwrites() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"ID   FIRST_HUMAN   Unreviewed;   10 AA.");
        assembler.feed(b"ID   SECOND_HUMAN   Reviewed;   20 AA.");

        let entry = assembler.current();
        assert_eq!(entry.identifier, "SECOND_HUMAN");
        assert!(entry.is_reviewed);
        assert_eq!(entry.length, 20);
    }

    #[test]
    fn test_ac_line_keeps_first_accession() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"AC   P00002; P00003; P00004;");
        assembler.feed(b"AC   P00005;");

        assert_eq!(assembler.current().accession, "P00002");
    }

    #[test]
    fn test_ac_line_without_token_is_ignored() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"AC");
        assembler.feed(b"AC   ");
        assert_eq!(assembler.current().accession, "");

        assembler.feed(b"AC   Q11111;");
        assert_eq!(assembler.current().accession, "Q11111");
    }

    #[test]
    fn test_ac_line_strips_exactly_one_byte() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"AC   P12345");

        assert_eq!(assembler.current().accession, "P1234");
    }

    #[test]
    fn test_ac_line_truncates_accession() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"AC   A0A000000000000000000;");

        assert_eq!(assembler.current().accession, "A0A000000000000");
    }

    #[test]
    fn test_de_flags_fragment() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"DE   Flags: Precursor;");
        assert!(!assembler.current().is_fragment);

        assembler.feed(b"DE   Flags: Fragment;");
        assert!(assembler.current().is_fragment);
    }

    #[test]
    fn test_fragment_is_sticky() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"DE   Flags: Fragment;");
        assembler.feed(b"FT   NON_TER         1");
        assembler.feed(b"DE   Flags: Precursor;");

        assert!(assembler.current().is_fragment);
    }

    #[test]
    fn test_ox_line() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"OX   NCBI_TaxID=9606;");
        assert_eq!(assembler.current().taxon_id, 9606);

        assembler.feed(b"OX   NCBI_TaxID=10090 {ECO:0000313|EMBL:BAE27849.1};");
        assert_eq!(assembler.current().taxon_id, 10090);
    }

    #[test]
    fn test_ox_line_without_value() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"OX   NCBI_TaxID");
        assert_eq!(assembler.current().taxon_id, 0);

        assembler.feed(b"OX   NCBI_TaxID=unknown;");
        assert_eq!(assembler.current().taxon_id, 0);
    }

    #[test]
    fn test_ox_line_repeated_separator() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"OX   NCBI_TaxID==9606;");
        assert_eq!(assembler.current().taxon_id, 9606);

        assembler.feed(b"OX   NCBI_TaxID=");
        assert_eq!(assembler.current().taxon_id, 9606);
    }

    #[test]
    fn test_sq_line() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"SQ   SEQUENCE   256 AA;  28000 MW;  ABCDEF0123456789 CRC64;");

        assert_eq!(assembler.current().crc64, "ABCDEF0123456789");
    }

    #[test]
    fn test_sq_line_short() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"SQ   SEQUENCE   256 AA;");

        assert_eq!(assembler.current().crc64, "");
    }

    #[test]
    fn test_trailing_whitespace_is_stripped() {
        let mut assembler = EntryAssembler::new();
        assembler.feed(b"AC   P12345;  \t\r\n");

        assert_eq!(assembler.current().accession, "P12345");
    }

    #[test]
    fn test_overlong_line_is_truncated() {
        let mut line = b"SQ   SEQUENCE   1 AA;  1 MW;  ".to_vec();
        line.extend(std::iter::repeat(b' ').take(MAX_LINE_BYTES));
        line.extend_from_slice(b"ABCDEF0123456789 CRC64;");

        let mut assembler = EntryAssembler::new();
        assembler.feed(&line);

        assert_eq!(assembler.current().crc64, "");
    }

    #[test]
    fn test_reader_bounds_line_buffer() {
        let mut input = b"AC   P11111; ".to_vec();
        input.extend(std::iter::repeat(b'A').take(4 * 1024 * 1024));
        input.extend_from_slice(b"//\nID   X_HUMAN   Reviewed;   5 AA.\n//\n");

        let mut reader = FlatFileReader::new(&input[..]);
        let entry = reader.next().unwrap().unwrap();

        // The "//" at the end of the long line is not a record boundary
        assert_eq!(entry.identifier, "X_HUMAN");
        assert_eq!(entry.accession, "P11111");
        assert!(reader.next().is_none());
        assert_eq!(reader.line_number(), 3);
        assert!(reader.buffer.capacity() <= MAX_LINE_BYTES);
    }

    #[test]
    fn test_reader_keeps_line_prefix_across_chunks() {
        let mut input = b"SQ   SEQUENCE   5 AA;  500 MW;  ABCDEF0123456789 CRC64;".to_vec();
        input.extend(std::iter::repeat(b' ').take(3000));
        input.extend_from_slice(b"\n//\n");

        // Small buffer so the first line spans many fill_buf calls
        let reader = std::io::BufReader::with_capacity(7, &input[..]);
        let entries = FlatFileReader::new(reader)
            .collect::<io::Result<Vec<_>>>()
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].crc64, "ABCDEF0123456789");
    }

    #[test]
    fn test_end_of_record_emits_and_resets() {
        let mut assembler = EntryAssembler::new();
        assert!(assembler.feed(b"ID   A_HUMAN   Reviewed;   5 AA.").is_none());
        assert!(assembler.has_partial());

        let entry = assembler.feed(b"//").unwrap();
        assert_eq!(entry.identifier, "A_HUMAN");
        assert!(!assembler.has_partial());
        assert!(assembler.current().is_blank());
    }

    #[test]
    fn test_empty_record_yields_defaults() {
        let entries = assemble("//\n//\n//\n");

        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(ProteinEntry::is_blank));
    }

    #[test]
    fn test_unterminated_record_is_discarded() {
        let mut reader = FlatFileReader::new(
            &b"ID   A_HUMAN   Reviewed;   5 AA.\n//\nID   B_HUMAN   Reviewed;   7 AA.\n"[..],
        );

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.identifier, "A_HUMAN");
        assert!(reader.next().is_none());
        assert!(reader.discarded_partial());
        assert_eq!(reader.line_number(), 3);
    }

    #[test]
    fn test_no_leakage_between_records() {
        let entries = assemble(concat!(
            "ID   A_HUMAN   Reviewed;   5 AA.\n",
            "AC   P11111;\n",
            "DE   Flags: Fragment;\n",
            "OX   NCBI_TaxID=9606;\n",
            "SQ   SEQUENCE   5 AA;  500 MW;  AAAAAAAAAAAAAAAA CRC64;\n",
            "//\n",
            "AC   P22222;\n",
            "//\n",
        ));

        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1],
            ProteinEntry {
                accession: "P22222".to_string(),
                ..ProteinEntry::default()
            }
        );
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int(b"256"), 256);
        assert_eq!(parse_leading_int(b"9606;"), 9606);
        assert_eq!(parse_leading_int(b"  42 AA"), 42);
        assert_eq!(parse_leading_int(b"+7"), 7);
        assert_eq!(parse_leading_int(b"-12x"), -12);
        assert_eq!(parse_leading_int(b"AA"), 0);
        assert_eq!(parse_leading_int(b""), 0);
        assert_eq!(parse_leading_int(b"-"), 0);
        assert_eq!(parse_leading_int(b"99999999999999"), i32::MAX);
        assert_eq!(parse_leading_int(b"-99999999999999"), i32::MIN);
    }
}
