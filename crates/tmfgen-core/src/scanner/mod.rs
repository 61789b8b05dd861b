//! Sequential scanner over TMF text.
//!
//! A TMF file looks like this:
//!
//! ```text
//! // PDB:  e:\obj\microsoft.rtc.rgs.clients.pdb
//! // PDB:  Last Updated :2012-5-4:12:51:1:778 (UTC) [ManagedWPP]
//! f73bbb29-e2f0-93e7-ee22-e396f8fe1570 RgsClientsLib // SRC=matchmakinglocator.cs MJ= MN=
//! #typev matchmakinglocator_cs120 11 "%0Locating %10!s!" // LEVEL=Info FUNC=Locate
//! {
//! uri, ItemWString -- 10
//! }
//! ```
//!
//! ## Algorithm Overview
//!
//! 1. Skip two lines, match the third against the preamble grammar
//! 2. Skip `#enumv` blocks up to their closing `}`
//! 3. Stop at a `// PDB` line; what follows repeats earlier content
//! 4. Join header lines with spaces until a `{` line, then match the header
//! 5. Read `<name>, <type>` field lines until a `}` line

mod grammar;

use crate::error::{Error, Result};
use crate::naming::NameAllocator;
use crate::schema::{EventRecord, FieldRecord, ProviderHeader, TypeMapper};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

pub use grammar::{
    match_event_header, match_field, match_preamble, EventHeaderMatch, FieldMatch, HeaderVariant,
    PreambleMatch,
};

/// Lines preceding the preamble, ignored
const SKIPPED_PREAMBLE_LINES: usize = 2;

/// Starts an auxiliary enumeration block
const ENUM_MARKER: &str = "#enumv";

/// Starts content duplicated from another PDB
const DUPLICATE_MARKER: &str = "// PDB";

const OPEN_BODY: &str = "{";
const CLOSE_BLOCK: &str = "}";

/// Scanner states between two lines
#[derive(Debug)]
enum ScanState {
    /// Between events
    ExpectHeader,
    /// Inside an `#enumv` block
    SkipEnum,
    /// Collecting header fragments until `{`
    AccumulateHeader {
        /// Line of the first fragment
        start_line: usize,
        /// Fragments joined by single spaces
        text: String,
    },
    /// Reading fields until `}`
    InFieldBody(EventRecord),
    /// No more events in this input
    Done,
}

/// Reads events one at a time from TMF text.
///
/// Lines are decoded lossily: bytes that are not UTF-8 (ANSI code page
/// text in descriptions, for instance) become U+FFFD instead of failing
/// the parse.
#[derive(Debug)]
pub struct EventScanner<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
    header: ProviderHeader,
    finished: bool,
}

impl<R: BufRead> EventScanner<R> {
    /// Creates a scanner, consuming and matching the preamble
    pub fn new(reader: R) -> Result<Self> {
        let mut scanner = Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
            header: ProviderHeader::default(),
            finished: false,
        };

        for _ in 0..SKIPPED_PREAMBLE_LINES {
            if scanner.next_line()?.is_none() {
                return Err(Error::preamble_format(""));
            }
        }

        let line = scanner
            .next_line()?
            .ok_or_else(|| Error::preamble_format(""))?;
        let preamble = match_preamble(&line).ok_or_else(|| Error::preamble_format(line.as_str()))?;
        scanner.header = ProviderHeader::new(
            preamble.provider_id,
            preamble.component_name,
            preamble.source_file,
        );

        debug!(
            "Provider {} component {} source {}",
            scanner.header.provider_id,
            scanner.header.component_name,
            scanner.header.source_file_token
        );
        Ok(scanner)
    }

    /// Returns the provider header parsed from the preamble
    pub fn header(&self) -> &ProviderHeader {
        &self.header
    }

    /// Returns the number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Reads the next event, or `None` once the input or a `// PDB` marker
    /// is reached.
    ///
    /// Field names are allocated from `names`, whose field scope is reset
    /// for every event. After an error the scanner yields no more events.
    pub fn next_event(&mut self, names: &mut NameAllocator) -> Result<Option<EventRecord>> {
        if self.finished {
            return Ok(None);
        }

        let result = self.scan_event(names);
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    fn scan_event(&mut self, names: &mut NameAllocator) -> Result<Option<EventRecord>> {
        let mut state = ScanState::ExpectHeader;

        loop {
            state = match state {
                ScanState::ExpectHeader => match self.next_line()? {
                    None => ScanState::Done,
                    Some(line) if line.starts_with(ENUM_MARKER) => {
                        trace!("Skipping enum block at line {}", self.line_number);
                        ScanState::SkipEnum
                    }
                    Some(line) if line.starts_with(DUPLICATE_MARKER) => {
                        trace!(
                            "Duplicate content marker at line {}, ignoring the rest",
                            self.line_number
                        );
                        ScanState::Done
                    }
                    Some(text) => ScanState::AccumulateHeader {
                        start_line: self.line_number,
                        text,
                    },
                },

                ScanState::SkipEnum => {
                    if self.expect_line("'}' closing an #enumv block")? == CLOSE_BLOCK {
                        ScanState::ExpectHeader
                    } else {
                        ScanState::SkipEnum
                    }
                }

                ScanState::AccumulateHeader {
                    start_line,
                    mut text,
                } => {
                    let line = self.expect_line("'{' opening an event body")?;
                    if line == OPEN_BODY {
                        names.begin_fields();
                        ScanState::InFieldBody(self.open_event(start_line, &text, names)?)
                    } else {
                        text.push(' ');
                        text.push_str(&line);
                        ScanState::AccumulateHeader { start_line, text }
                    }
                }

                ScanState::InFieldBody(mut event) => {
                    let line = self.expect_line("'}' closing an event body")?;
                    if line == CLOSE_BLOCK {
                        return Ok(Some(event));
                    }
                    let field = self.parse_field(&line, event.fields.len(), names)?;
                    event.fields.push(field);
                    ScanState::InFieldBody(event)
                }

                ScanState::Done => return Ok(None),
            };
        }
    }

    /// Builds an empty event from an assembled header
    fn open_event(
        &self,
        start_line: usize,
        text: &str,
        names: &NameAllocator,
    ) -> Result<EventRecord> {
        let m = match_event_header(text)
            .ok_or_else(|| Error::event_header_format(start_line, text))?;

        // The locator is the source token followed by the line number.
        let line_number = m
            .locator
            .get(self.header.source_file_token.len()..)
            .ok_or_else(|| Error::event_header_format(start_line, text))?;

        trace!(
            "Event at line {}: {:?} header, locator {}, opcode {}, function {}",
            start_line,
            m.variant,
            m.locator,
            m.opcode,
            m.function
        );

        Ok(EventRecord {
            locator: m.locator.to_string(),
            line_number: line_number.to_string(),
            opcode: m.opcode.to_string(),
            function_name: names.sanitize(m.function),
            fields: Vec::new(),
        })
    }

    fn parse_field(
        &self,
        line: &str,
        index: usize,
        names: &mut NameAllocator,
    ) -> Result<FieldRecord> {
        let m = match_field(line).ok_or_else(|| Error::field_format(self.line_number, line))?;
        Ok(FieldRecord {
            index,
            name: names.allocate_field(m.name, index),
            raw_name: m.name.to_string(),
            raw_type: m.type_token.to_string(),
            wire_type: TypeMapper::map(m.type_token),
        })
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        let line = self.line_number + 1;
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|source| Error::Read { line, source })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number = line;

        let mut bytes = self.buf.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest.strip_suffix(b"\r").unwrap_or(rest);
        }
        Ok(Some(String::from_utf8_lossy(bytes).into_owned()))
    }

    fn expect_line(&mut self, expected: &'static str) -> Result<String> {
        self.next_line()?
            .ok_or_else(|| Error::unexpected_eof(self.line_number, expected))
    }
}

/// Opens a TMF file for scanning
pub fn scan_file(path: impl AsRef<Path>) -> Result<EventScanner<BufReader<std::fs::File>>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| Error::file_read(path, e))?;
    EventScanner::new(BufReader::new(file))
}
