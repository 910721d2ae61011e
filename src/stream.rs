//! Streaming extraction of dictionary-page records from a dump.
//!
//! The dump is scanned in fixed-size chunks with a carry buffer; complete
//! `<page>...</page>` records are handed to a callback one at a time, so a
//! multi-gigabyte dump never has to fit in memory.

use bzip2::read::BzDecoder;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

const PAGE_OPEN: &str = "<page>";
const PAGE_CLOSE: &str = "</page>";
const CHUNK_SIZE: usize = 1024 * 1024;

lazy_static! {
    static ref ID_PATTERN: Regex = Regex::new(r"<id>(\d+)</id>").unwrap();
    static ref TITLE_PATTERN: Regex = Regex::new(r"<title>([^<]+)</title>").unwrap();
    static ref NS_PATTERN: Regex = Regex::new(r"<ns>(\d+)</ns>").unwrap();
    static ref TEXT_PATTERN: Regex = Regex::new(r"(?s)<text[^>]*>(.+?)</text>").unwrap();
    static ref REDIRECT_PATTERN: Regex = Regex::new(r#"<redirect\s+title="[^"]+""#).unwrap();
}

/// One dictionary-page record pulled out of the dump.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: Option<u64>,
    pub title: String,
    pub text: String,
}

/// Classification of one raw page record.
#[derive(Debug)]
pub enum Record {
    Entry(Entry),
    /// Title or text field absent
    MissingFields,
    /// Page lives outside the main namespace
    SpecialNamespace,
    Redirect,
}

pub fn parse_record(page_xml: &str) -> Record {
    let title = match TITLE_PATTERN.captures(page_xml) {
        Some(cap) => cap[1].to_string(),
        None => return Record::MissingFields,
    };

    if let Some(cap) = NS_PATTERN.captures(page_xml) {
        if &cap[1] != "0" {
            return Record::SpecialNamespace;
        }
    }

    if REDIRECT_PATTERN.is_match(page_xml) {
        return Record::Redirect;
    }

    let text = match TEXT_PATTERN.captures(page_xml) {
        Some(cap) => cap[1].to_string(),
        None => return Record::MissingFields,
    };

    let id = ID_PATTERN
        .captures(page_xml)
        .and_then(|cap| cap[1].parse().ok());

    Record::Entry(Entry { id, title, text })
}

/// Open the dump for reading, transparently decompressing `.bz2` inputs.
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead + Send> = if path.to_string_lossy().ends_with(".bz2") {
        Box::new(BufReader::with_capacity(256 * 1024, BzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    };
    Ok(reader)
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Stream `<page>` records to the callback; returning `false` stops the scan.
///
/// The carry buffer stays raw bytes until a complete record is cut out, so
/// chunk and trim offsets never have to land on a character boundary and a
/// multibyte character split across a chunk read survives intact.
pub fn scan_pages(
    mut reader: impl BufRead,
    mut callback: impl FnMut(String) -> bool,
) -> io::Result<()> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader.read(&mut chunk)?;
        if bytes_read == 0 {
            break;
        }

        buffer.extend_from_slice(&chunk[..bytes_read]);

        // Hand off every complete record in the buffer
        while let Some(start) = find_bytes(&buffer, PAGE_OPEN.as_bytes()) {
            match find_bytes(&buffer[start..], PAGE_CLOSE.as_bytes()) {
                Some(close) => {
                    let end = start + close + PAGE_CLOSE.len();
                    let page_xml = String::from_utf8_lossy(&buffer[start..end]).into_owned();
                    buffer.drain(..end);
                    if !callback(page_xml) {
                        return Ok(());
                    }
                }
                None => {
                    // Record still incomplete; drop everything before it
                    buffer.drain(..start);
                    break;
                }
            }
        }

        // No open tag in the buffer at all: keep only a tail long enough to
        // hold a tag split across the chunk boundary
        if find_bytes(&buffer, PAGE_OPEN.as_bytes()).is_none() && buffer.len() > PAGE_OPEN.len() {
            buffer.drain(..buffer.len() - PAGE_OPEN.len());
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for the Page Scanner
// ─────────────────────────────────────────────────────────────────────────────
