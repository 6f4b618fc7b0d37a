//! Reading fact records from the CSV knowledge source.
//!
//! The source has a header row naming its columns; only `name` is required:
//!
//! ```text
//! name,type,causal_agent,symptoms,treatments
//! Husk spot,Fungal,Pseudocercospora macadamiae,"['Spots on husk', 'Premature nut drop']","['Copper spray']"
//! ```
//!
//! The list columns hold list literals with single- or double-quoted items.

use crate::error::{Error, MalformedField, Result};
use bstr::ByteSlice;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{anychar, char, line_ending, multispace0, none_of},
    combinator::{all_consuming, cut, map, opt, value},
    multi::{fold_many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use log::warn;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One row of the source.
///
/// Optional columns that are absent or empty are `None`. List columns are
/// kept as raw text; [`parse_list`] turns them into items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Subject of every fact in the row
    pub name: String,
    /// Category, e.g. `Fungal`
    pub kind: Option<String>,
    /// Causal agent, e.g. a pathogen species
    pub causal_agent: Option<String>,
    /// Raw symptoms list literal
    pub symptoms: Option<String>,
    /// Raw treatments list literal
    pub treatments: Option<String>,
}

impl Record {
    /// A record with only a subject name
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }
}

/// Records parsed from a source, plus the rows that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    /// Rows that parsed, in source order
    pub records: Vec<Record>,
    /// Rows dropped because they were not valid CSV
    pub skipped_rows: usize,
}

/// Reads and parses the source file at `path`.
///
/// The file is decoded as UTF-8 after dropping a leading byte-order mark;
/// invalid sequences are replaced rather than rejected.
///
/// # Errors
///
/// [`Error::SourceUnavailable`] if the file cannot be read, otherwise any
/// error from [`parse_records`].
pub fn read_records(path: &Path) -> Result<RecordSet> {
    let bytes = std::fs::read(path).map_err(|source| Error::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    parse_records(&bytes.to_str_lossy())
}

/// Parses CSV text with a header row into records.
///
/// A data row that is not valid CSV is logged and counted in
/// [`RecordSet::skipped_rows`]; the rows after it still load.
///
/// # Errors
///
/// [`Error::MissingColumn`] if there is no `name` column (including an empty
/// input), [`Error::Csv`] if the header row itself cannot be read.
pub fn parse_records(text: &str) -> Result<RecordSet> {
    let mut rows = parse_csv(text).into_iter();
    let header = rows.next().ok_or(Error::MissingColumn("name"))??;
    let column = |name: &str| header.iter().position(|h| h.trim() == name);

    let name = column("name").ok_or(Error::MissingColumn("name"))?;
    let kind = column("type");
    let causal_agent = column("causal_agent");
    let symptoms = column("symptoms");
    let treatments = column("treatments");

    let mut set = RecordSet::default();
    for row in rows {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!("skipping row: {err}");
                set.skipped_rows += 1;
                continue;
            }
        };
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| row.get(i))
                .filter(|value| !value.is_empty())
                .cloned()
        };
        set.records.push(Record {
            name: row.get(name).cloned().unwrap_or_default(),
            kind: cell(kind),
            causal_agent: cell(causal_agent),
            symptoms: cell(symptoms),
            treatments: cell(treatments),
        });
    }
    Ok(set)
}

/// Splits CSV text into rows of fields. Blank lines are skipped.
///
/// Text after a closing quote is kept as part of the field, so `"x"y` reads
/// as `xy`. A row with an unterminated quoted field comes back as
/// [`Error::Csv`] and reading resumes on the following line.
#[must_use]
pub fn parse_csv(text: &str) -> Vec<Result<Vec<String>>> {
    let line_of = |rest: &str| text[..text.len() - rest.len()].matches('\n').count() + 1;

    let mut rows = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match csv_row(rest) {
            Ok((after, row)) => {
                rest = row_end(after).map_or(after, |(after, _)| after);
                if !matches!(row.as_slice(), [only] if only.is_empty()) {
                    rows.push(Ok(row));
                }
            }
            Err(_) => {
                rows.push(Err(Error::Csv {
                    line: line_of(rest),
                    message: "unterminated quoted field".to_owned(),
                }));
                rest = rest.find('\n').map_or("", |i| &rest[i + 1..]);
            }
        }
    }
    rows
}

fn csv_row(input: &str) -> IResult<&str, Vec<String>> {
    separated_list1(char(','), alt((quoted_field, unquoted_field)))(input)
}

fn row_end(input: &str) -> IResult<&str, &str> {
    alt((line_ending, tag("\r")))(input)
}

fn quoted_field(input: &str) -> IResult<&str, String> {
    map(
        pair(
            preceded(
                char('"'),
                cut(terminated(
                    fold_many0(
                        alt((is_not("\""), value("\"", tag("\"\"")))),
                        String::new,
                        |mut acc: String, piece: &str| {
                            acc.push_str(piece);
                            acc
                        },
                    ),
                    char('"'),
                )),
            ),
            field_text,
        ),
        |(mut quoted, trailing): (String, &str)| {
            quoted.push_str(trailing);
            quoted
        },
    )(input)
}

fn unquoted_field(input: &str) -> IResult<&str, String> {
    map(field_text, String::from)(input)
}

fn field_text(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| !matches!(c, ',' | '\n' | '\r'))(input)
}

/// Parses a list literal such as `['Leaf spots', "Wilting"]`.
///
/// Items are single- or double-quoted strings with backslash escapes; a
/// trailing comma is allowed. `field` only labels the error.
///
/// # Errors
///
/// [`MalformedField`] if `text` is anything other than such a list.
pub fn parse_list(field: &'static str, text: &str) -> std::result::Result<Vec<String>, MalformedField> {
    all_consuming(delimited(multispace0, list_literal, multispace0))(text)
        .map(|(_, items)| items)
        .map_err(|_| MalformedField {
            field,
            text: text.to_owned(),
        })
}

fn list_literal(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        char('['),
        ws(terminated(
            separated_list0(ws(char(',')), ws(list_item)),
            opt(ws(char(','))),
        )),
        char(']'),
    )(input)
}

fn list_item(input: &str) -> IResult<&str, String> {
    alt((quoted_with('\''), quoted_with('"')))(input)
}

fn quoted_with<'a>(quote: char) -> impl FnMut(&'a str) -> IResult<&'a str, String> {
    let plain = if quote == '\'' { "\\'" } else { "\\\"" };
    delimited(
        char(quote),
        fold_many0(
            alt((
                map(none_of(plain), |c| (c, None)),
                preceded(char('\\'), map(anychar, unescape)),
            )),
            String::new,
            |mut acc: String, (c, kept): (char, Option<char>)| {
                acc.push(c);
                acc.extend(kept);
                acc
            },
        ),
        char(quote),
    )
}

/// An unrecognised escape keeps its backslash: `\d` stays `\d`.
fn unescape(c: char) -> (char, Option<char>) {
    match c {
        'n' => ('\n', None),
        't' => ('\t', None),
        'r' => ('\r', None),
        '\\' | '\'' | '"' => (c, None),
        other => ('\\', Some(other)),
    }
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}
