//! Exemption collection: which (file, line) pairs may keep a malformed or
//! unresolved marker.
//!
//! Storage format is picked by file extension. `.pb`/`.binpb` hold the binary
//! protobuf encoding. `.textproto`/`.pbtxt`/`.txtpb` (and anything
//! unrecognized) use the protobuf text format that regeneration prints;
//! `.json`, `.toml`, `.yaml`/`.yml` carry the same record shape via serde.
//! The collection is read-only here; regeneration only produces text.
//!
//! Text format subset: `#` comments, optional `:` before a message, `;`/`,`
//! separators, `[a, b]` lists, and single- or double-quoted strings with the
//! C-style escapes including `\NNN` octal, `\xHH` hex and `\uXXXX`/`\UXXXXXXXX`.
//! Adjacent string concatenation, extensions and `Any` expansion are not read.

use crate::error::{CheckError, Result};
use crate::models::exemption::{ExemptionFile, ExemptionRecord, PbExemptionFile};
use crate::models::Location;
use prost::Message;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

const MESSAGE_FIELD: &str = "todo_open_exemption";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExemptionFormat {
    Binary,
    TextProto,
    Json,
    Toml,
    Yaml,
}

impl ExemptionFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pb") | Some("binpb") => Self::Binary,
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::TextProto,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExemptionStore {
    entries: BTreeMap<String, BTreeSet<u32>>,
}

impl ExemptionStore {
    /// Load from disk. An absent file means no exemptions.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "exemption file not found; assuming no exemptions");
            return Ok(Self::default());
        }
        let data = fs::read(path).map_err(|source| CheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::parse_bytes(&data, ExemptionFormat::from_path(path)).map_err(|message| {
            CheckError::InvalidExemptions {
                path: path.to_path_buf(),
                message,
            }
        })?;
        debug!(path = %path.display(), files = store.entries.len(), lines = store.len(), "loaded exemptions");
        Ok(store)
    }

    /// Parse raw file contents. Text formats must be valid UTF-8.
    pub fn parse_bytes(data: &[u8], format: ExemptionFormat) -> std::result::Result<Self, String> {
        match format {
            ExemptionFormat::Binary => {
                let pb = PbExemptionFile::decode(data).map_err(|e| e.to_string())?;
                Self::from_records(pb.into())
            }
            _ => {
                let text = std::str::from_utf8(data).map_err(|e| e.to_string())?;
                Self::parse(text, format)
            }
        }
    }

    pub fn parse(data: &str, format: ExemptionFormat) -> std::result::Result<Self, String> {
        let file: ExemptionFile = match format {
            ExemptionFormat::Binary => return Self::parse_bytes(data.as_bytes(), format),
            ExemptionFormat::TextProto => parse_textproto(data)?,
            ExemptionFormat::Json => serde_json::from_str(data).map_err(|e| e.to_string())?,
            ExemptionFormat::Toml => toml::from_str(data).map_err(|e| e.to_string())?,
            ExemptionFormat::Yaml => serde_yaml::from_str(data).map_err(|e| e.to_string())?,
        };
        Self::from_records(file)
    }

    /// Merge records into a collection. Repeated paths and lines collapse;
    /// line 0 is rejected.
    pub fn from_records(file: ExemptionFile) -> std::result::Result<Self, String> {
        let mut entries: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        for rec in file.todo_open_exemption {
            if rec.line_number.contains(&0) {
                return Err(format!(
                    "line numbers are 1-based; got 0 for '{}'",
                    rec.exempted_file_path
                ));
            }
            entries
                .entry(rec.exempted_file_path)
                .or_default()
                .extend(rec.line_number);
        }
        entries.retain(|_, lines| !lines.is_empty());
        Ok(Self { entries })
    }

    /// Build a fresh collection mirroring exactly the given violations.
    /// Nothing from any previous collection is carried over.
    pub fn derive_from(violations: &BTreeMap<String, BTreeSet<u32>>) -> Self {
        let entries = violations
            .iter()
            .filter(|(_, lines)| !lines.is_empty())
            .map(|(file, lines)| (file.clone(), lines.clone()))
            .collect();
        Self { entries }
    }

    pub fn is_exempt(&self, file: &str, line: u32) -> bool {
        self.entries
            .get(file)
            .map(|lines| lines.contains(&line))
            .unwrap_or(false)
    }

    /// Every exempted pair, sorted.
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.entries
            .iter()
            .flat_map(|(file, lines)| lines.iter().map(move |l| Location::new(file.as_str(), *l)))
    }

    /// Number of exempted (file, line) pairs.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_records(&self) -> ExemptionFile {
        ExemptionFile {
            todo_open_exemption: self
                .entries
                .iter()
                .map(|(file, lines)| ExemptionRecord {
                    exempted_file_path: file.clone(),
                    line_number: lines.iter().copied().collect(),
                })
                .collect(),
        }
    }

    /// Binary protobuf encoding of [`Self::to_records`].
    pub fn to_binary(&self) -> Vec<u8> {
        PbExemptionFile::from(&self.to_records()).encode_to_vec()
    }

    /// Protobuf text format, files and lines ascending, no trailing newline.
    pub fn to_textproto(&self) -> String {
        let mut blocks: Vec<String> = Vec::with_capacity(self.entries.len());
        for (file, lines) in &self.entries {
            let mut b = format!(
                "{} {{\n  exempted_file_path: \"{}\"\n",
                MESSAGE_FIELD,
                escape(file)
            );
            for l in lines {
                b.push_str(&format!("  line_number: {}\n", l));
            }
            b.push('}');
            blocks.push(b);
        }
        blocks.join("\n")
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let Some(&e) = bytes.get(i) else {
            out.push(b'\\');
            break;
        };
        i += 1;
        match e {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'0'..=b'7' => {
                let mut v = u32::from(e - b'0');
                for _ in 0..2 {
                    match bytes.get(i) {
                        Some(&d) if (b'0'..=b'7').contains(&d) => {
                            v = v * 8 + u32::from(d - b'0');
                            i += 1;
                        }
                        _ => break,
                    }
                }
                out.push((v & 0xff) as u8);
            }
            b'x' | b'X' => match take_hex(bytes, &mut i, 2) {
                Some(v) => out.push(v as u8),
                None => out.push(e),
            },
            b'u' | b'U' => {
                let width = if e == b'u' { 4 } else { 8 };
                match take_hex(bytes, &mut i, width).and_then(char::from_u32) {
                    Some(c) => {
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    }
                    None => out.push(e),
                }
            }
            other => out.push(other),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Up to `max` hex digits starting at `*i`; `None` when there are none.
fn take_hex(bytes: &[u8], i: &mut usize, max: usize) -> Option<u32> {
    let mut v = 0u32;
    let mut n = 0;
    while n < max {
        match bytes.get(*i).and_then(|b| (*b as char).to_digit(16)) {
            Some(d) => {
                v = v * 16 + d;
                *i += 1;
                n += 1;
            }
            None => break,
        }
    }
    (n > 0).then_some(v)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Num(String),
    Punct(char),
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:(?P<ws>\s+)|(?P<comment>#[^\n]*)|(?P<ident>[A-Za-z_][A-Za-z0-9_]*)|"(?P<str>(?:[^"\\\n]|\\.)*)"|'(?P<sstr>(?:[^'\\\n]|\\.)*)'|(?P<num>\d+)|(?P<punct>[{}:\[\],;]))"#,
        )
        .expect("token regex is valid")
    })
}

/// Tokens paired with their 1-based source line.
fn tokenize(data: &str) -> std::result::Result<Vec<(Token, usize)>, String> {
    let re = token_regex();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    while pos < data.len() {
        let rest = &data[pos..];
        let caps = re
            .captures(rest)
            .ok_or_else(|| format!("line {}: unexpected input near '{}'", line, snippet(rest)))?;
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        if let Some(m) = caps.name("ident") {
            tokens.push((Token::Ident(m.as_str().to_string()), line));
        } else if let Some(m) = caps.name("str").or_else(|| caps.name("sstr")) {
            tokens.push((Token::Str(unescape(m.as_str())), line));
        } else if let Some(m) = caps.name("num") {
            tokens.push((Token::Num(m.as_str().to_string()), line));
        } else if let Some(m) = caps.name("punct") {
            if let Some(c) = m.as_str().chars().next() {
                tokens.push((Token::Punct(c), line));
            }
        }
        line += whole.matches('\n').count();
        pos += whole.len();
    }
    Ok(tokens)
}

fn snippet(s: &str) -> String {
    s.chars().take(20).collect()
}

struct TextProtoParser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl TextProtoParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, l)| *l)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        t
    }

    fn err<T>(&self, what: &str) -> std::result::Result<T, String> {
        Err(format!("line {}: {}", self.line(), what))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> std::result::Result<(), String> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            self.err(&format!("expected '{}'", c))
        }
    }

    fn number(&mut self) -> std::result::Result<u32, String> {
        match self.next() {
            Some(Token::Num(n)) => n
                .parse::<u32>()
                .or_else(|_| self.err(&format!("line number out of range: {}", n))),
            _ => self.err("expected a line number"),
        }
    }

    fn file(&mut self) -> std::result::Result<ExemptionFile, String> {
        let mut out = ExemptionFile::default();
        while self.peek().is_some() {
            match self.next() {
                Some(Token::Ident(name)) if name == MESSAGE_FIELD => {
                    self.eat_punct(':');
                    self.expect_punct('{')?;
                    out.todo_open_exemption.push(self.record()?);
                    self.eat_punct(';');
                    self.eat_punct(',');
                }
                _ => return self.err(&format!("expected '{}'", MESSAGE_FIELD)),
            }
        }
        Ok(out)
    }

    fn record(&mut self) -> std::result::Result<ExemptionRecord, String> {
        let mut rec = ExemptionRecord::default();
        let mut path: Option<String> = None;
        loop {
            match self.next() {
                Some(Token::Punct('}')) => break,
                Some(Token::Ident(field)) if field == "exempted_file_path" => {
                    self.expect_punct(':')?;
                    match self.next() {
                        Some(Token::Str(s)) => path = Some(s),
                        _ => return self.err("expected a quoted file path"),
                    }
                }
                Some(Token::Ident(field)) if field == "line_number" => {
                    self.expect_punct(':')?;
                    if self.eat_punct('[') {
                        if !self.eat_punct(']') {
                            loop {
                                rec.line_number.push(self.number()?);
                                if self.eat_punct(']') {
                                    break;
                                }
                                self.expect_punct(',')?;
                            }
                        }
                    } else {
                        rec.line_number.push(self.number()?);
                    }
                }
                Some(Token::Ident(field)) => {
                    return self.err(&format!("unknown field '{}'", field));
                }
                None => return self.err("unterminated exemption block"),
                _ => return self.err("expected a field name or '}'"),
            }
            self.eat_punct(';');
            self.eat_punct(',');
        }
        match path {
            Some(p) => {
                rec.exempted_file_path = p;
                Ok(rec)
            }
            None => self.err("exemption block without exempted_file_path"),
        }
    }
}

fn parse_textproto(data: &str) -> std::result::Result<ExemptionFile, String> {
    let tokens = tokenize(data)?;
    TextProtoParser { tokens, pos: 0 }.file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn violations(pairs: &[(&str, &[u32])]) -> BTreeMap<String, BTreeSet<u32>> {
        pairs
            .iter()
            .map(|(f, ls)| (f.to_string(), ls.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_textproto_rendering_is_sorted() {
        let store = ExemptionStore::derive_from(&violations(&[
            ("extra_dir/TempFile1.kt", &[3, 1]),
            ("TempFile2.kt", &[1]),
        ]));
        let expected = "todo_open_exemption {\n  exempted_file_path: \"TempFile2.kt\"\n  line_number: 1\n}\ntodo_open_exemption {\n  exempted_file_path: \"extra_dir/TempFile1.kt\"\n  line_number: 1\n  line_number: 3\n}";
        assert_eq!(store.to_textproto(), expected);
    }

    #[test]
    fn test_textproto_parses_what_it_prints() {
        let store = ExemptionStore::derive_from(&violations(&[
            ("a \"quoted\" dir\\f.kt", &[2, 9]),
            ("b.kt", &[4]),
        ]));
        let parsed =
            ExemptionStore::parse(&store.to_textproto(), ExemptionFormat::TextProto).unwrap();
        assert_eq!(parsed, store);
    }

    #[test]
    fn test_textproto_accepts_comments_inline_blocks_and_lists() {
        let src = r#"
# exemptions kept until the refactor lands
todo_open_exemption { exempted_file_path: "x.kt" line_number: 5 line_number: 2 }
todo_open_exemption: {
  exempted_file_path: "y.kt";
  line_number: [3, 1, 3]
}
todo_open_exemption { exempted_file_path: "x.kt" line_number: 5 }
"#;
        let store = ExemptionStore::parse(src, ExemptionFormat::TextProto).unwrap();
        let locs: Vec<String> = store.locations().map(|l| l.to_string()).collect();
        assert_eq!(locs, vec!["x.kt:2", "x.kt:5", "y.kt:1", "y.kt:3"]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_textproto_errors_name_the_line() {
        let err = ExemptionStore::parse(
            "todo_open_exemption {\n  exempted_file_path: \"a\"\n  colour: 3\n}",
            ExemptionFormat::TextProto,
        )
        .unwrap_err();
        assert!(err.contains("line 3"), "{err}");
        assert!(err.contains("colour"));

        assert!(ExemptionStore::parse(
            "todo_open_exemption { line_number: 1 }",
            ExemptionFormat::TextProto
        )
        .is_err());
        assert!(ExemptionStore::parse(
            "todo_open_exemption { exempted_file_path: \"a\"",
            ExemptionFormat::TextProto
        )
        .is_err());
    }

    #[test]
    fn test_zero_line_number_is_rejected() {
        let err = ExemptionStore::parse(
            "todo_open_exemption { exempted_file_path: \"a\" line_number: 0 }",
            ExemptionFormat::TextProto,
        )
        .unwrap_err();
        assert!(err.contains("1-based"));
    }

    #[test]
    fn test_serde_formats_share_the_record_shape() {
        let json = r#"{"todo_open_exemption":[{"exempted_file_path":"a.kt","line_number":[2,1]}]}"#;
        let toml_src = "[[todo_open_exemption]]\nexempted_file_path = \"a.kt\"\nline_number = [1, 2]\n";
        let yaml = "todo_open_exemption:\n  - exempted_file_path: a.kt\n    line_number: [1, 2]\n";
        let from_json = ExemptionStore::parse(json, ExemptionFormat::Json).unwrap();
        let from_toml = ExemptionStore::parse(toml_src, ExemptionFormat::Toml).unwrap();
        let from_yaml = ExemptionStore::parse(yaml, ExemptionFormat::Yaml).unwrap();
        assert_eq!(from_json, from_toml);
        assert_eq!(from_json, from_yaml);
        assert!(from_json.is_exempt("a.kt", 1));
        assert!(from_json.is_exempt("a.kt", 2));
        assert!(!from_json.is_exempt("a.kt", 3));
        assert!(!from_json.is_exempt("b.kt", 1));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ExemptionFormat::from_path(Path::new("x/todo_open_exemptions.textproto")),
            ExemptionFormat::TextProto
        );
        assert_eq!(ExemptionFormat::from_path(Path::new("e.JSON")), ExemptionFormat::Json);
        assert_eq!(ExemptionFormat::from_path(Path::new("e.yml")), ExemptionFormat::Yaml);
        assert_eq!(ExemptionFormat::from_path(Path::new("e.toml")), ExemptionFormat::Toml);
        assert_eq!(ExemptionFormat::from_path(Path::new("e")), ExemptionFormat::TextProto);
        assert_eq!(
            ExemptionFormat::from_path(Path::new("scripts/assets/todo_open_exemptions.pb")),
            ExemptionFormat::Binary
        );
        assert_eq!(ExemptionFormat::from_path(Path::new("e.binpb")), ExemptionFormat::Binary);
    }

    #[test]
    fn test_textproto_reads_octal_hex_and_single_quoted_strings() {
        let src = r#"todo_open_exemption { exempted_file_path: '\101\x42\'cé' line_number: 1 }
todo_open_exemption { exempted_file_path: "d\057e\x2e\x6B\164" line_number: 2 }"#;
        let store = ExemptionStore::parse(src, ExemptionFormat::TextProto).unwrap();
        assert!(store.is_exempt("AB'cé", 1));
        assert!(store.is_exempt("d/e.kt", 2));
    }

    #[test]
    fn test_binary_decodes_unpacked_and_packed_lines() {
        // { todo_open_exemption { exempted_file_path: "a.kt" line_number: 1 } }
        let unpacked = [0x0a, 0x08, 0x0a, 0x04, b'a', b'.', b'k', b't', 0x10, 0x01];
        let store = ExemptionStore::parse_bytes(&unpacked, ExemptionFormat::Binary).unwrap();
        let locs: Vec<String> = store.locations().map(|l| l.to_string()).collect();
        assert_eq!(locs, vec!["a.kt:1"]);

        // Same record with line_number [3, 1] packed.
        let packed = [
            0x0a, 0x0a, 0x0a, 0x04, b'a', b'.', b'k', b't', 0x12, 0x02, 0x03, 0x01,
        ];
        let store = ExemptionStore::parse_bytes(&packed, ExemptionFormat::Binary).unwrap();
        let locs: Vec<String> = store.locations().map(|l| l.to_string()).collect();
        assert_eq!(locs, vec!["a.kt:1", "a.kt:3"]);
    }

    #[test]
    fn test_binary_encoding_reloads_from_disk() {
        let dir = tempdir().unwrap();
        let store = ExemptionStore::derive_from(&violations(&[("x/y.kt", &[4, 2]), ("z.kt", &[9])]));
        let p = dir.path().join("todo_open_exemptions.pb");
        fs::write(&p, store.to_binary()).unwrap();
        assert_eq!(ExemptionStore::load(&p).unwrap(), store);
    }

    #[test]
    fn test_truncated_binary_is_invalid() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("todo_open_exemptions.pb");
        fs::write(&p, [0x0a, 0x08, 0x0a, 0x04, b'a']).unwrap();
        let err = ExemptionStore::load(&p).unwrap_err();
        assert!(matches!(err, CheckError::InvalidExemptions { .. }));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = ExemptionStore::load(&dir.path().join("none.textproto")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_invalid_file_reports_path() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("bad.json");
        fs::write(&p, "[").unwrap();
        let err = ExemptionStore::load(&p).unwrap_err();
        assert!(matches!(err, CheckError::InvalidExemptions { .. }));
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_derive_drops_empty_entries_and_old_state() {
        let store = ExemptionStore::derive_from(&violations(&[("a.kt", &[]), ("b.kt", &[7])]));
        assert_eq!(store.to_records().todo_open_exemption.len(), 1);
        assert!(store.is_exempt("b.kt", 7));
    }
}
