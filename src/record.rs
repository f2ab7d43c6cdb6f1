//! JSON instance and solution records.
//!
//! An instance record looks like
//!
//! ```text
//! {"nbit": 3, "base": 0, "offset": -1, "qubo": [[0,0,1],[0,1,-5],[1,1,4]], ...}
//! ```
//!
//! `nbit` and `qubo` are mandatory; `base` (0 or 1) defaults to 0 and is only
//! honored while reading, output is always 0-based. Every other field is
//! treated as metadata and carried into the `original` field of the output.
//!
//! A solution record is `{"solution": [0,1,...], "energy"?, "offset"?,
//! "selected bits indices"?}`. Instance records written by a transform that
//! received a solution carry these fields too, so they can be fed back as the
//! solution of the next transform in a chain.
//!
//! Integers of any size are read and written exactly.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;

use flate2::read::GzDecoder;
use log::debug;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::provenance::{Provenance, Transformed};
use crate::qubo::Qubo;
use crate::solution::Solution;

pub const SELECTED_BITS: &str = "selected bits indices";

/// A parsed instance record.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub qubo: Qubo,
    /// Every field except `qubo`, as read.
    pub metadata: Map<String, Value>,
}

/// Exact JSON number for an integer weight.
pub fn int_value(w: &BigInt) -> Value {
    if let Some(v) = w.to_i64() {
        return Value::from(v);
    }
    match Number::from_str(&w.to_string()) {
        Ok(n) => Value::Number(n),
        Err(_) => Value::String(w.to_string()),
    }
}

pub fn int_array(ws: &[BigInt]) -> Value {
    Value::Array(ws.iter().map(int_value).collect())
}

fn value_int(value: &Value, what: &str) -> Result<BigInt> {
    match value {
        Value::Number(n) => n
            .to_string()
            .parse()
            .map_err(|_| Error::malformed(format!("{} must be an integer, got {}", what, n))),
        other => Err(Error::malformed(format!("{} must be an integer, got {}", what, other))),
    }
}

fn value_index(value: &Value, what: &str) -> Result<usize> {
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| Error::malformed(format!("{} must be a non-negative integer, got {}", what, value)))
}

fn value_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::malformed(format!("{} must be an array", what)))
}

/// Parses an instance record.
pub fn parse_instance(text: &str) -> Result<InstanceRecord> {
    let Value::Object(mut map) = serde_json::from_str::<Value>(text)? else {
        return Err(Error::malformed("instance must be a JSON object"));
    };

    let nbit = value_index(map.get("nbit").ok_or(Error::MissingField("nbit"))?, "<nbit>")?;
    let qubo = map.shift_remove("qubo").ok_or(Error::MissingField("qubo"))?;
    let base = match map.get("base") {
        None | Some(Value::Null) => 0,
        Some(v) => value_index(v, "<base>")?,
    };
    if base > 1 {
        return Err(Error::malformed(format!("<base> must be 0 or 1, got {}", base)));
    }

    let mut terms = Vec::new();
    for term in value_array(&qubo, "<qubo>")? {
        let term = value_array(term, "qubo term")?;
        let [i, j, w] = term.as_slice() else {
            return Err(Error::malformed(format!("qubo term must be [i, j, weight], got {} values", term.len())));
        };
        let i = value_index(i, "qubo index")?;
        let j = value_index(j, "qubo index")?;
        if i < base || j < base {
            return Err(Error::malformed(format!("qubo index below base {}", base)));
        }
        terms.push((i - base, j - base, value_int(w, "qubo weight")?));
    }

    let mut q = Qubo::from_terms(nbit, terms)?;
    if let Some(offset) = map.get("offset").filter(|v| !v.is_null()) {
        q.set_offset(value_int(offset, "<offset>")?);
    }
    debug!("read instance: {}", q);

    Ok(InstanceRecord { qubo: q, metadata: map })
}

/// Parses a solution record.
pub fn parse_solution(text: &str) -> Result<Solution> {
    let Value::Object(map) = serde_json::from_str::<Value>(text)? else {
        return Err(Error::malformed("solution must be a JSON object"));
    };

    let bits = value_array(map.get("solution").ok_or(Error::MissingField("solution"))?, "<solution>")?
        .iter()
        .map(|v| match v.as_u64() {
            Some(b @ (0 | 1)) => Ok(b as u8),
            _ => Err(Error::malformed(format!("solution bits must be 0 or 1, got {}", v))),
        })
        .collect::<Result<Vec<u8>>>()?;

    let mut solution = Solution::new(bits);
    if let Some(energy) = map.get("energy").filter(|v| !v.is_null()) {
        solution.energy = Some(value_int(energy, "<energy>")?);
    }
    if let Some(offset) = map.get("offset").filter(|v| !v.is_null()) {
        solution.offset = Some(value_int(offset, "<offset>")?);
    }
    if let Some(selected) = map.get(SELECTED_BITS) {
        solution.selected = value_array(selected, SELECTED_BITS)?
            .iter()
            .map(|v| value_index(v, SELECTED_BITS))
            .collect::<Result<_>>()?;
    }
    Ok(solution)
}

/// Reads a record from a `.json` or gzip-compressed `.json.gz` file, or from
/// standard input if `path` is `None`.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    };
    let name = path.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".json.gz") {
        let mut text = String::new();
        GzDecoder::new(File::open(path)?).read_to_string(&mut text)?;
        Ok(text)
    } else if name.ends_with(".json") {
        Ok(fs::read_to_string(path)?)
    } else {
        Err(Error::UnsupportedEncoding(path.to_string_lossy().into_owned()))
    }
}

pub fn qubo_value(q: &Qubo) -> Value {
    Value::Array(
        q.terms()
            .map(|(i, j, w)| Value::Array(vec![Value::from(i), Value::from(j), int_value(w)]))
            .collect(),
    )
}

fn write_solution_fields(solution: &Solution, map: &mut Map<String, Value>) {
    map.insert("solution".into(), Value::from(solution.bits.clone()));
    if let Some(energy) = &solution.energy {
        map.insert("energy".into(), int_value(energy));
    }
    if !solution.selected.is_empty() {
        map.insert(SELECTED_BITS.into(), Value::from(solution.selected.clone()));
    }
}

/// Solution record for a known assignment.
pub fn solution_value(solution: &Solution) -> Value {
    let mut map = Map::new();
    write_solution_fields(solution, &mut map);
    if let Some(offset) = &solution.offset {
        map.insert("offset".into(), int_value(offset));
    }
    Value::Object(map)
}

/// Instance record for a transform's output; `original` is the metadata of
/// the input record.
pub fn output_value<P: Provenance>(out: &Transformed<P>, original: Map<String, Value>) -> Value {
    let mut map = Map::new();
    map.insert("operation".into(), Value::from(out.provenance.operation()));
    map.insert("nbit".into(), Value::from(out.qubo.nbit()));
    map.insert("base".into(), Value::from(0));
    map.insert("offset".into(), int_value(out.qubo.offset()));
    out.provenance.write_fields(&mut map);
    if let Some(solution) = &out.solution {
        write_solution_fields(solution, &mut map);
    }
    map.insert("qubo".into(), qubo_value(&out.qubo));
    map.insert("original".into(), Value::Object(original));
    Value::Object(map)
}

/// Serializes a record: pretty-printed, with arrays of numbers kept on one line.
pub fn to_string(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, RecordFormatter::default());
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    String::from_utf8(buf).map_err(|e| Error::malformed(e.to_string()))
}

/// Writes a serialized record to `path`, or to standard output if `path` is `None`.
pub fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
        Some(path) => fs::write(path, text)?,
    }
    Ok(())
}

const INDENT: &[u8] = b"    ";

/// Pretty formatter that writes numbers inside arrays without line breaks,
/// so every `[i,j,weight]` triple takes exactly one line.
#[derive(Debug, Default)]
struct RecordFormatter {
    indent: usize,
    has_value: bool,
    /// A line break is owed before the next array element, unless it is a number.
    pending_break: bool,
    /// The last value written was a number.
    after_number: bool,
}

impl RecordFormatter {
    fn newline<W: ?Sized + Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"\n")?;
        for _ in 0..self.indent {
            writer.write_all(INDENT)?;
        }
        Ok(())
    }

    fn start_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if self.pending_break {
            self.pending_break = false;
            self.newline(writer)?;
        }
        self.after_number = false;
        Ok(())
    }

    fn start_number(&mut self) {
        self.pending_break = false;
        self.after_number = true;
    }
}

macro_rules! inline_numbers {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name<W>(&mut self, writer: &mut W, value: $ty) -> io::Result<()>
            where
                W: ?Sized + Write,
            {
                self.start_number();
                write!(writer, "{}", value)
            }
        )*
    };
}

impl Formatter for RecordFormatter {
    inline_numbers!(
        write_i8: i8,
        write_i16: i16,
        write_i32: i32,
        write_i64: i64,
        write_i128: i128,
        write_u8: u8,
        write_u16: u16,
        write_u32: u32,
        write_u64: u64,
        write_u128: u128,
        write_f32: f32,
        write_f64: f64,
    );

    fn write_number_str<W>(&mut self, writer: &mut W, value: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.start_number();
        writer.write_all(value.as_bytes())
    }

    fn write_null<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.start_value(writer)?;
        writer.write_all(b"null")
    }

    fn write_bool<W>(&mut self, writer: &mut W, value: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.start_value(writer)?;
        writer.write_all(if value { b"true" } else { b"false" })
    }

    fn begin_string<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.start_value(writer)?;
        writer.write_all(b"\"")
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.start_value(writer)?;
        self.indent += 1;
        self.has_value = false;
        writer.write_all(b"[")
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.indent -= 1;
        if self.has_value && !self.after_number {
            self.newline(writer)?;
        }
        self.after_number = false;
        writer.write_all(b"]")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if !first {
            writer.write_all(b",")?;
        }
        self.pending_break = true;
        Ok(())
    }

    fn end_array_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.start_value(writer)?;
        self.indent += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.indent -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        self.after_number = false;
        writer.write_all(b"}")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        if !first {
            writer.write_all(b",")?;
        }
        self.newline(writer)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        writer.write_all(b": ")
    }

    fn end_object_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.has_value = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use test_log::test;

    use super::*;

    #[test]
    fn test_parse_instance() {
        let rec = parse_instance(r#"{"problem": "MIS", "nbit": 3, "qubo": [[0,0,-1],[1,1,-1],[0,1,5]]}"#).unwrap();
        assert_eq!(rec.qubo.nbit(), 3);
        assert_eq!(rec.qubo.get(0, 1), BigInt::from(5));
        assert_eq!(rec.qubo.offset(), &BigInt::from(0));
        assert!(rec.metadata.contains_key("problem"));
        assert!(!rec.metadata.contains_key("qubo"));
    }

    #[test]
    fn test_missing_fields() {
        let err = parse_instance(r#"{"qubo": []}"#).unwrap_err();
        assert!(matches!(err, Error::MissingField("nbit")));
        let err = parse_instance(r#"{"nbit": 2}"#).unwrap_err();
        assert!(matches!(err, Error::MissingField("qubo")));
        let err = parse_solution(r#"{"energy": 3}"#).unwrap_err();
        assert!(matches!(err, Error::MissingField("solution")));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(parse_instance("[1, 2]"), Err(Error::Malformed(_))));
        assert!(matches!(parse_instance("{nbit"), Err(Error::Json(_))));
        assert!(matches!(parse_instance(r#"{"nbit": 2, "qubo": [[0, 1]]}"#), Err(Error::Malformed(_))));
        assert!(matches!(parse_instance(r#"{"nbit": 2, "qubo": [[0, 1, 1.5]]}"#), Err(Error::Malformed(_))));
        assert!(matches!(parse_instance(r#"{"nbit": 2, "qubo": [[0, 2, 1]]}"#), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_base_one() {
        let rec = parse_instance(r#"{"nbit": 2, "base": 1, "qubo": [[1,1,3],[1,2,-4]]}"#).unwrap();
        assert_eq!(rec.qubo.triples(), vec![(0, 0, BigInt::from(3)), (0, 1, BigInt::from(-4))]);
    }

    #[test]
    fn test_big_integers_exact() {
        let text = r#"{"nbit": 1, "offset": -98765432109876543210, "qubo": [[0,0,123456789012345678901234567890]]}"#;
        let rec = parse_instance(text).unwrap();
        let big: BigInt = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(rec.qubo.get(0, 0), big);
        let out = to_string(&qubo_value(&rec.qubo)).unwrap();
        assert_eq!(out, "[\n    [0,0,123456789012345678901234567890]\n]\n");
        assert_eq!(int_value(rec.qubo.offset()).to_string(), "-98765432109876543210");
    }

    #[test]
    fn test_parse_solution() {
        let s = parse_solution(r#"{"solution": [1,0,1], "energy": -7, "offset": 2, "selected bits indices": [0, 2]}"#)
            .unwrap();
        assert_eq!(s.bits, vec![1, 0, 1]);
        assert_eq!(s.energy, Some(BigInt::from(-7)));
        assert_eq!(s.offset, Some(BigInt::from(2)));
        assert_eq!(s.selected, vec![0, 2]);
        assert!(parse_solution(r#"{"solution": [0, 2]}"#).is_err());
    }

    #[test]
    fn test_formatter_layout() {
        let value = json!({
            "a": 1,
            "b": [[0, 0, -1], [0, 1, 5]],
            "c": [],
            "d": {"e": [1, 2]},
            "f": ["x"]
        });
        let expected = "{\n    \"a\": 1,\n    \"b\": [\n        [0,0,-1],\n        [0,1,5]\n    ],\n    \"c\": [],\n    \"d\": {\n        \"e\": [1,2]\n    },\n    \"f\": [\n        \"x\"\n    ]\n}\n";
        assert_eq!(to_string(&value).unwrap(), expected);
    }

    #[test]
    fn test_formatter_output_is_valid_json() {
        let value = json!({"nbit": 2, "qubo": [[0, 1, -3]], "original": {"nbit": 2, "tags": [true, null]}});
        let text = to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_metadata_keeps_field_order() {
        let rec = parse_instance(r#"{"problem": "MIS", "nbit": 1, "qubo": [], "base": 0, "tail": 7}"#).unwrap();
        let keys: Vec<&str> = rec.metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, ["problem", "nbit", "base", "tail"]);
    }

    #[test]
    fn test_read_gzipped_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance.json.gz");
        let text = r#"{"nbit": 2, "qubo": [[0, 1, -3]]}"#;
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let read = read_input(Some(path.as_path())).unwrap();
        assert_eq!(read, text);
        let rec = parse_instance(&read).unwrap();
        assert_eq!(rec.qubo.get(0, 1), BigInt::from(-3));
    }

    #[test]
    fn test_read_plain_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Instance.JSON");
        fs::write(&path, r#"{"nbit": 0, "qubo": []}"#).unwrap();
        let rec = parse_instance(&read_input(Some(path.as_path())).unwrap()).unwrap();
        assert_eq!(rec.qubo.nbit(), 0);
    }

    #[test]
    fn test_unsupported_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instance.txt");
        fs::write(&path, r#"{"nbit": 0, "qubo": []}"#).unwrap();
        let err = read_input(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncoding(_)));
        assert!(err.is_malformed_input());
    }
}
