use std::io::Write;

use fixed::types::I32F32;

use crate::error::{PdfError, Result};

/// Identifier of an indirect object. Allocated by [`ObjectGraph::add`] only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(usize);

impl ObjId {
    pub fn get(self) -> usize {
        self.0
    }

    pub(crate) fn reference(self) -> String {
        format!("{} 0 R", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Real(f32),
    Name(String),
    /// Text string; goes through the security handler when one is set.
    Text(String),
    /// Literal string that is never encrypted (names in name trees are `Text`).
    Literal(String),
    Hex(Vec<u8>),
    Array(Vec<Value>),
    Dict(Dict),
    Ref(ObjId),
    /// Pre-serialized operand text, written verbatim.
    Raw(String),
}

impl Value {
    pub fn name(name: impl Into<String>) -> Self {
        Value::Name(name.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn raw(raw: impl Into<String>) -> Self {
        Value::Raw(raw.into())
    }

    pub fn reals(values: &[f32]) -> Self {
        Value::Array(values.iter().map(|v| Value::Real(*v)).collect())
    }

    pub fn refs(ids: impl IntoIterator<Item = ObjId>) -> Self {
        Value::Array(ids.into_iter().map(Value::Ref).collect())
    }
}

impl From<ObjId> for Value {
    fn from(value: ObjId) -> Self {
        Value::Ref(value)
    }
}

impl From<Dict> for Value {
    fn from(value: Dict) -> Self {
        Value::Dict(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

/// Dictionary that preserves insertion order; `set` replaces in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(String, Value)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn typed(type_name: &str) -> Self {
        let mut dict = Self::new();
        dict.set("Type", Value::name(type_name));
        dict
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Stream payload. Data is stored already filtered; `/Length` is computed
/// when the object is written.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub data: Vec<u8>,
    pub filter: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfObject {
    pub dict: Dict,
    pub stream: Option<Stream>,
    /// The `/Encrypt` dictionary itself is written in clear.
    pub(crate) plain: bool,
}

impl PdfObject {
    pub fn dict(dict: Dict) -> Self {
        Self {
            dict,
            stream: None,
            plain: false,
        }
    }

    pub fn stream(dict: Dict, data: Vec<u8>) -> Self {
        Self {
            dict,
            stream: Some(Stream { data, filter: None }),
            plain: false,
        }
    }

    /// Content stream, flate-compressed when `compress` is set.
    pub fn content(dict: Dict, data: &[u8], compress: bool) -> Result<Self> {
        if compress {
            Ok(Self::compressed(dict, flate_compress(data)?))
        } else {
            Ok(Self::stream(dict, data.to_vec()))
        }
    }

    pub fn compressed(dict: Dict, deflated: Vec<u8>) -> Self {
        Self {
            dict,
            stream: Some(Stream {
                data: deflated,
                filter: Some("FlateDecode"),
            }),
            plain: false,
        }
    }
}

/// Byte transform applied to strings and streams while writing.
pub trait SecurityHandler {
    /// Called once, before setup, with the file identifier.
    fn prepare(&mut self, file_id: &str);
    fn encrypt_bytes(&self, data: &[u8], obj_id: ObjId) -> Vec<u8>;
    fn encryption_dict(&self) -> Dict;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Setup,
    Plumbing,
    Serialize,
}

struct Slot {
    object: PdfObject,
    label: Option<&'static str>,
}

/// Arena of indirect objects in emission order. Object `n` lives at index `n - 1`.
pub(crate) struct ObjectGraph {
    slots: Vec<Slot>,
    phase: Phase,
}

impl ObjectGraph {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            phase: Phase::Setup,
        }
    }

    pub(crate) fn add(&mut self, object: PdfObject, label: Option<&'static str>) -> Result<ObjId> {
        if self.phase != Phase::Setup {
            return Err(PdfError::structural(format!(
                "object added during {:?} phase",
                self.phase
            )));
        }
        self.slots.push(Slot { object, label });
        Ok(ObjId(self.slots.len()))
    }

    pub(crate) fn get_mut(&mut self, id: ObjId) -> Result<&mut PdfObject> {
        if self.phase == Phase::Serialize {
            return Err(PdfError::structural(format!(
                "object {} modified after serialization started",
                id.0
            )));
        }
        self.slots
            .get_mut(id.0.wrapping_sub(1))
            .map(|slot| &mut slot.object)
            .ok_or_else(|| PdfError::structural(format!("unknown object id {}", id.0)))
    }

    pub(crate) fn dict_mut(&mut self, id: ObjId) -> Result<&mut Dict> {
        Ok(&mut self.get_mut(id)?.dict)
    }

    pub(crate) fn begin_plumbing(&mut self) {
        self.phase = Phase::Plumbing;
    }

    pub(crate) fn begin_serialize(&mut self) {
        self.phase = Phase::Serialize;
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ObjId, &PdfObject, Option<&'static str>)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| (ObjId(idx + 1), &slot.object, slot.label))
    }
}

/// Writes one object body (no `N 0 obj` framing).
pub(crate) struct ObjectWriter<'a> {
    pub(crate) security: Option<&'a dyn SecurityHandler>,
    pub(crate) max_id: usize,
}

impl ObjectWriter<'_> {
    pub(crate) fn write_object(&self, out: &mut Vec<u8>, id: ObjId, object: &PdfObject) -> Result<()> {
        let security = if object.plain { None } else { self.security };
        let ctx = ValueCtx {
            security,
            obj_id: id,
            max_id: self.max_id,
        };
        match &object.stream {
            None => ctx.write_dict(out, &object.dict, "\n"),
            Some(stream) => {
                let data = match security {
                    Some(handler) => handler.encrypt_bytes(&stream.data, id),
                    None => stream.data.clone(),
                };
                let mut dict = object.dict.clone();
                if let Some(filter) = stream.filter {
                    dict.set("Filter", Value::name(filter));
                }
                dict.set("Length", Value::Int(data.len() as i64));
                ctx.write_dict(out, &dict, "\n")?;
                out.extend_from_slice(b"\nstream\n");
                out.extend_from_slice(&data);
                out.extend_from_slice(b"\nendstream");
                Ok(())
            }
        }
    }
}

struct ValueCtx<'a> {
    security: Option<&'a dyn SecurityHandler>,
    obj_id: ObjId,
    max_id: usize,
}

impl ValueCtx<'_> {
    fn write_dict(&self, out: &mut Vec<u8>, dict: &Dict, join: &str) -> Result<()> {
        out.extend_from_slice(b"<<");
        for (idx, (key, value)) in dict.entries.iter().enumerate() {
            if idx > 0 {
                out.extend_from_slice(join.as_bytes());
            }
            out.push(b'/');
            out.extend_from_slice(escape_pdf_name(key).as_bytes());
            out.push(b' ');
            self.write_value(out, value)?;
        }
        out.extend_from_slice(b">>");
        Ok(())
    }

    fn write_value(&self, out: &mut Vec<u8>, value: &Value) -> Result<()> {
        match value {
            Value::Null => out.extend_from_slice(b"null"),
            Value::Bool(v) => out.extend_from_slice(if *v { b"true" } else { b"false" }),
            Value::Int(v) => {
                let _ = write!(out, "{v}");
            }
            Value::Real(v) => out.extend_from_slice(fmt(*v).as_bytes()),
            Value::Name(name) => {
                out.push(b'/');
                out.extend_from_slice(escape_pdf_name(name).as_bytes());
            }
            Value::Text(text) => {
                let bytes = encode_text_string(text);
                match self.security {
                    Some(handler) => {
                        let encrypted = handler.encrypt_bytes(&bytes, self.obj_id);
                        out.push(b'<');
                        out.extend_from_slice(hex_upper(&encrypted).as_bytes());
                        out.push(b'>');
                    }
                    None => write_string_token(out, &bytes),
                }
            }
            Value::Literal(text) => write_string_token(out, &encode_text_string(text)),
            Value::Hex(bytes) => {
                out.push(b'<');
                out.extend_from_slice(hex_upper(bytes).as_bytes());
                out.push(b'>');
            }
            Value::Array(items) => {
                out.push(b'[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(b' ');
                    }
                    self.write_value(out, item)?;
                }
                out.push(b']');
            }
            Value::Dict(dict) => self.write_dict(out, dict, " ")?,
            Value::Ref(id) => {
                if id.0 == 0 || id.0 > self.max_id {
                    return Err(PdfError::structural(format!(
                        "object {} references unallocated object {}",
                        self.obj_id.0, id.0
                    )));
                }
                out.extend_from_slice(id.reference().as_bytes());
            }
            Value::Raw(raw) => out.extend_from_slice(&latin1_bytes(raw)),
        }
        Ok(())
    }
}

fn write_string_token(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        out.push(b'<');
        out.extend_from_slice(hex_upper(bytes).as_bytes());
        out.push(b'>');
        return;
    }
    out.push(b'(');
    out.extend_from_slice(&escape_pdf_string(bytes));
    out.push(b')');
}

/// Latin-1 when every char fits, UTF-16BE with a byte order mark otherwise.
pub(crate) fn encode_text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) <= 0xFF) {
        return text.chars().map(|c| c as u8).collect();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

pub(crate) fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect()
}

pub(crate) fn escape_pdf_string(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + 4);
    for b in input {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(*b),
        }
    }
    out
}

pub(crate) fn escape_pdf_name(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '+' | '.' | '_') {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for b in ch.encode_utf8(&mut buf).as_bytes() {
                out.push('#');
                out.push_str(&format!("{:02X}", b));
            }
        }
    }
    out
}

pub(crate) fn hex_upper(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        out.push_str(&format!("{:02X}", b));
    }
    out
}

pub(crate) fn flate_compress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Shortest decimal with at most three fractional digits.
pub(crate) fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::saturating_from_num(value);
    let scaled = fixed.saturating_mul(I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}
