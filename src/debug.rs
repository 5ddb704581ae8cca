use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// JSON-lines event sink for degraded-but-recoverable conditions.
///
/// Cloning is cheap: all clones share one sink and one counter table.
#[derive(Clone)]
pub struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

enum Sink {
    File(BufWriter<File>),
    Memory(Vec<String>),
}

struct DebugState {
    sink: Sink,
    counters: HashMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_sink(Sink::File(BufWriter::new(file))))
    }

    pub fn in_memory() -> Self {
        Self::with_sink(Sink::Memory(Vec::new()))
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DebugState {
                sink,
                counters: HashMap::new(),
            })),
        }
    }

    pub fn log_json(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            state.write_line(json);
        }
    }

    /// Logs `{"type":kind, key:value, ...}` with string values escaped.
    pub fn event(&self, kind: &str, fields: &[(&str, String)]) {
        let mut out = format!("{{\"type\":\"{}\"", json_escape(kind));
        for (key, value) in fields {
            out.push_str(&format!(",\"{}\":\"{}\"", json_escape(key), json_escape(value)));
        }
        out.push('}');
        self.log_json(&out);
        self.increment(kind, 1);
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let mut counters: Vec<(String, u64)> = state.counters.drain().collect();
            counters.sort_by(|a, b| a.0.cmp(&b.0));
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let json = format!(
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
            state.write_line(&json);
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            if let Sink::File(writer) = &mut state.sink {
                let _ = writer.flush();
            }
        }
    }

    /// Lines captured by an in-memory logger. File loggers return nothing.
    pub fn lines(&self) -> Vec<String> {
        match self.inner.lock() {
            Ok(state) => match &state.sink {
                Sink::Memory(lines) => lines.clone(),
                Sink::File(_) => Vec::new(),
            },
            Err(_) => Vec::new(),
        }
    }

    pub fn count(&self, key: &str) -> u64 {
        self.inner
            .lock()
            .ok()
            .and_then(|state| state.counters.get(key).copied())
            .unwrap_or(0)
    }
}

impl DebugState {
    fn write_line(&mut self, json: &str) {
        match &mut self.sink {
            Sink::File(writer) => {
                let _ = writeln!(writer, "{json}");
            }
            Sink::Memory(lines) => lines.push(json.to_string()),
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}
