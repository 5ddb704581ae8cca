use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::debug::json_escape;

/// Timing and size accounting for one or more builds.
#[derive(Clone)]
pub struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: Option<BufWriter<File>>,
    memory: Vec<String>,
    path: Option<PathBuf>,
    span_totals: HashMap<String, f64>,
    span_counts: HashMap<String, u64>,
    count_totals: HashMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self::with_state(Some(BufWriter::new(file)), Some(path)))
    }

    pub fn in_memory() -> Self {
        Self::with_state(None, None)
    }

    fn with_state(writer: Option<BufWriter<File>>, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer,
                memory: Vec::new(),
                path,
                span_totals: HashMap::new(),
                span_counts: HashMap::new(),
                count_totals: HashMap::new(),
            })),
        }
    }

    pub fn log_span_ms(&self, name: &str, ms: f64) {
        let json = format!(
            "{{\"type\":\"perf.span\",\"name\":\"{}\",\"unit\":\"ms\",\"ms\":{:.3}}}",
            json_escape(name),
            ms
        );
        if let Ok(mut state) = self.inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            state.write_line(json);
        }
    }

    pub fn log_counts(&self, name: &str, counts: &[(&str, u64)]) {
        let mut out = format!(
            "{{\"type\":\"perf.counts\",\"name\":\"{}\",\"counts\":{{",
            json_escape(name)
        );
        for (idx, (key, value)) in counts.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(&format!("\"{}\":{}", json_escape(key), value));
        }
        out.push_str("}}");
        if let Ok(mut state) = self.inner.lock() {
            for (key, value) in counts {
                let full_key = format!("{name}.{key}");
                let entry = state.count_totals.entry(full_key).or_insert(0);
                *entry = entry.saturating_add(*value);
            }
            state.write_line(out);
        }
    }

    /// Final per-label size summary of the serialized sections.
    pub fn log_sections(&self, sections: &[(String, usize)]) {
        let mut out = String::from("{\"type\":\"perf.sections\",\"sizes\":{");
        for (idx, (label, bytes)) in sections.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(&format!(
                "\"{}\":\"{}\"",
                json_escape(label),
                sizeof_fmt(*bytes as f64)
            ));
        }
        out.push_str("}}");
        let counts: Vec<(&str, u64)> = sections
            .iter()
            .map(|(label, bytes)| (label.as_str(), *bytes as u64))
            .collect();
        if let Ok(mut state) = self.inner.lock() {
            state.write_line(out);
            for (key, value) in counts {
                let entry = state
                    .count_totals
                    .entry(format!("section_bytes.{key}"))
                    .or_insert(0);
                *entry = entry.saturating_add(value);
            }
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|state| state.memory.clone())
            .unwrap_or_default()
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            if let Some(writer) = state.writer.as_mut() {
                let _ = writer.flush();
            }
        }
    }
}

impl PerfState {
    fn write_line(&mut self, json: String) {
        match self.writer.as_mut() {
            Some(writer) => {
                let _ = writeln!(writer, "{json}");
            }
            None => self.memory.push(json),
        }
    }
}

impl Drop for PerfState {
    fn drop(&mut self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let hot_path = hot_path_for(path);
        let Ok(file) = File::create(&hot_path) else {
            return;
        };
        let mut writer = BufWriter::new(file);

        let mut spans: Vec<(&String, &f64)> = self.span_totals.iter().collect();
        spans.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (rank, (name, ms)) in spans.into_iter().take(100).enumerate() {
            let count = *self.span_counts.get(name).unwrap_or(&1);
            let avg = if count == 0 { 0.0 } else { ms / count as f64 };
            let _ = writeln!(
                writer,
                "{{\"type\":\"perf.hot.span\",\"rank\":{},\"name\":\"{}\",\"unit\":\"ms\",\"agg\":\"sum\",\"ms\":{:.3},\"count\":{},\"avg_ms\":{:.3}}}",
                rank + 1,
                json_escape(name),
                ms,
                count,
                avg
            );
        }

        let mut counts: Vec<(&String, &u64)> = self.count_totals.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));
        for (rank, (name, value)) in counts.into_iter().take(100).enumerate() {
            let _ = writeln!(
                writer,
                "{{\"type\":\"perf.hot.count\",\"rank\":{},\"name\":\"{}\",\"value\":{}}}",
                rank + 1,
                json_escape(name),
                value
            );
        }
    }
}

/// Measures one phase and reports it when dropped.
pub(crate) struct Span<'a> {
    logger: Option<&'a PerfLogger>,
    name: &'static str,
    start: Instant,
}

impl<'a> Span<'a> {
    pub(crate) fn start(logger: Option<&'a PerfLogger>, name: &'static str) -> Self {
        Self {
            logger,
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        if let Some(logger) = self.logger {
            logger.log_span_ms(self.name, self.start.elapsed().as_secs_f64() * 1000.0);
        }
    }
}

pub(crate) fn sizeof_fmt(num: f64) -> String {
    let mut num = num;
    for unit in ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"] {
        if num.abs() < 1024.0 {
            return format!("{num:3.1}{unit}B");
        }
        num /= 1024.0;
    }
    format!("{num:.1}YiB")
}

fn hot_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("pagewright_perf.log");
    let stem = file_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(file_name);
    let hot_name = format!("{stem}_hot.log");
    path.with_file_name(hot_name)
}
