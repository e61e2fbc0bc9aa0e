//! In-memory log capture for the dashboard's log view.
//!
//! [`LogCaptureLayer`] is a `tracing_subscriber::Layer` that records every
//! tracing event into a bounded ring buffer. `GET /api/logs` reads it back
//! with optional level and text filters.

use std::{
    collections::VecDeque,
    sync::{Arc, RwLock},
};

use {
    axum::{
        extract::{Query, State},
        response::{IntoResponse, Json},
    },
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::field::{Field, Visit},
    tracing_subscriber::{Layer, layer::Context},
};

use crate::server::AppState;

// ── LogEntry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub ts: u64,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    #[serde(default)]
    pub fields: serde_json::Map<String, Value>,
}

// ── LogBuffer ───────────────────────────────────────────────────────────────

const DEFAULT_CAPACITY: usize = 2_000;
const DEFAULT_LIMIT: usize = 200;

#[derive(Clone)]
pub struct LogBuffer {
    buf: Arc<RwLock<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        if let Ok(mut buf) = self.buf.write() {
            if buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(entry);
        }
    }

    /// The newest `limit` entries matching `filter`, oldest first.
    pub fn list(&self, filter: &LogFilter, limit: usize) -> Vec<LogEntry> {
        let Ok(buf) = self.buf.read() else {
            return vec![];
        };
        let mut out: Vec<LogEntry> = buf
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect();
        out.reverse();
        out
    }

    pub fn len(&self) -> usize {
        self.buf.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ── LogFilter ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LogFilter {
    /// Minimum level, inclusive.
    pub level: Option<String>,
    pub target: Option<String>,
    pub search: Option<String>,
}

impl LogFilter {
    fn level_ord(l: &str) -> u8 {
        match l.to_ascii_uppercase().as_str() {
            "TRACE" => 0,
            "DEBUG" => 1,
            "WARN" => 3,
            "ERROR" => 4,
            _ => 2,
        }
    }

    fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(ref lvl) = self.level
            && Self::level_ord(&entry.level) < Self::level_ord(lvl)
        {
            return false;
        }
        if let Some(ref tgt) = self.target
            && !tgt.is_empty()
            && !entry.target.contains(tgt.as_str())
        {
            return false;
        }
        if let Some(ref q) = self.search
            && !q.is_empty()
        {
            let q_lower = q.to_lowercase();
            if !entry.message.to_lowercase().contains(&q_lower)
                && !entry.target.to_lowercase().contains(&q_lower)
            {
                return false;
            }
        }
        true
    }
}

// ── Visitor (extracts fields from tracing events) ───────────────────────────

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: serde_json::Map<String, Value>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().into(), Value::String(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.into();
        } else {
            self.fields
                .insert(field.name().into(), Value::String(value.into()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().into(), Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().into(), Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().into(), Value::Bool(value));
    }
}

// ── LogCaptureLayer ─────────────────────────────────────────────────────────

pub struct LogCaptureLayer {
    buffer: LogBuffer,
}

impl LogCaptureLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S: tracing::Subscriber> Layer<S> for LogCaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(LogEntry {
            ts: botdeck_common::time::unix_now_ms(),
            level: meta.level().to_string(),
            target: meta.target().into(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

// ── Handler ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub level: Option<String>,
    pub target: Option<String>,
    pub search: Option<String>,
}

pub async fn list_logs_handler(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let filter = LogFilter {
        level: query.level,
        target: query.target,
        search: query.search,
    };
    let entries = state.gateway.logs.list(&filter, limit);
    Json(serde_json::json!({
        "entries": entries,
        "total": state.gateway.logs.len(),
    }))
}
