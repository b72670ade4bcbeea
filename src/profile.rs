use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::info;
use serde::Serialize;

use crate::Result;

static NEXT_THREAD_TAG: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TAG: u64 = NEXT_THREAD_TAG.fetch_add(1, Ordering::Relaxed);
}

/// Small per-process number identifying the calling thread in traces.
fn thread_tag() -> u64 {
    THREAD_TAG.with(|tag| *tag)
}

/// One timed region.
#[derive(Debug, Clone)]
pub struct Span {
    /// Label given to [`Profiler::scope`].
    pub name: String,
    /// Start offset from the profiler's creation.
    pub start: Duration,
    /// Elapsed time.
    pub duration: Duration,
    /// Tag of the thread that ran the span.
    pub thread: u64,
}

/// A sink for finished spans.
pub trait Instrumentor: Send + Sync {
    /// Records a finished span.
    fn record(&self, span: &Span);

    /// Flushes whatever the sink buffered.
    fn finish(&self) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct TraceEvent {
    cat: &'static str,
    dur: u64,
    name: String,
    ph: &'static str,
    pid: u32,
    tid: u64,
    ts: u64,
}

#[derive(Serialize)]
struct TraceDocument<'a> {
    #[serde(rename = "otherData")]
    other_data: BTreeMap<String, String>,
    #[serde(rename = "traceEvents")]
    trace_events: &'a [TraceEvent],
}

/// Collects spans as Chrome trace events and writes them to a JSON file on
/// [`finish`](Instrumentor::finish). Open the file in `chrome://tracing`.
pub struct TraceFile {
    path: PathBuf,
    events: Mutex<Vec<TraceEvent>>,
}

impl TraceFile {
    /// Creates a sink writing to `path`. Nothing touches disk until
    /// `finish`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        TraceFile {
            path: path.as_ref().to_path_buf(),
            events: Mutex::new(Vec::new()),
        }
    }
}

impl Instrumentor for TraceFile {
    fn record(&self, span: &Span) {
        let event = TraceEvent {
            cat: "function",
            dur: span.duration.as_micros() as u64,
            name: span.name.replace('"', "'"),
            ph: "X",
            pid: 0,
            tid: span.thread,
            ts: span.start.as_micros() as u64,
        };
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn finish(&self) -> Result<()> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let mut writer = BufWriter::new(File::create(&self.path)?);
        let document = TraceDocument {
            other_data: BTreeMap::new(),
            trace_events: &events,
        };
        serde_json::to_writer(&mut writer, &document)?;
        writer.flush()?;
        info!(
            "Wrote {} trace events to {}",
            events.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Reports each span through the `log` facade as it finishes.
#[derive(Debug, Default)]
pub struct ConsoleLog;

impl Instrumentor for ConsoleLog {
    fn record(&self, span: &Span) {
        info!(
            "name: {}, dur: {:.3}ms, ts: {}us, thread: {}",
            span.name,
            span.duration.as_secs_f64() * 1000.0,
            span.start.as_micros(),
            span.thread
        );
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Hands out [`ScopeTimer`]s that report to one sink.
///
/// Cheap to clone, so it can be moved into pool tasks.
#[derive(Clone)]
pub struct Profiler {
    sink: Arc<dyn Instrumentor>,
    epoch: Instant,
}

impl Profiler {
    /// Creates a profiler whose span offsets count from now.
    pub fn new<I: Instrumentor + 'static>(sink: I) -> Self {
        Profiler {
            sink: Arc::new(sink),
            epoch: Instant::now(),
        }
    }

    /// Starts timing a region; it is recorded when the timer stops or drops.
    pub fn scope(&self, name: impl Into<String>) -> ScopeTimer {
        ScopeTimer {
            profiler: self.clone(),
            name: name.into(),
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Flushes the sink.
    pub fn finish(&self) -> Result<()> {
        self.sink.finish()
    }
}

/// RAII timer returned by [`Profiler::scope`].
pub struct ScopeTimer {
    profiler: Profiler,
    name: String,
    start: Instant,
    stopped: bool,
}

impl ScopeTimer {
    /// Records the span now and returns its duration. Later calls and the
    /// drop do nothing.
    pub fn stop(&mut self) -> Duration {
        let duration = self.start.elapsed();
        if !self.stopped {
            self.stopped = true;
            let span = Span {
                name: std::mem::take(&mut self.name),
                start: self.start.saturating_duration_since(self.profiler.epoch),
                duration,
                thread: thread_tag(),
            };
            self.profiler.sink.record(&span);
        }
        duration
    }
}

impl Drop for ScopeTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::{ConsoleLog, Instrumentor, Profiler, Span, TraceFile};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<Span>>>);

    impl Instrumentor for Collect {
        fn record(&self, span: &Span) {
            self.0.lock().unwrap().push(span.clone());
        }

        fn finish(&self) -> crate::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn timer_records_once() {
        let spans = Collect::default();
        let profiler = Profiler::new(spans.clone());
        {
            let mut timer = profiler.scope("work");
            thread::sleep(Duration::from_millis(5));
            assert!(timer.stop() >= Duration::from_millis(5));
            timer.stop();
        }
        let _ = profiler.scope("dropped");

        let spans = spans.0.lock().unwrap();
        let names: Vec<_> = spans.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["work", "dropped"]);
        assert!(spans[0].duration >= Duration::from_millis(5));
    }

    #[test]
    fn spans_on_different_threads_get_different_tags() {
        let spans = Collect::default();
        let profiler = Profiler::new(spans.clone());
        drop(profiler.scope("main"));
        let other = profiler.clone();
        thread::spawn(move || drop(other.scope("other")))
            .join()
            .unwrap();

        let spans = spans.0.lock().unwrap();
        assert_ne!(spans[0].thread, spans[1].thread);
    }

    #[test]
    fn trace_file_is_chrome_trace_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        let profiler = Profiler::new(TraceFile::new(&path));
        drop(profiler.scope("say \"hi\""));
        drop(profiler.scope("second"));
        profiler.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["otherData"], serde_json::json!({}));
        let events = json["traceEvents"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["name"], "say 'hi'");
        assert_eq!(events[0]["ph"], "X");
        assert_eq!(events[0]["cat"], "function");
        assert!(events[1]["ts"].as_u64().unwrap() >= events[0]["ts"].as_u64().unwrap());
    }

    #[test]
    fn console_log_finish_is_ok() {
        let profiler = Profiler::new(ConsoleLog);
        drop(profiler.scope("noop"));
        assert!(profiler.finish().is_ok());
    }
}
