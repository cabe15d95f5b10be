//! Reporter sink (spec §6): the narrow interface analyses and actions use to
//! talk to the outside world. The core never writes to stdout or a file
//! directly — it only ever calls through a `&mut dyn Reporter`.

/// kind tag on an emitted line; only [`analysis::Analysis`](crate::analysis)
/// implementations are permitted to emit `Analysis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Progress,
    Comment,
    Error,
    Analysis,
}

pub trait Reporter {
    fn emit(&mut self, kind: ReportKind, text: &str);

    /// tabular multi-value emission: one tab-separated line
    fn emit_row(&mut self, kind: ReportKind, values: &[String]) {
        self.emit(kind, &values.join("\t"));
    }

    fn push_prefix(&mut self, prefix: &str);
    fn pop_prefix(&mut self);
}

/// RAII guard pairing a `push_prefix` with the matching `pop_prefix`, so a
/// prefix set by an action is popped on every exit path, including an early
/// return via `?` (spec §5, "Scoped acquisition").
pub struct ScopedPrefix<'a> {
    reporter: &'a mut dyn Reporter,
}

impl<'a> ScopedPrefix<'a> {
    pub fn new(reporter: &'a mut dyn Reporter, prefix: impl AsRef<str>) -> Self {
        reporter.push_prefix(prefix.as_ref());
        Self { reporter }
    }

    pub fn reporter(&mut self) -> &mut dyn Reporter {
        self.reporter
    }
}

impl Drop for ScopedPrefix<'_> {
    fn drop(&mut self) {
        self.reporter.pop_prefix();
    }
}

/// an in-memory reporter, mainly for tests and embedding applications that
/// want to buffer output before deciding where it goes
#[derive(Default)]
pub struct RecordingReporter {
    pub lines: Vec<(ReportKind, String)>,
    prefixes: Vec<String>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analysis_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .filter(|(kind, _)| *kind == ReportKind::Analysis)
            .map(|(_, text)| text.as_str())
    }
}

impl Reporter for RecordingReporter {
    fn emit(&mut self, kind: ReportKind, text: &str) {
        let prefixed = if self.prefixes.is_empty() {
            text.to_string()
        } else {
            format!("{}: {text}", self.prefixes.join("/"))
        };
        self.lines.push((kind, prefixed));
    }

    fn push_prefix(&mut self, prefix: &str) {
        self.prefixes.push(prefix.to_string());
    }

    fn pop_prefix(&mut self) {
        self.prefixes.pop();
    }
}
