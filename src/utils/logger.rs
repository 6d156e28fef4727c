use std::sync::{Arc, Mutex};

/// Console reporter handed to every operation.
///
/// `log` is for progress chatter and only prints when verbose. `warn` reports
/// non-fatal conditions (skipped transitions, missing optional inputs) and
/// always prints. A sink captures both instead of printing, for tests.
#[derive(Clone, Default)]
pub struct Logger {
    verbose: bool,
    sink: Option<Arc<Mutex<Vec<String>>>>,
}

impl Logger {
    pub fn stderr(verbose: bool) -> Self {
        Self {
            verbose,
            sink: None,
        }
    }

    /// Drops progress chatter. Warnings still reach stderr.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_sink(verbose: bool, sink: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            verbose,
            sink: Some(sink),
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn log(&self, message: impl AsRef<str>) {
        if self.verbose {
            self.emit(message.as_ref());
        }
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(&format!("warning: {}", message.as_ref()));
    }

    fn emit(&self, message: &str) {
        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.push(message.to_string());
                return;
            }
        }

        eprintln!("{message}");
    }
}
