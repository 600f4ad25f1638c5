//! Reporter trait for dependency injection.
//!
//! This trait lets the engine report progress and failures without being
//! coupled to a specific console implementation. Quiet and test runs
//! substitute [`NullReporter`].

/// Progress and status sink for a reconciliation run.
pub trait Reporter: Send + Sync {
    /// A tool install attempt has started.
    fn installing(&self, name: &str, version: &str);

    /// A tool removal attempt has started.
    fn removing(&self, name: &str);

    /// A per-tool operation finished successfully.
    fn done(&self, name: &str, detail: &str);

    /// A per-tool operation failed with a specific reason.
    fn failed(&self, name: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary for the run.
    fn summary(&self, installed: usize, removed: usize, failed: usize);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn installing(&self, name: &str, version: &str) {
        (**self).installing(name, version);
    }
    fn removing(&self, name: &str) {
        (**self).removing(name);
    }
    fn done(&self, name: &str, detail: &str) {
        (**self).done(name, detail);
    }
    fn failed(&self, name: &str, reason: &str) {
        (**self).failed(name, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, installed: usize, removed: usize, failed: usize) {
        (**self).summary(installed, removed, failed);
    }
}

/// A no-op reporter for silent operations (e.g. testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn installing(&self, _: &str, _: &str) {}
    fn removing(&self, _: &str) {}
    fn done(&self, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: usize, _: usize) {}
}
