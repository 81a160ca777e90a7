//! Reporter trait for dependency injection.
//!
//! Allows engine logic to report progress and status without being
//! coupled to a specific console implementation. `poks-cli` supplies
//! a real implementation; library embedders and tests use
//! [`NullReporter`]. A single `Arc<dyn Reporter>` is shared across the
//! worker pool (§5: "the progress reporter is the only synchronized
//! console resource").

pub trait Reporter: Send + Sync {
    /// A bucket is being cloned or pulled.
    fn syncing_bucket(&self, name: &str);

    /// An archive download started for `name@version`.
    fn downloading(&self, name: &str, version: &str, current: u64, total: Option<u64>);

    /// Extraction started for `name@version`.
    fn extracting(&self, name: &str, version: &str);

    /// Prefix-patching (poking) started for `name@version`.
    fn poking(&self, name: &str, version: &str);

    /// `name@version` reached a terminal state (`installed`,
    /// `skipped-existing`, `skipped-platform`, `skipped-cancelled`).
    fn done(&self, name: &str, version: &str, status: &str);

    /// `name@version` failed with a rendered error message.
    fn failed(&self, name: &str, version: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning (non-fatal) message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display the final summary: `K installed, M skipped, N failed`.
    fn summary(&self, installed: usize, skipped: usize, failed: usize);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn syncing_bucket(&self, name: &str) {
        (**self).syncing_bucket(name);
    }
    fn downloading(&self, name: &str, version: &str, current: u64, total: Option<u64>) {
        (**self).downloading(name, version, current, total);
    }
    fn extracting(&self, name: &str, version: &str) {
        (**self).extracting(name, version);
    }
    fn poking(&self, name: &str, version: &str) {
        (**self).poking(name, version);
    }
    fn done(&self, name: &str, version: &str, status: &str) {
        (**self).done(name, version, status);
    }
    fn failed(&self, name: &str, version: &str, reason: &str) {
        (**self).failed(name, version, reason);
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
    fn summary(&self, installed: usize, skipped: usize, failed: usize) {
        (**self).summary(installed, skipped, failed);
    }
}

/// A no-op reporter for silent operations (library embedders, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn syncing_bucket(&self, _: &str) {}
    fn downloading(&self, _: &str, _: &str, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &str, _: &str) {}
    fn poking(&self, _: &str, _: &str) {}
    fn done(&self, _: &str, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: usize, _: usize) {}
}
