//! Offending pages saved for offline inspection when `--debug` is on.

use std::path::{Path, PathBuf};

use bisleri_core::store::write_private;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Shipping page without a shipment UUID.
    ShippingPage,
    /// Payment page whose total is not positive.
    PaymentFailTotal,
    /// Payment page without a total.
    PaymentNoTotal,
}

impl SnapshotKind {
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::ShippingPage => "shipping_page_debug.html",
            Self::PaymentFailTotal => "payment_page_fail_total.html",
            Self::PaymentNoTotal => "payment_page_no_total.html",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebugSnapshots {
    dir: Option<PathBuf>,
}

impl DebugSnapshots {
    #[must_use]
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Snapshots under `/tmp`.
    #[must_use]
    pub fn in_tmp() -> Self {
        Self::in_dir("/tmp")
    }

    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Writes `html` owner-only and returns where it went. Write failures
    /// are logged and swallowed.
    pub fn save(&self, kind: SnapshotKind, html: &str) -> Option<PathBuf> {
        let path = self.dir.as_deref().map(|dir| dir.join(kind.file_name()))?;
        match write_private(&path, html.as_bytes()) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "page snapshot saved");
                Some(path)
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not save page snapshot");
                None
            }
        }
    }
}

impl Default for DebugSnapshots {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Convenience for messages.
#[must_use]
pub fn describe(path: &Path, what: &str) -> String {
    format!("Debug: {what} HTML saved to {}", path.display())
}
