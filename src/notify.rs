//! Toast-style user notification, surfaced by whatever UI hosts the crate.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub ttl_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Toast {
            message: message.into(),
            kind: ToastKind::Success,
            ttl_ms: 3000,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Toast {
            message: message.into(),
            kind: ToastKind::Error,
            ttl_ms: 3000,
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Default sink: routes toasts into the log stream.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, toast: Toast) {
        match toast.kind {
            ToastKind::Success => tracing::info!("{}", toast.message),
            ToastKind::Error => tracing::error!("{}", toast.message),
        }
    }
}
