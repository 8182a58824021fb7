use std::fmt::Debug;

/// Forwards an error to tracing instead of bubbling it up.
///
/// Event handlers use this so that one broken message never stops the event stream.
pub trait ForwardRefToTracing<T, E> {
    fn trace_err(self) -> Result<T, E>;
    fn trace_err_ok(self) -> Option<T>;
    fn trace_warn_ok(self, context: &str) -> Option<T>;
}

impl<T, E> ForwardRefToTracing<T, E> for Result<T, E>
where
    E: Debug,
{
    fn trace_err(self) -> Result<T, E> {
        self.inspect_err(|e| tracing::error!("{:?}", e))
    }

    fn trace_err_ok(self) -> Option<T> {
        self.trace_err().ok()
    }

    fn trace_warn_ok(self, context: &str) -> Option<T> {
        self.inspect_err(|e| tracing::warn!("{context}: {:?}", e))
            .ok()
    }
}
