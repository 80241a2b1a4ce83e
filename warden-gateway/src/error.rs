use thiserror::Error;

/// Failure taxonomy for every outbound gateway call.
///
/// `PermissionDenied` is logged and never retried; `Transient` is logged and
/// safe to retry on a later occurrence; `NotFound` means the target vanished
/// first and is treated as success-equivalent by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("transient platform error: {0}")]
    Transient(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, GatewayError::PermissionDenied(_))
    }
}

/// Map an HTTP status and platform error code onto the taxonomy.
///
/// 50013 is the platform's "missing permissions" code; 10003/10008 are
/// unknown-channel/unknown-message.
pub(crate) fn classify_http(status: u16, code: isize, context: &str) -> GatewayError {
    if status == 403 || code == 50013 {
        GatewayError::PermissionDenied(context.to_owned())
    } else if status == 404 || code == 10003 || code == 10008 {
        GatewayError::NotFound(context.to_owned())
    } else {
        GatewayError::Transient(format!("{context} (status {status}, code {code})"))
    }
}
