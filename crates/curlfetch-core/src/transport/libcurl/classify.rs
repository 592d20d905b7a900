//! Map curl errors onto `FailureKind`.

use crate::outcome::{FailureKind, TransportFailure};

pub(super) fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_operation_timedout() {
        return FailureKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return FailureKind::Connection;
    }
    FailureKind::Other
}

pub(super) fn failure_from_curl(e: &curl::Error) -> TransportFailure {
    TransportFailure::new(classify_curl_error(e), e.to_string())
}
