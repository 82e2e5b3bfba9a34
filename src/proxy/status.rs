use axum::http::StatusCode;

/// Local status and fixed message returned for a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedStatus {
    pub status: StatusCode,
    pub message: &'static str,
}

/// Upstream statuses that are surfaced as-is, each with its fixed message.
const KNOWN_FAILURES: &[MappedStatus] = &[
    MappedStatus {
        status: StatusCode::MOVED_PERMANENTLY,
        message: "Moved permanently",
    },
    MappedStatus {
        status: StatusCode::NOT_FOUND,
        message: "Not found",
    },
    MappedStatus {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        message: "Validation failed, or the endpoint has been spammed",
    },
];

/// Everything not listed in `KNOWN_FAILURES` collapses to this.
pub const FALLBACK: MappedStatus = MappedStatus {
    status: StatusCode::BAD_REQUEST,
    message: "Client side error",
};

/// Map a non-success upstream status onto the response the proxy returns.
pub fn map_upstream_status(upstream: StatusCode) -> MappedStatus {
    KNOWN_FAILURES
        .iter()
        .find(|mapped| mapped.status == upstream)
        .copied()
        .unwrap_or(FALLBACK)
}
