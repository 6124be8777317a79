use crate::client::PeerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chainmesh_core::LedgerError;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Peer(#[from] PeerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Ledger(LedgerError::InvalidTransaction | LedgerError::InvalidPeerAddress) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Ledger(LedgerError::RejectedBlock { .. }) => (
                StatusCode::FORBIDDEN,
                "The block was discarded by the node".to_string(),
            ),
            ApiError::Ledger(LedgerError::TamperedChain { .. } | LedgerError::EmptyChain) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            // Forward whatever the bootstrap node said.
            ApiError::Peer(PeerError::Status { status, body, .. }) => (*status, body.clone()),
            ApiError::Peer(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };
        if status.is_server_error() {
            warn!("{self}");
        }
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainmesh_core::RejectReason;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::from(LedgerError::InvalidTransaction), StatusCode::BAD_REQUEST),
            (ApiError::from(LedgerError::InvalidPeerAddress), StatusCode::BAD_REQUEST),
            (
                ApiError::from(LedgerError::RejectedBlock {
                    index: 3,
                    reason: RejectReason::HashMismatch,
                }),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::from(LedgerError::TamperedChain { index: 1 }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(PeerError::Status {
                    peer: "http://a".into(),
                    status: StatusCode::CONFLICT,
                    body: "nope".into(),
                }),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
