//! Top-level server errors.

use thiserror::Error;

use crate::{domain::ChangeStreamError, ui::change_router::RouterError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),

    #[error(transparent)]
    ChangeStream(#[from] ChangeStreamError),

    #[error(transparent)]
    Router(#[from] RouterError),
}
