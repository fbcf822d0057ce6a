// Content derivation: untrusted portfolio content in, canonical ExportViewModel out.
// Nothing in this module renders or performs HTTP I/O except `handlers`.

pub mod bio;
pub mod duration;
pub mod handlers;
pub mod profession;
pub mod sanitize;
pub mod view_model;

use thiserror::Error;

/// Failure of an external data source consulted while building a view model.
///
/// Never fatal to an export: callers log it and fall back to defaults.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator returned malformed data: {0}")]
    Malformed(String),
}
