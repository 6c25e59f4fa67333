//! Upload client
//!
//! The terminal counterpart of the guest page: pick files, upload them one
//! by one through the broker, show a status icon per file, then thank the
//! guest and go back to the picker.

pub mod session;
pub mod status;
pub mod uploader;

use thiserror::Error;

pub use session::{Phase, Timings, UploadSession, UploadStatusTrack};
pub use status::StatusView;
pub use uploader::{LocalFile, UploadMode, Uploader};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("server did not return an upload URL")]
    MissingUrl,

    #[error("upload rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
