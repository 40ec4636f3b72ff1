//! Crate-wide error kinds.
//!
//! One enumeration covers the whole surface: storage engine, codec boundary,
//! HTTP layer and CLI all return the same kinds.  The `Display` text is the
//! user-visible message — the CLI prints it after `ERROR: `, the HTTP layer
//! embeds it in `Error: <message>\n` bodies.  Numeric exit codes exist only
//! at CLI process exit.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImgfsError>;

#[derive(Error, Debug)]
pub enum ImgfsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Runtime error")]
    Runtime,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Not enough arguments")]
    NotEnoughArguments,
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("Invalid command")]
    InvalidCommand,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Too many files")]
    MaxFiles,
    #[error("Invalid resolution(s)")]
    Resolutions,
    #[error("Invalid image ID")]
    InvalidImgId,
    #[error("imgFS is full")]
    Full,
    #[error("Image not found")]
    NotFound,
    #[error("Duplicate image ID")]
    DuplicateId,
    #[error("Image library error: {0}")]
    ImgLib(String),
    #[error("Threading error")]
    Threading,
    #[error("Debug")]
    Debug,
}

impl ImgfsError {
    /// Stable numeric code for CLI process exit.  Kinds are an enumeration
    /// everywhere else; the mapping to integers happens only here.
    pub fn exit_code(&self) -> i32 {
        match self {
            ImgfsError::Io(_)              => 1,
            ImgfsError::Runtime            => 2,
            ImgfsError::OutOfMemory        => 3,
            ImgfsError::NotEnoughArguments => 4,
            ImgfsError::InvalidFilename    => 5,
            ImgfsError::InvalidCommand     => 6,
            ImgfsError::InvalidArgument    => 7,
            ImgfsError::MaxFiles           => 8,
            ImgfsError::Resolutions        => 9,
            ImgfsError::InvalidImgId       => 10,
            ImgfsError::Full               => 11,
            ImgfsError::NotFound           => 12,
            ImgfsError::DuplicateId        => 13,
            ImgfsError::ImgLib(_)          => 14,
            ImgfsError::Threading          => 15,
            ImgfsError::Debug              => 16,
        }
    }
}
