use thiserror::Error;

pub mod manifest;
pub mod specifier;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot parse specifier `{0}`: more than one `#` reference separator")]
    MultipleSeparators(String),
    #[error("Cannot parse specifier `{0}`: empty reference after `#`")]
    EmptyReference(String),
    #[error("IO error reading manifest {path}: {source}")]
    IO {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error in manifest {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}
