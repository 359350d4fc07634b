use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("document is not valid structured text: {0}")]
    Decode(#[source] serde_yaml::Error),

    #[error("document root is not a mapping")]
    NotAMapping,

    #[error("unsupported document version: {0}")]
    UnsupportedVersion(String),

    #[error("document could not be serialized: {0}")]
    Encode(#[source] serde_yaml::Error),

    #[error("could not read import source {path}: {source}")]
    ImportRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("import source {path} is not a loadable document: {source}")]
    ImportDecode { path: PathBuf, source: Box<Error> },
}
