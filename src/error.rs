use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Fatal conditions of a conversion run. Each one aborts the run before any
/// output is written.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("API Blueprint file [{}] not found.", path.display())]
    InputNotFound { path: PathBuf },

    #[error("{0}")]
    InvalidFormat(String),

    #[error("could not encode collection: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not write collection to {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn not_ast() -> Self {
        Self::InvalidFormat(
            "Your API Blueprint file is not in the AST format. \
             Re-generate it with: drafter --type ast --format json <file>.apib"
                .to_string(),
        )
    }

    pub fn outdated_version(found: &str) -> Self {
        Self::InvalidFormat(format!(
            "Your API Blueprint needs to be built with Snow Crash 0.9.0 or higher (found AST version {found})."
        ))
    }
}
