pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Need at least one frame")]
    NoFrames,

    #[error("Failed to parse SVG frame {frame}: {source}")]
    Parse {
        frame: usize,
        #[source]
        source: roxmltree::Error,
    },

    #[error("SVG frame {frame} has <{found}> as its root element, expected <svg>")]
    MissingSvgRoot { frame: usize, found: String },

    #[error("Invalid id pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid delta config: {message}")]
    InvalidConfig { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
