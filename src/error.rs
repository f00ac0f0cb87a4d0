use crate::comment::CommentId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no comment with id {0}")]
    NotFound(CommentId),

    #[error("row {index} is out of range ({len} rows visible)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("comment {id} at level {level} skips a level (at most {max} allowed here)")]
    LevelJump {
        id: CommentId,
        level: usize,
        max: usize,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected payload: {0}")]
    Decode(String),
}
