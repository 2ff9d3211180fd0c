use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("no empty slot on page")]
    PageFull,
    #[error("tuple schema does not match the page schema")]
    SchemaMismatch,
    #[error("slot is already empty")]
    SlotEmpty,
    #[error("tuple is not stored in the referenced slot")]
    TupleMismatch,
    #[error("malformed page image: {0}")]
    Io(#[from] std::io::Error),
}
