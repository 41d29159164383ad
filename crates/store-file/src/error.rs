use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("location URI '{0}' is not a file:// URI this store can read")]
    NotAFileUri(String),

    #[error("location {uri}@{offset}+{length} reads past the end of its data file")]
    OutOfRange { uri: String, offset: u64, length: u64 },
}
