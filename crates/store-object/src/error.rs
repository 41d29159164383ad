use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("URI '{0}' does not use a scheme this store recognises (fam://, rados://, s3://)")]
    UnsupportedScheme(String),

    #[error("object '{0}' does not exist in this store")]
    NoSuchObject(String),

    #[error("location {uri}@{offset}+{length} reads past the end of object '{uri}'")]
    OutOfRange { uri: String, offset: u64, length: u64 },
}
