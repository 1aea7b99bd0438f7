use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown test set option {0}, please input confluent, apache or clean")]
    UnknownTestSet(String),

    #[error("Unknown cloud platform {0}, expected AWS, AZURE or GCS")]
    UnknownPlatform(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
