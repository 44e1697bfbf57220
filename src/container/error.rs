#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("container id must not be empty")]
    EmptyContainerID,
}
pub type Result<T> = std::result::Result<T, Error>;
