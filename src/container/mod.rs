use std::fmt;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// An identifier of the container whose stats are requested.
///
/// The runtime accepts full ids, unique id prefixes and container names, so the
/// value is treated as opaque. It only has to be non-empty; unknown ids are left to
/// the runtime to reject.
///
/// # Examples
///
/// ```
/// # use stats_relay::container::{ContainerID, Error};
/// let container_id = ContainerID::new("my-nginx").unwrap();
/// assert_eq!(container_id.as_ref(), "my-nginx");
///
/// assert!(matches!(ContainerID::new(""), Err(Error::EmptyContainerID)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyContainerID`] if the input is empty.
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() {
            return Err(Error::EmptyContainerID);
        }

        Ok(Self(src.into()))
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
