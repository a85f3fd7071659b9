use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No seed host was configured.
    #[error("`hosts` must contain at least one seed host")]
    NoHosts,
    /// A seed host has an empty address.
    #[error("seed host #{0} has an empty address")]
    EmptyHost(usize),
    /// A seed host uses port zero.
    #[error("seed host `{0}` cannot use port 0")]
    PortZero(String),
    /// The namespace is empty.
    #[error("`namespace` cannot be empty")]
    EmptyNamespace,
    /// The set name is empty.
    #[error("`set_name` cannot be empty")]
    EmptySetName,
    /// The number of seeded customers is zero.
    #[error("`seed.count` cannot be zero")]
    SeedCountZero,
}
