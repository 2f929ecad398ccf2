use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("unknown permission: {0}")]
    UnknownPermission(String),
    #[error("owner permission {0} cannot be granted through a role")]
    OwnerPermissionInRole(String),
    #[error("invalid permission catalog: {0}")]
    InvalidCatalog(String),
    #[error("catalog yaml error: {0}")]
    CatalogYaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AuthzResult<T> = Result<T, AuthzError>;
