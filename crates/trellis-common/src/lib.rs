// Shared identifier types and small helpers used across Trellis crates.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("config error: {0}")]
    Config(String),
}

pub mod ids {
    use super::{Error, Result};
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;
    use uuid::Uuid;

    macro_rules! id_types {
        ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {$(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }

            impl FromStr for $name {
                type Err = Error;

                fn from_str(input: &str) -> Result<Self> {
                    Uuid::parse_str(input.trim())
                        .map(Self)
                        .map_err(|_| Error::InvalidId(format!("{} {input:?}", stringify!($name))))
                }
            }
        )+};
    }

    id_types! {
        /// A registered account; anonymous visitors have none.
        UserId,
        ProjectId,
        /// A per-project role; never shared across projects.
        RoleId,
    }
}
