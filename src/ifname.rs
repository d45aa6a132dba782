use std::{convert::TryFrom, fmt, str::FromStr};

use crate::constants::IFNAMSIZ;
use crate::errors::NameError;

/// A network interface name that the kernel would accept, such as "can0".
///
/// Follows the kernel's `dev_valid_name`: between 1 and `IFNAMSIZ - 1`
/// bytes, not `.` or `..`, and free of `/`, `:`, NUL and whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceName(String);

impl InterfaceName {
    pub fn new(name: &str) -> Result<InterfaceName, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }

        if name.len() >= IFNAMSIZ {
            return Err(NameError::TooLong(name.len()));
        }

        if name == "." || name == ".." {
            return Err(NameError::Reserved);
        }

        if let Some(c) = name
            .chars()
            .find(|&c| c == '/' || c == ':' || c == '\0' || c.is_whitespace())
        {
            return Err(NameError::InvalidCharacter(c));
        }

        Ok(InterfaceName(name.to_owned()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for InterfaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InterfaceName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InterfaceName::new(s)
    }
}

impl TryFrom<&str> for InterfaceName {
    type Error = NameError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        InterfaceName::new(s)
    }
}
