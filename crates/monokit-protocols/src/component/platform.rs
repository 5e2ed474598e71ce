//! Operating system constraints for components.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating system a component can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Any,
    Linux,
    Darwin,
    Windows,
    FreeBsd,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Platform {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::Darwin
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "freebsd") {
            Platform::FreeBsd
        } else {
            Platform::Any
        }
    }

    /// Whether a component constrained to `self` may run on `host`.
    pub fn matches(&self, host: Platform) -> bool {
        *self == Platform::Any || *self == host
    }

    /// Whether a component constrained to `self` may run here.
    pub fn matches_current(&self) -> bool {
        self.matches(Platform::current())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Any => "any",
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
            Platform::FreeBsd => "freebsd",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" | "" => Ok(Platform::Any),
            "linux" => Ok(Platform::Linux),
            "darwin" | "macos" => Ok(Platform::Darwin),
            "windows" => Ok(Platform::Windows),
            "freebsd" => Ok(Platform::FreeBsd),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_matches_everything() {
        assert!(Platform::Any.matches(Platform::Linux));
        assert!(Platform::Any.matches(Platform::Darwin));
        assert!(Platform::Any.matches_current());
    }

    #[test]
    fn test_specific_platform() {
        assert!(Platform::Linux.matches(Platform::Linux));
        assert!(!Platform::Linux.matches(Platform::Darwin));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_linux() {
        assert_eq!(Platform::current(), Platform::Linux);
        assert!(!Platform::Darwin.matches_current());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("linux".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::Darwin);
        assert_eq!("ANY".parse::<Platform>().unwrap(), Platform::Any);
        assert!("plan9".parse::<Platform>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Platform::FreeBsd.to_string(), "freebsd");
    }
}
