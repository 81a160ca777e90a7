use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical operating-system token. §4.1 mapping: `darwin → macos`,
/// `windows`/`win32 → windows`, anything else → `linux`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux and other Unix-like hosts that aren't macOS.
    Linux,
    /// macOS (`darwin`).
    Macos,
    /// Windows (`win32`).
    Windows,
}

impl Os {
    /// Canonicalize an arbitrary OS token (e.g. the Rust target
    /// triple's OS component, or a value from a config/manifest file)
    /// to one of the three canonical tokens.
    pub fn canonicalize(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "darwin" | "macos" => Self::Macos,
            "windows" | "win32" => Self::Windows,
            _ => Self::Linux,
        }
    }

    /// The canonical lowercase token (`linux`, `macos`, `windows`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical CPU-architecture token. Known tokens are normalized;
/// anything else passes through lowercased so future archive
/// architectures don't require a schema change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arch {
    /// A recognized, canonicalized architecture token.
    Known(KnownArch),
    /// An architecture token not in the known set, passed through
    /// lowercased.
    Other(String),
}

/// The architecture tokens the Resolver normalizes input onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownArch {
    /// `x86_64` / `amd64`.
    X86_64,
    /// `aarch64` / `arm64`.
    Aarch64,
}

impl Arch {
    /// Canonicalize an arbitrary architecture token per §4.1:
    /// `x86_64`/`amd64 → x86_64`; `aarch64`/`arm64 → aarch64`;
    /// anything else passes through lowercased.
    pub fn canonicalize(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "x86_64" | "amd64" => Self::Known(KnownArch::X86_64),
            "aarch64" | "arm64" => Self::Known(KnownArch::Aarch64),
            other => Self::Other(other.to_string()),
        }
    }

    /// The canonical token as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(KnownArch::X86_64) => "x86_64",
            Self::Known(KnownArch::Aarch64) => "aarch64",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PartialEq<str> for Arch {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_canonicalizes_darwin() {
        assert_eq!(Os::canonicalize("Darwin"), Os::Macos);
    }

    #[test]
    fn os_canonicalizes_win32() {
        assert_eq!(Os::canonicalize("WIN32"), Os::Windows);
    }

    #[test]
    fn os_defaults_to_linux() {
        assert_eq!(Os::canonicalize("freebsd"), Os::Linux);
    }

    #[test]
    fn arch_canonicalizes_amd64() {
        assert_eq!(Arch::canonicalize("amd64").as_str(), "x86_64");
    }

    #[test]
    fn arch_canonicalizes_arm64() {
        assert_eq!(Arch::canonicalize("arm64").as_str(), "aarch64");
    }

    #[test]
    fn arch_passes_through_unknown_lowercased() {
        assert_eq!(Arch::canonicalize("RISCV64").as_str(), "riscv64");
    }
}
