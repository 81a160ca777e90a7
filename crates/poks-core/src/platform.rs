use std::sync::OnceLock;

use poks_schema::{Arch, Os};

/// The host `(os, arch)` pair in canonical tokens, computed once per
/// process and cached (§4.1: "called once per install run and
/// cached").
pub fn detect() -> (Os, Arch) {
    static DETECTED: OnceLock<(Os, Arch)> = OnceLock::new();
    DETECTED
        .get_or_init(|| {
            (
                Os::canonicalize(std::env::consts::OS),
                Arch::canonicalize(std::env::consts::ARCH),
            )
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_is_stable_across_calls() {
        assert_eq!(detect(), detect());
    }

    #[test]
    fn detect_returns_a_known_os() {
        let (os, _arch) = detect();
        assert!(matches!(os, Os::Linux | Os::Macos | Os::Windows));
    }
}
