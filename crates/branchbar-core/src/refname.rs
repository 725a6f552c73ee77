//! Lexical validation of local branch names.
//!
//! Mirrors the rules of `git check-ref-format --branch` closely enough to
//! reject a name before spawning git for a create or rename. Validation here
//! is purely syntactic; whether the name collides with an existing ref is
//! left to git itself.

use crate::error::{Error, Result};

/// Checks `name` against the ref-name grammar and returns an
/// `InvalidRefName` error when it is rejected.
pub fn validate(name: &str) -> Result<()> {
    if is_valid(name) {
        Ok(())
    } else {
        Err(Error::invalid_ref_name(name))
    }
}

pub fn is_valid(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name.starts_with('/') || name.ends_with('/') || name.ends_with('.') {
        return false;
    }
    if name.ends_with(".lock") {
        return false;
    }
    // ".." also covers a dot following a dot; "/." covers dot-after-slash.
    if name.contains("//") || name.contains("..") || name.contains("/.") || name.contains("@{") {
        return false;
    }
    // b <= 0x20 covers space and the control range.
    name.bytes().all(|b| {
        b > 0x20 && b != 0x7f && !matches!(b, b'~' | b'^' | b':' | b'?' | b'*' | b'[' | b'\\')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_forbidden_names() {
        let forbidden = [
            "",
            "/leading",
            "trailing/",
            "trailing.",
            "double//slash",
            "dot/.hidden",
            "two..dots",
            "at@{sign",
            "back\\slash",
            "a space",
            "tilde~1",
            "caret^2",
            "colon:name",
            "question?",
            "star*",
            "bracket[",
            "ref.lock",
            "nested/ref.lock",
            "tab\tname",
        ];
        for name in forbidden {
            assert!(!is_valid(name), "{name:?} should be rejected");
            assert!(validate(name).is_err(), "{name:?} should error");
        }
    }

    #[test]
    fn accepts_valid_names() {
        let valid = [
            "main",
            "feature/x",
            "feature/deep/nesting",
            "v1.2.3",
            "fix-123",
            "under_score",
            "UPPER",
            ".hidden",
            "lock.locker",
            "a",
        ];
        for name in valid {
            assert!(is_valid(name), "{name:?} should be accepted");
            assert!(validate(name).is_ok(), "{name:?} should pass");
        }
    }
}
