/// Password-strength policy: minimum length plus an optional denylist of
/// known-weak passwords bundled with the crate
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    /// Parsed once for the process lifetime
    static ref COMMON_PASSWORDS: HashSet<&'static str> =
        include_str!("data/common-passwords.txt")
            .lines()
            .filter(|line| !line.is_empty())
            .collect();
}

/// Evaluates whether a candidate password is acceptable.
///
/// Intentionally minimal: no charset or entropy rules, just the two
/// configured knobs.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    minimum_length: usize,
    check_common: bool,
}

impl PasswordPolicy {
    pub fn new(minimum_length: usize, check_common: bool) -> Self {
        Self {
            minimum_length,
            check_common,
        }
    }

    /// Exact, case-sensitive denylist match
    pub fn is_common(&self, password: &str) -> bool {
        COMMON_PASSWORDS.contains(password)
    }

    pub fn is_acceptable(&self, password: &str) -> bool {
        if password.len() < self.minimum_length {
            return false;
        }
        if self.check_common && self.is_common(password) {
            return false;
        }
        true
    }
}
