//! Path and placeholder helpers for configuration values.

use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "${env:";

/// Replaces `${env:VAR}` placeholders with the value of `VAR`.
///
/// Unset variables expand to an empty string. An unterminated placeholder is
/// kept as written.
///
/// # Example
///
/// ```rust
/// use quickedit_cli::utils::replace_env_placeholders;
///
/// unsafe { std::env::set_var("QE_DOC_VAR", "hello"); }
/// assert_eq!(replace_env_placeholders("Value: ${env:QE_DOC_VAR}"), "Value: hello");
/// ```
pub fn replace_env_placeholders(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(ENV_PREFIX) {
        out.push_str(&rest[..start]);
        let tail = &rest[start + ENV_PREFIX.len()..];
        let Some(end) = tail.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let var = &tail[..end];
        match std::env::var(var) {
            Ok(value) => out.push_str(&value),
            Err(_) => debug!("${{env:{var}}} is not set, expanding to nothing"),
        }
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Expand placeholders and a leading `~`, then resolve against `base`.
pub fn expand_path(value: &str, base: &Path) -> PathBuf {
    let value = replace_env_placeholders(value);
    let path = match value.strip_prefix("~/") {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => PathBuf::from(&value),
        },
        None => PathBuf::from(&value),
    };

    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_replace_env_placeholders() {
        unsafe {
            env::set_var("QE_TEST_HOME", "/home/test");
            env::set_var("QE_TEST_CRAFT", "extrusion");
        }

        assert_eq!(replace_env_placeholders("${env:QE_TEST_HOME}"), "/home/test");
        assert_eq!(
            replace_env_placeholders("${env:QE_TEST_HOME}/profiles/${env:QE_TEST_CRAFT}"),
            "/home/test/profiles/extrusion"
        );
        assert_eq!(replace_env_placeholders("${env:QE_TEST_MISSING}"), "");
        assert_eq!(replace_env_placeholders("${other:x}"), "${other:x}");
        assert_eq!(replace_env_placeholders("plain"), "plain");
        assert_eq!(replace_env_placeholders(""), "");
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert_eq!(replace_env_placeholders("${env:QE_VAR"), "${env:QE_VAR");
        assert_eq!(replace_env_placeholders("a ${env:"), "a ${env:");
        assert_eq!(replace_env_placeholders("$$"), "$$");
    }

    #[test]
    fn test_expand_path() {
        unsafe {
            env::set_var("QE_TEST_ROOT", "/srv/sf");
        }
        let base = Path::new("/work");
        assert_eq!(expand_path("plugins", base), PathBuf::from("/work/plugins"));
        assert_eq!(
            expand_path("${env:QE_TEST_ROOT}/profiles", base),
            PathBuf::from("/srv/sf/profiles")
        );
        assert_eq!(expand_path("/abs", base), PathBuf::from("/abs"));
    }
}
