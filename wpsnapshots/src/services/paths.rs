// File: wpsnapshots/src/services/paths.rs
use std::path::PathBuf;

const ROOT: &str = "/";

/// Normalize a user-supplied path against the process working directory and
/// the current user's home directory.
///
/// The result is absolute whenever the input was relative to `.` or `~`, and
/// always ends with exactly one `/` (the root path stays `/`).
pub fn normalize(path: &str) -> String {
    let cwd = std::env::current_dir()
        .map(|dir| dir.to_string_lossy().to_string())
        .unwrap_or_else(|_| ".".to_string());
    let home = home_dir()
        .map(|dir| dir.to_string_lossy().to_string())
        .unwrap_or_else(|| "~".to_string());
    normalize_with(path, &cwd, &home)
}

/// Same as [`normalize`] with explicit working and home directories.
pub fn normalize_with(path: &str, cwd: &str, home: &str) -> String {
    let mut path = path.trim().to_string();
    if path == ROOT {
        return path;
    }

    if !path.starts_with(['.', '/', '~']) {
        path = format!("./{}", path);
    }
    if path == "." {
        path = "./".to_string();
    }

    if let Some(rest) = path.strip_prefix("./") {
        path = join(cwd, rest);
    } else if let Some(rest) = path.strip_prefix('~') {
        // only the `~` itself is replaced, so `~site` becomes `{home}site`
        path = match rest.strip_prefix('/') {
            Some(rest) => join(home, rest.trim_start_matches('/')),
            None => format!("{}{}", home.trim_end_matches('/'), rest),
        };
        if !path.starts_with('/') && home.starts_with('/') {
            path = format!("/{}", path);
        }
    }

    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return ROOT.to_string();
    }
    format!("{}/", trimmed)
}

pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

fn join(base: &str, rest: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CWD: &str = "/srv/site";
    const HOME: &str = "/home/deploy";

    #[rstest]
    #[case("/", "/")]
    #[case("  /  ", "/")]
    #[case("wp-content", "/srv/site/wp-content/")]
    #[case("./wp-content", "/srv/site/wp-content/")]
    #[case(".", "/srv/site/")]
    #[case("./", "/srv/site/")]
    #[case("", "/srv/site/")]
    #[case("~", "/home/deploy/")]
    #[case("~/sites/blog", "/home/deploy/sites/blog/")]
    #[case("~site", "/home/deploysite/")]
    #[case("~~", "/home/deploy~/")]
    #[case("/var/www/html", "/var/www/html/")]
    #[case("/var/www/html//", "/var/www/html/")]
    #[case("../shared", "../shared/")]
    #[case("//", "/")]
    fn test_normalize_rules(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_with(input, CWD, HOME), expected);
    }

    #[rstest]
    #[case("/")]
    #[case("relative/dir")]
    #[case("./a/b/")]
    #[case(".")]
    #[case("~")]
    #[case("~/x")]
    #[case("~site")]
    #[case("../up")]
    #[case(".hidden")]
    #[case("/abs///")]
    #[case("   spaced  ")]
    fn test_normalize_is_idempotent(#[case] input: &str) {
        let once = normalize_with(input, CWD, HOME);
        let twice = normalize_with(&once, CWD, HOME);
        assert_eq!(once, twice);
        if once != "/" {
            assert!(once.ends_with('/'));
            assert!(!once.ends_with("//"));
        }
    }

    #[test]
    fn test_root_cwd_does_not_double_slash() {
        assert_eq!(normalize_with("site", "/", HOME), "/site/");
    }

    #[test]
    fn test_tilde_with_root_home_stays_absolute() {
        assert_eq!(normalize_with("~site", CWD, "/"), "/site/");
        assert_eq!(normalize_with("~/site", CWD, "/"), "/site/");
    }

    #[test]
    fn test_normalize_uses_process_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let expected = format!("{}/nested/", cwd.to_string_lossy().trim_end_matches('/'));
        assert_eq!(normalize("nested"), expected);
    }
}
