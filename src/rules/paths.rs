//! Lexical classification of filesystem targets.

use std::path::{Component, Path, PathBuf};

use crate::config::AnalyzerConfig;

/// Where a path points, ordered from harmless to catastrophic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Target {
    /// Strictly inside a configured safe root such as /tmp.
    SafeRoot,
    /// Inside the working directory.
    InsideCwd,
    /// Depends on variables or an unknown working directory.
    Unresolved,
    /// Escapes the working directory.
    OutsideCwd,
    /// Root, system directories or a home directory.
    Catastrophic,
}

const SYSTEM_DIRS: &[&str] = &[
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/home",
    "/lib",
    "/lib32",
    "/lib64",
    "/opt",
    "/proc",
    "/root",
    "/run",
    "/sbin",
    "/snap",
    "/srv",
    "/sys",
    "/usr",
    "/usr/bin",
    "/usr/lib",
    "/usr/local",
    "/usr/sbin",
    "/usr/share",
    "/var",
    "/var/lib",
    "/var/log",
    "/mnt",
    "/media",
    "/Users",
    "/System",
    "/Library",
    "/Applications",
    "/private",
    "/Volumes",
];

const HOME_PARENTS: &[&str] = &["/home", "/Users"];

const HOME_VARS: &[&str] = &["~", "$HOME", "${HOME}"];

/// Classify a path argument relative to the configured working directory.
pub fn classify_target(raw: &str, config: &AnalyzerConfig) -> Target {
    if is_home_reference(raw) {
        return Target::Catastrophic;
    }

    let expanded = match expand_home(raw) {
        Some(path) => path,
        None if raw.contains('$') || raw.contains('`') || raw.starts_with('~') => {
            return Target::Unresolved;
        }
        None => PathBuf::from(raw),
    };

    let path = if expanded.is_absolute() {
        normalize(&expanded)
    } else if let Some(cwd) = &config.cwd {
        normalize(&cwd.join(&expanded))
    } else {
        // No working directory: only lexical escapes are visible
        let relative = normalize(&expanded);
        return if relative.starts_with("..") {
            Target::OutsideCwd
        } else {
            Target::InsideCwd
        };
    };

    if is_catastrophic(&path) {
        return Target::Catastrophic;
    }

    let under_safe_root = config.safe_roots.iter().any(|root| {
        let root = normalize(root);
        path.starts_with(&root) && path != root
    });
    if under_safe_root {
        return Target::SafeRoot;
    }

    match &config.cwd {
        Some(cwd) if path.starts_with(normalize(cwd)) => Target::InsideCwd,
        Some(_) => Target::OutsideCwd,
        None => Target::Unresolved,
    }
}

/// `~`, `$HOME` or `${HOME}` on its own, optionally with `/`, `/.` or `/*`.
fn is_home_reference(raw: &str) -> bool {
    HOME_VARS.iter().any(|var| {
        raw.strip_prefix(var)
            .is_some_and(|rest| matches!(rest, "" | "/" | "/." | "/*" | "/.*"))
    })
}

/// Resolve a leading `~/` or `$HOME/` against the user's home directory.
fn expand_home(raw: &str) -> Option<PathBuf> {
    HOME_VARS.iter().find_map(|var| {
        let rest = raw.strip_prefix(var)?.strip_prefix('/')?;
        if rest.contains('$') || rest.contains('`') {
            return None;
        }
        dirs::home_dir().map(|home| home.join(rest))
    })
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push("/"),
            Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                let at_root = out.as_os_str() == "/";
                let empty_or_up = out.as_os_str().is_empty() || out.ends_with("..");
                if empty_or_up {
                    out.push("..");
                } else if !at_root {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Root, a system directory, a home directory, or a glob directly inside one.
pub fn is_catastrophic(path: &Path) -> bool {
    if path == Path::new("/") {
        return true;
    }
    if SYSTEM_DIRS.iter().any(|dir| path == Path::new(dir)) {
        return true;
    }
    if let Some(parent) = path.parent() {
        let is_home_dir = HOME_PARENTS.iter().any(|p| parent == Path::new(p));
        if is_home_dir {
            return true;
        }
        let is_glob = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains('*') || n.contains('?'));
        if is_glob && is_catastrophic(parent) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(cwd: &str) -> AnalyzerConfig {
        AnalyzerConfig::default().with_cwd(cwd)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_catastrophic_paths() {
        for path in ["/", "/etc", "/usr", "/home", "/home/alice", "/Users/bob", "/root", "/*", "/etc/*"] {
            assert!(is_catastrophic(Path::new(path)), "{path}");
        }
        for path in ["/home/alice/project", "/opt/app/cache", "/tmp/x"] {
            assert!(!is_catastrophic(Path::new(path)), "{path}");
        }
    }

    #[test]
    fn test_home_references() {
        let config = config_in("/work/project");
        for raw in ["~", "~/", "$HOME", "${HOME}/", "$HOME/*", "~/.*"] {
            assert_eq!(classify_target(raw, &config), Target::Catastrophic, "{raw}");
        }
    }

    #[test]
    fn test_relative_inside_cwd() {
        let config = config_in("/work/project");
        assert_eq!(classify_target("build", &config), Target::InsideCwd);
        assert_eq!(classify_target("./target/debug", &config), Target::InsideCwd);
        assert_eq!(classify_target("*", &config), Target::InsideCwd);
    }

    #[test]
    fn test_escapes_cwd() {
        let config = config_in("/work/project");
        assert_eq!(classify_target("../other", &config), Target::OutsideCwd);
        assert_eq!(classify_target("/opt/data", &config), Target::OutsideCwd);
    }

    #[test]
    fn test_traversal_to_root() {
        let config = config_in("/home/user/project");
        assert_eq!(classify_target("../../..", &config), Target::Catastrophic);
        assert_eq!(classify_target("..", &config), Target::Catastrophic);
    }

    #[test]
    fn test_safe_roots() {
        let config = config_in("/work/project");
        assert_eq!(classify_target("/tmp/cache", &config), Target::SafeRoot);
        assert_eq!(classify_target("/var/tmp/x/y", &config), Target::SafeRoot);
        // The root itself is not strictly inside
        assert_eq!(classify_target("/tmp", &config), Target::OutsideCwd);
        // Traversal out of a safe root is resolved first
        assert_eq!(classify_target("/tmp/../etc", &config), Target::Catastrophic);
    }

    #[test]
    fn test_variables_unresolved() {
        let config = config_in("/work/project");
        assert_eq!(classify_target("$BUILD_DIR", &config), Target::Unresolved);
        assert_eq!(classify_target("`pwd`/out", &config), Target::Unresolved);
        assert_eq!(classify_target("~alice/x", &config), Target::Unresolved);
    }

    #[test]
    fn test_without_cwd() {
        let config = AnalyzerConfig::default();
        assert_eq!(classify_target("./build", &config), Target::InsideCwd);
        assert_eq!(classify_target("../up", &config), Target::OutsideCwd);
        assert_eq!(classify_target("/opt/data", &config), Target::Unresolved);
        assert_eq!(classify_target("/tmp/x", &config), Target::SafeRoot);
        assert_eq!(classify_target("/", &config), Target::Catastrophic);
    }

    #[test]
    fn test_ordering() {
        assert!(Target::SafeRoot < Target::InsideCwd);
        assert!(Target::Unresolved < Target::OutsideCwd);
        assert!(Target::OutsideCwd < Target::Catastrophic);
    }
}
