//! Candidate discovery.
//!
//! Walking and filtering are separate steps: [`walk_dirs`] yields every
//! directory under the roots, [`is_candidate`] and [`matches_includes`]
//! decide which of them qualify, and [`scan`] strings them together.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use mored_schema::{DESCRIPTOR_FILE, KIT_ENTRY, PackageKind};
use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

static SUITE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^suite(\.\w+)?$").expect("static regex"));

/// Errors that abort a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A root or one of its subdirectories could not be read.
    #[error("scan failed under {}: {source}", root.display())]
    Walk {
        /// The root being walked.
        root: PathBuf,
        /// Underlying error.
        source: walkdir::Error,
    },

    /// Nothing under the roots qualified.
    #[error("no buildable {0}s found")]
    NoCandidates(PackageKind),
}

/// A directory that looks like a package of some kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Kind of package the directory holds.
    pub kind: PackageKind,
    /// The package directory.
    pub dir: PathBuf,
}

impl Candidate {
    /// The directory's own name, used for include filtering and messages.
    pub fn dir_name(&self) -> String {
        dir_name(&self.dir)
    }
}

fn dir_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(dir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Every directory under `roots`, depth first in file-name order.
///
/// Directories in `skip` are neither yielded nor descended into. The
/// iterator borrows nothing from the filesystem between calls, so calling
/// this again restarts the walk.
pub fn walk_dirs<'a>(
    roots: &'a [PathBuf],
    skip: &'a [PathBuf],
) -> impl Iterator<Item = Result<PathBuf, ScanError>> + 'a {
    let skip: Vec<PathBuf> = skip.iter().filter_map(|p| p.canonicalize().ok()).collect();
    roots.iter().flat_map(move |root| {
        let skip = skip.clone();
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                !e.file_type().is_dir()
                    || e.path()
                        .canonicalize()
                        .map_or(true, |p| !skip.contains(&p))
            })
            .filter_map(move |entry| match entry {
                Ok(e) if e.file_type().is_dir() => Some(Ok(e.into_path())),
                Ok(_) => None,
                Err(source) => Some(Err(ScanError::Walk {
                    root: root.clone(),
                    source,
                })),
            })
    })
}

/// True if `dir` holds a descriptor and the entry point for `kind`.
///
/// Kits need `kit.sh`; suites need a file named `suite` or `suite.<ext>`.
pub fn is_candidate(kind: PackageKind, dir: &Path) -> bool {
    if !dir.join(DESCRIPTOR_FILE).is_file() {
        return false;
    }
    match kind {
        PackageKind::Kit => dir.join(KIT_ENTRY).exists(),
        PackageKind::Suite => has_suite_entry(dir),
    }
}

fn has_suite_entry(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(Result::ok).any(|e| {
        e.file_type().is_ok_and(|t| t.is_file())
            && SUITE_ENTRY.is_match(&e.file_name().to_string_lossy())
    })
}

/// True if `includes` is empty or `name` contains one of them.
pub fn matches_includes(name: &str, includes: &[String]) -> bool {
    includes.is_empty() || includes.iter().any(|i| name.contains(i.as_str()))
}

/// Find every `kind` candidate under `roots`, in walk order.
///
/// # Errors
///
/// Returns [`ScanError::Walk`] if any directory cannot be read and
/// [`ScanError::NoCandidates`] if nothing qualifies.
pub fn scan(
    kind: PackageKind,
    roots: &[PathBuf],
    includes: &[String],
    skip: &[PathBuf],
) -> Result<Vec<Candidate>, ScanError> {
    let mut found = Vec::new();
    for dir in walk_dirs(roots, skip) {
        let dir = dir?;
        if is_candidate(kind, &dir) && matches_includes(&dir_name(&dir), includes) {
            tracing::debug!(dir = %dir.display(), %kind, "found candidate");
            found.push(Candidate { kind, dir });
        }
    }
    if found.is_empty() {
        return Err(ScanError::NoCandidates(kind));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn kit(root: &Path, name: &str, with_entry: bool) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DESCRIPTOR_FILE), format!("name: {name}\nversion: 1.0.0\n")).unwrap();
        if with_entry {
            fs::write(dir.join(KIT_ENTRY), "#!/bin/sh\n").unwrap();
        }
        dir
    }

    #[test]
    fn kit_requires_entry_script() {
        let tmp = tempdir().unwrap();
        let a = kit(tmp.path(), "a", true);
        kit(tmp.path(), "b", false);

        let found = scan(PackageKind::Kit, &[tmp.path().to_path_buf()], &[], &[]).unwrap();
        assert_eq!(found, vec![Candidate { kind: PackageKind::Kit, dir: a }]);
    }

    #[test]
    fn suite_entry_pattern() {
        let tmp = tempdir().unwrap();
        for (name, entry, expected) in [
            ("plain", "suite", true),
            ("py", "suite.py", true),
            ("jar", "suite.jar", true),
            ("double", "suite.tar.gz", false),
            ("prefixed", "mysuite", false),
        ] {
            let dir = kit(tmp.path(), name, false);
            fs::write(dir.join(entry), "").unwrap();
            assert_eq!(is_candidate(PackageKind::Suite, &dir), expected, "{entry}");
        }
    }

    #[test]
    fn descriptor_is_required() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join(KIT_ENTRY), "").unwrap();
        assert!(!is_candidate(PackageKind::Kit, tmp.path()));
    }

    #[test]
    fn include_filters_match_substrings_once() {
        assert!(matches_includes("logging", &[]));
        assert!(matches_includes("logging", &["log".to_string()]));
        assert!(!matches_includes("colors", &["log".to_string()]));

        let tmp = tempdir().unwrap();
        kit(tmp.path(), "logging", true);
        kit(tmp.path(), "colors", true);
        let includes = vec!["log".to_string(), "ging".to_string()];
        let found = scan(PackageKind::Kit, &[tmp.path().to_path_buf()], &includes, &[]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dir_name(), "logging");
    }

    #[test]
    fn skipped_directories_are_not_descended() {
        let tmp = tempdir().unwrap();
        kit(tmp.path(), "a", true);
        let dist = tmp.path().join("dist");
        kit(&dist, "stale", true);

        let found = scan(
            PackageKind::Kit,
            &[tmp.path().to_path_buf()],
            &[],
            std::slice::from_ref(&dist),
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].dir_name(), "a");
    }

    #[test]
    fn nested_candidates_in_walk_order() {
        let tmp = tempdir().unwrap();
        kit(tmp.path(), "b", true);
        kit(&tmp.path().join("a"), "inner", true);
        let found = scan(PackageKind::Kit, &[tmp.path().to_path_buf()], &[], &[]).unwrap();
        let names: Vec<_> = found.iter().map(Candidate::dir_name).collect();
        assert_eq!(names, ["inner", "b"]);
    }

    #[test]
    fn empty_tree_has_no_candidates() {
        let tmp = tempdir().unwrap();
        let err = scan(PackageKind::Suite, &[tmp.path().to_path_buf()], &[], &[]).unwrap_err();
        assert!(matches!(err, ScanError::NoCandidates(PackageKind::Suite)));
        assert_eq!(err.to_string(), "no buildable suites found");
    }

    #[test]
    fn walk_is_restartable() {
        let tmp = tempdir().unwrap();
        kit(tmp.path(), "a", true);
        let roots = [tmp.path().to_path_buf()];
        let first: Vec<_> = walk_dirs(&roots, &[]).map(Result::unwrap).collect();
        let second: Vec<_> = walk_dirs(&roots, &[]).map(Result::unwrap).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
