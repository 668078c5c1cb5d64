//! Contributor attribution for census entries.
//!
//! Attribution is a seam: the census asks a `ContributorSource` who touched
//! a line range and does not care how the answer is produced. The real
//! implementation shells out to `git blame`; environments without a
//! repository use `NoContributors`.

use identity::wire::Contributor;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

pub trait ContributorSource {
    fn contributors(&self, file: &Path, start_line: u32, end_line: u32) -> Vec<Contributor>;
}

/// Attribution disabled; every entry gets an empty contributor list.
pub struct NoContributors;

impl ContributorSource for NoContributors {
    fn contributors(&self, _file: &Path, _start_line: u32, _end_line: u32) -> Vec<Contributor> {
        Vec::new()
    }
}

/// Attribution via the `git` CLI, porcelain blame over the function's line
/// range. Failures degrade to an empty list with a warning; the census never
/// fails because blame did.
pub struct GitBlameSource {
    repo_root: PathBuf,
}

impl GitBlameSource {
    /// Locate the repository containing `dir`, or `None` when there is none
    /// (or no `git` on the path).
    pub fn discover(dir: &Path) -> Option<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(dir)
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let root = String::from_utf8(output.stdout).ok()?;
        Some(Self {
            repo_root: PathBuf::from(root.trim()),
        })
    }
}

impl ContributorSource for GitBlameSource {
    fn contributors(&self, file: &Path, start_line: u32, end_line: u32) -> Vec<Contributor> {
        let Ok(relative) = file.strip_prefix(&self.repo_root) else {
            return Vec::new();
        };

        let output = Command::new("git")
            .arg("blame")
            .arg("--porcelain")
            .arg("-L")
            .arg(format!("{start_line},{end_line}"))
            .arg("--")
            .arg(relative)
            .current_dir(&self.repo_root)
            .output();

        let output = match output {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                log::warn!(
                    "git blame failed for {}:{start_line}-{end_line}: {}",
                    file.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return Vec::new();
            }
            Err(e) => {
                log::warn!("git blame failed for {}: {e}", file.display());
                return Vec::new();
            }
        };

        parse_porcelain_authors(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract unique (author, email) pairs from porcelain blame output.
/// Porcelain emits `author <name>` followed by `author-mail <<email>>` per
/// commit header.
fn parse_porcelain_authors(blame: &str) -> Vec<Contributor> {
    let mut seen = HashSet::new();
    let mut contributors = Vec::new();
    let mut pending_name: Option<String> = None;

    for line in blame.lines() {
        if let Some(name) = line.strip_prefix("author ") {
            pending_name = Some(name.trim().to_string());
        } else if let Some(mail) = line.strip_prefix("author-mail ") {
            let email = mail.trim().trim_start_matches('<').trim_end_matches('>');
            if let Some(name) = pending_name.take() {
                let key = format!("{}:{}", name.to_lowercase(), email.to_lowercase());
                if seen.insert(key) {
                    contributors.push(Contributor {
                        name,
                        email: email.to_string(),
                    });
                }
            }
        }
    }

    contributors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porcelain_authors_are_deduped() {
        let blame = concat!(
            "abc123 1 1 2\n",
            "author Ada Lovelace\n",
            "author-mail <ada@example.com>\n",
            "author-time 1700000000\n",
            "\tconst x = 1;\n",
            "def456 2 2 1\n",
            "author Ada Lovelace\n",
            "author-mail <ada@example.com>\n",
            "\tconst y = 2;\n",
            "789abc 3 3 1\n",
            "author Grace Hopper\n",
            "author-mail <grace@example.com>\n",
            "\tconst z = 3;\n",
        );

        let contributors = parse_porcelain_authors(blame);
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0].name, "Ada Lovelace");
        assert_eq!(contributors[0].email, "ada@example.com");
        assert_eq!(contributors[1].name, "Grace Hopper");
    }

    #[test]
    fn dedup_is_case_insensitive() {
        let blame = concat!(
            "a 1 1 1\nauthor Ada\nauthor-mail <Ada@Example.com>\n\tx\n",
            "b 2 2 1\nauthor ada\nauthor-mail <ada@example.com>\n\ty\n",
        );
        assert_eq!(parse_porcelain_authors(blame).len(), 1);
    }

    #[test]
    fn no_contributors_is_always_empty() {
        let source = NoContributors;
        assert!(source.contributors(Path::new("lib/a.ts"), 1, 10).is_empty());
    }
}
