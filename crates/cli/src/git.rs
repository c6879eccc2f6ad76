use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Diff text and the revision range it was produced from.
pub struct BranchDiff {
    pub range: String,
    pub text: String,
}

pub fn current_branch(root: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["branch", "--show-current"])
        .current_dir(root)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() { None } else { Some(branch) }
}

/// Revision range for `base`. Pull-request builds on GitHub Actions and
/// `--merge-base` compare from the merge base up to HEAD.
pub fn revision_range(base: &str, merge_base: bool, pull_request: bool) -> String {
    if merge_base || pull_request {
        format!("{}...HEAD", base)
    } else {
        base.to_string()
    }
}

fn run_diff(root: &Path, range: &str) -> Result<String, String> {
    debug!("git diff -U0 {}", range);
    let output = Command::new("git")
        .args(["diff", "-U0", "--no-color", "--no-ext-diff", "--relative", range])
        .current_dir(root)
        .output()
        .map_err(|e| format!("failed to run git: {}", e))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

/// Zero-context diff of the working tree against `origin/<base>`, falling
/// back to the local `<base>` when the remote ref is missing.
pub fn diff_against(
    root: &Path,
    base: &str,
    merge_base: bool,
) -> Result<BranchDiff, Box<dyn std::error::Error>> {
    let pull_request = std::env::var("GITHUB_EVENT_NAME")
        .map(|v| v == "pull_request")
        .unwrap_or(false);

    let remote = revision_range(&format!("origin/{}", base), merge_base, pull_request);
    match run_diff(root, &remote) {
        Ok(text) => return Ok(BranchDiff { range: remote, text }),
        Err(e) => warn!("git diff against {} failed: {}", remote, e),
    }

    let local = revision_range(base, merge_base, pull_request);
    let text = run_diff(root, &local)
        .map_err(|e| format!("git diff against {} failed: {}", local, e))?;
    Ok(BranchDiff { range: local, text })
}
