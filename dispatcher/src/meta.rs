//! reproducibility metadata attached to every generated parameter file

use std::process::Command;
use tracing::warn;

/// timing, invocation and repository state captured once per dispatch
#[derive(Debug, Clone)]
pub struct RunMeta {
    /// process-start timestamp, `YYYY_MM_DD_HH_MM_SS`
    pub time_string: String,
    /// the command line this dispatch was invoked with
    pub command_line: String,
    /// code revision line, or a placeholder when git is unavailable
    pub commit_line: String,
    /// working-tree cleanliness line, or a placeholder
    pub status_line: String,
    /// free-text tag appended to generated identifiers
    pub tag: String,
}

impl RunMeta {
    /// capture metadata from the environment; git failures degrade to
    /// placeholder strings and never abort the dispatch
    pub fn collect(tag: String) -> Self {
        Self {
            time_string: chrono::Local::now().format("%Y_%m_%d_%H_%M_%S").to_string(),
            command_line: std::env::args().collect::<Vec<_>>().join(" "),
            commit_line: commit_line(),
            status_line: status_line(),
            tag,
        }
    }

    /// identifier of one run on the incrementally-named platforms
    pub fn run_id(&self, counter: u64) -> String {
        self.tagged(format!("{}_xp{counter:06}", self.time_string))
    }

    /// identifier of the shared master directory on the array platform
    pub fn array_id(&self) -> String {
        self.tagged(format!("array_{}", self.time_string))
    }

    fn tagged(&self, mut id: String) -> String {
        if !self.tag.is_empty() {
            id.push('_');
            id.push_str(&self.tag);
        }
        id
    }
}

fn commit_line() -> String {
    match Command::new("git").args(["rev-parse", "HEAD"]).output() {
        Ok(output) if output.status.success() => {
            let id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
            format!("git commit ID = {id}")
        }
        _ => {
            warn!("git commit ID not available");
            "git commit ID not available".to_owned()
        }
    }
}

fn status_line() -> String {
    match Command::new("git")
        .args(["status", "--porcelain", "-uno", "-z"])
        .output()
    {
        Ok(output) if output.status.success() => {
            let status = String::from_utf8_lossy(&output.stdout).replace('\0', " - ");
            if status.is_empty() {
                "All changes have been committed".to_owned()
            } else {
                format!("Changes not yet committed in the following files: {status}")
            }
        }
        _ => {
            warn!("git status not available");
            "Git status not available".to_owned()
        }
    }
}
