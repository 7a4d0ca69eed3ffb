//! Process listing parser.
//!
//! Parses `ps --no-headers -eo pid,ppid,stat,euser,cmd` output and
//! correlates lines by pid/ppid to locate the process family of a
//! Singularity job.
//!
//! Every slot is filled at most once, first match wins. A scan stops as soon
//! as all of its slots are filled. Listings normally arrive sorted by pid,
//! but correctness does not depend on it: records whose anchor had not been
//! seen yet are picked up on a further pass over the parsed records.

use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::{debug, warn};

/// One line of process listing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub ppid: u32,
    /// Everything after the ppid column, verbatim (stat, user, command)
    pub rest: String,
}

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(\d+)\s+(\d+)\s+(.*)$").expect("valid process line pattern"))
}

impl ProcessRecord {
    /// Parse one listing line. Returns None if the line does not start with
    /// two numeric columns followed by more text.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = line_pattern().captures(line)?;
        let pid = caps.get(1)?.as_str().parse().ok()?;
        let ppid = caps.get(2)?.as_str().parse().ok()?;
        let rest = caps.get(3)?.as_str().trim_end();
        if rest.is_empty() {
            return None;
        }
        Some(Self {
            pid,
            ppid,
            rest: rest.to_string(),
        })
    }
}

/// Parse a whole listing. Malformed lines are logged and skipped.
pub fn parse_listing(text: &str) -> Vec<ProcessRecord> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let record = ProcessRecord::parse(line);
            if record.is_none() {
                warn!(line, "skipping unrecognized process listing line");
            }
            record
        })
        .collect()
}

fn parse_remote_pid(remote_id: &str) -> Option<u32> {
    let pid = remote_id.trim().parse().ok();
    if pid.is_none() {
        warn!(remote_id, "remote job id is not a process id");
    }
    pid
}

/// Process family of a `singularity instance start` job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceTree {
    /// The instance daemon, whose command ends with `[<job uuid>]`
    pub instance: Option<ProcessRecord>,
    /// sinit, the process the job's remote id names
    pub sinit: Option<ProcessRecord>,
    /// The startscript, a child of sinit
    pub startscript: Option<ProcessRecord>,
    /// The application, a child of the startscript
    pub app: Option<ProcessRecord>,
}

impl InstanceTree {
    /// Correlate a listing against the job's remote id (the sinit pid) and uuid.
    pub fn scan(listing: &str, remote_id: &str, job_uuid: &str) -> Self {
        Self::scan_records(&parse_listing(listing), remote_id, job_uuid)
    }

    pub fn scan_records(records: &[ProcessRecord], remote_id: &str, job_uuid: &str) -> Self {
        let remote_pid = parse_remote_pid(remote_id);
        let tag = format!("[{}]", job_uuid);
        let mut tree = Self::default();
        scan_passes(
            records,
            &mut tree,
            |tree, record| tree.offer(record, remote_pid, &tag),
            Self::is_complete,
        );
        debug!(complete = tree.is_complete(), ?tree, "instance process scan");
        tree
    }

    fn offer(&mut self, record: &ProcessRecord, remote_pid: Option<u32>, tag: &str) -> bool {
        if self.holds(record.pid) {
            return false;
        }

        if self.instance.is_none() && record.rest.ends_with(tag) {
            self.instance = Some(record.clone());
        } else if self.sinit.is_none() && Some(record.pid) == remote_pid {
            self.sinit = Some(record.clone());
        } else if self.startscript.is_none() && Some(record.ppid) == remote_pid {
            self.startscript = Some(record.clone());
        } else if self.app.is_none() && Some(record.ppid) == self.startscript.as_ref().map(|s| s.pid) {
            self.app = Some(record.clone());
        } else {
            return false;
        }
        true
    }

    fn holds(&self, pid: u32) -> bool {
        [&self.instance, &self.sinit, &self.startscript, &self.app]
            .into_iter()
            .flatten()
            .any(|r| r.pid == pid)
    }

    pub fn is_complete(&self) -> bool {
        self.instance.is_some() && self.sinit.is_some() && self.startscript.is_some() && self.app.is_some()
    }
}

/// Process family of a `singularity run` job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTree {
    /// The process the job's remote id names
    pub parent: Option<ProcessRecord>,
    /// The runscript, a child of the parent
    pub runscript: Option<ProcessRecord>,
    /// The application, a child of the runscript
    pub app: Option<ProcessRecord>,
}

impl RunTree {
    pub fn scan(listing: &str, remote_id: &str) -> Self {
        Self::scan_records(&parse_listing(listing), remote_id)
    }

    pub fn scan_records(records: &[ProcessRecord], remote_id: &str) -> Self {
        let remote_pid = parse_remote_pid(remote_id);
        let mut tree = Self::default();
        scan_passes(
            records,
            &mut tree,
            |tree, record| tree.offer(record, remote_pid),
            Self::is_complete,
        );
        debug!(complete = tree.is_complete(), ?tree, "run process scan");
        tree
    }

    fn offer(&mut self, record: &ProcessRecord, remote_pid: Option<u32>) -> bool {
        if self.holds(record.pid) {
            return false;
        }

        if self.parent.is_none() && Some(record.pid) == remote_pid {
            self.parent = Some(record.clone());
        } else if self.runscript.is_none() && Some(record.ppid) == self.parent.as_ref().map(|p| p.pid) {
            self.runscript = Some(record.clone());
        } else if self.app.is_none() && Some(record.ppid) == self.runscript.as_ref().map(|r| r.pid) {
            self.app = Some(record.clone());
        } else {
            return false;
        }
        true
    }

    fn holds(&self, pid: u32) -> bool {
        [&self.parent, &self.runscript, &self.app]
            .into_iter()
            .flatten()
            .any(|r| r.pid == pid)
    }

    pub fn is_complete(&self) -> bool {
        self.parent.is_some() && self.runscript.is_some() && self.app.is_some()
    }
}

/// Offer every record in order, stopping at completeness. Repeat while a
/// pass still fills something.
fn scan_passes<T>(
    records: &[ProcessRecord],
    tree: &mut T,
    mut offer: impl FnMut(&mut T, &ProcessRecord) -> bool,
    complete: fn(&T) -> bool,
) {
    loop {
        let mut filled = false;
        for record in records {
            filled |= offer(tree, record);
            if complete(tree) {
                return;
            }
        }
        if !filled {
            return;
        }
    }
}
