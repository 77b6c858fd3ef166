//! Job Table
//!
//! Tracks backgrounded pipelines by positive integer ID and command name.
//! Reference syntax:
//! - `%N`: job with ID N
//! - `%name`: most recently added job whose command name equals `name`
//! - `%+`: most recent job, `%-`: the one before it
//!
//! IDs are recycled only after explicit removal (lowest free ID wins).
//! The table is mutated only from the shell's main execution context.

use std::fmt;

use chrono::{DateTime, Local};
use tokio::process::Child;

use crate::interpreter::errors::ShellError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width specifiers in job listings apply.
        f.pad(match self {
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Done => "Done",
        })
    }
}

#[derive(Debug)]
pub struct Job {
    pub id: u32,
    /// Display name: the first command of the backgrounded pipeline.
    pub command: String,
    pub pid: u32,
    pub state: JobState,
    pub started_at: DateTime<Local>,
    /// Live handles for every stage of the pipeline.
    children: Vec<Child>,
}

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    /// Job IDs in insertion order; the tail is `%+`.
    recency: Vec<u32>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a running job and return `(id, pid)`.
    pub fn add(&mut self, command: impl Into<String>, children: Vec<Child>) -> (u32, u32) {
        let id = self.lowest_free_id();
        let pid = children.first().and_then(|c| c.id()).unwrap_or(0);
        self.jobs.push(Job {
            id,
            command: command.into(),
            pid,
            state: JobState::Running,
            started_at: Local::now(),
            children,
        });
        self.recency.push(id);
        (id, pid)
    }

    fn lowest_free_id(&self) -> u32 {
        let mut id = 1;
        while self.jobs.iter().any(|j| j.id == id) {
            id += 1;
        }
        id
    }

    pub fn get(&self, id: u32) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Resolve a `%` reference to a job ID.
    pub fn resolve(&self, reference: &str) -> Result<u32, ShellError> {
        let spec = reference.strip_prefix('%').unwrap_or(reference);
        let not_found = || ShellError::NoSuchJob(reference.to_string());

        let id = match spec {
            "" | "+" => *self.recency.last().ok_or_else(not_found)?,
            "-" => {
                if self.recency.len() < 2 {
                    return Err(not_found());
                }
                self.recency[self.recency.len() - 2]
            }
            _ => {
                if let Ok(n) = spec.parse::<u32>() {
                    n
                } else {
                    // Most recently added job with a matching command name.
                    *self
                        .recency
                        .iter()
                        .rev()
                        .find(|id| {
                            self.get(**id)
                                .map(|j| j.command == spec)
                                .unwrap_or(false)
                        })
                        .ok_or_else(not_found)?
                }
            }
        };

        if self.get(id).is_some() {
            Ok(id)
        } else {
            Err(not_found())
        }
    }

    /// Reap finished children; a job whose stages have all exited moves to
    /// `Done`.
    pub fn harvest(&mut self) {
        for job in &mut self.jobs {
            if job.state != JobState::Running {
                continue;
            }
            let all_done = job
                .children
                .iter_mut()
                .all(|c| matches!(c.try_wait(), Ok(Some(_))));
            if all_done {
                job.state = JobState::Done;
            }
        }
    }

    /// Drop every `Done` job (after `jobs` has reported them once).
    pub fn prune_done(&mut self) {
        let done: Vec<u32> = self
            .jobs
            .iter()
            .filter(|j| j.state == JobState::Done)
            .map(|j| j.id)
            .collect();
        for id in done {
            self.remove(id);
        }
    }

    /// Remove a job without signaling it (`disown`). The child handles are
    /// dropped, leaving the processes running.
    pub fn remove(&mut self, id: u32) -> Option<Job> {
        let pos = self.jobs.iter().position(|j| j.id == id)?;
        self.recency.retain(|r| *r != id);
        Some(self.jobs.remove(pos))
    }

    /// Wait for every stage of a job to exit (`fg`); removes the job and
    /// returns the last stage's exit code.
    pub async fn wait(&mut self, id: u32) -> Result<i32, ShellError> {
        let mut job = self
            .remove(id)
            .ok_or_else(|| ShellError::NoSuchJob(format!("%{}", id)))?;
        let mut exit_code = 0;
        for child in &mut job.children {
            let status = child.wait().await?;
            exit_code = status.code().unwrap_or(-1);
        }
        Ok(exit_code)
    }

    /// Send termination to a job's processes (`kill %ref`).
    pub fn kill(&mut self, id: u32) -> Result<(), ShellError> {
        let job = self
            .get_mut(id)
            .ok_or_else(|| ShellError::NoSuchJob(format!("%{}", id)))?;

        #[cfg(unix)]
        {
            // Backgrounded children run in their own sessions, so their
            // process group ID equals their PID.
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;
            for child in &job.children {
                if let Some(pid) = child.id() {
                    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM);
                }
            }
        }
        for child in &mut job.children {
            let _ = child.start_kill();
        }
        Ok(())
    }

    /// Resume a stopped job in the background (`bg %ref`).
    pub fn resume(&mut self, id: u32) -> Result<(), ShellError> {
        let job = self
            .get_mut(id)
            .ok_or_else(|| ShellError::NoSuchJob(format!("%{}", id)))?;

        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;
            for child in &job.children {
                if let Some(pid) = child.id() {
                    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGCONT);
                }
            }
        }

        job.state = JobState::Running;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(names: &[&str]) -> JobTable {
        let mut table = JobTable::new();
        for name in names {
            table.add(name.to_string(), Vec::new());
        }
        table
    }

    #[test]
    fn test_ids_are_monotonic() {
        let table = table_with(&["a", "b", "c"]);
        let ids: Vec<u32> = table.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_id_recycled_after_removal() {
        let mut table = table_with(&["a", "b", "c"]);
        table.remove(2);
        let (id, _) = table.add("d", Vec::new());
        assert_eq!(id, 2);
    }

    #[test]
    fn test_resolve_by_id() {
        let table = table_with(&["a", "b"]);
        assert_eq!(table.resolve("%2").unwrap(), 2);
        assert_eq!(table.resolve("1").unwrap(), 1);
    }

    #[test]
    fn test_resolve_by_name_most_recent() {
        let mut table = JobTable::new();
        table.add("sleep", Vec::new());
        table.add("cat", Vec::new());
        table.add("sleep", Vec::new());
        assert_eq!(table.resolve("%sleep").unwrap(), 3);
    }

    #[test]
    fn test_resolve_plus_and_minus() {
        let table = table_with(&["a", "b", "c"]);
        assert_eq!(table.resolve("%+").unwrap(), 3);
        assert_eq!(table.resolve("%-").unwrap(), 2);
    }

    #[test]
    fn test_resolve_plus_tracks_removal() {
        let mut table = table_with(&["a", "b", "c"]);
        table.remove(3);
        assert_eq!(table.resolve("%+").unwrap(), 2);
        assert_eq!(table.resolve("%-").unwrap(), 1);
    }

    #[test]
    fn test_resolve_missing() {
        let table = table_with(&["a"]);
        assert!(matches!(
            table.resolve("%9"),
            Err(ShellError::NoSuchJob(_))
        ));
        assert!(matches!(
            table.resolve("%nope"),
            Err(ShellError::NoSuchJob(_))
        ));
    }

    #[test]
    fn test_resolve_minus_needs_two_jobs() {
        let table = table_with(&["only"]);
        assert!(matches!(
            table.resolve("%-"),
            Err(ShellError::NoSuchJob(_))
        ));
    }

    #[test]
    fn test_remove_returns_job() {
        let mut table = table_with(&["a"]);
        let job = table.remove(1).unwrap();
        assert_eq!(job.command, "a");
        assert!(table.is_empty());
        assert!(table.resolve("%+").is_err());
    }

    #[test]
    fn test_harvest_marks_childless_job_done() {
        // A job with no live children counts as fully exited.
        let mut table = table_with(&["a"]);
        table.harvest();
        assert_eq!(table.get(1).unwrap().state, JobState::Done);
        table.prune_done();
        assert!(table.is_empty());
    }
}
