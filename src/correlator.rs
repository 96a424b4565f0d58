// src/correlator.rs

//! Pre/post transaction correlation
//!
//! The pre hook snapshots the system and records what it knows about the
//! coming transaction. The post hook, running in a later process, reads that
//! record back, works out what actually happened and creates the matching
//! post snapshot.
//!
//! When APT stages package archives the transaction is an install and the
//! archive names say everything. Otherwise (removals, purges) nothing is
//! known up front, so pre stores the full list of installed packages and post
//! diffs it against the list at that point.

use crate::apt::{self, PackageManager};
use crate::config::Config;
use crate::description;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::snapper::Snapper;
use crate::store::{ActionKind, CorrelationRecord, CorrelationStore};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

const BEFORE: &str = "Before";
const AFTER: &str = "After";

/// Which side of the transaction this invocation runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Phase {
    /// Before dpkg runs; staged package files arrive on stdin
    Pre,
    /// After dpkg has finished
    Post,
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pre" => Ok(Phase::Pre),
            "post" => Ok(Phase::Post),
            other => Err(Error::InvalidPhase(other.to_string())),
        }
    }
}

/// What a hook invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Pre snapshot created and recorded
    PreCreated {
        pre_snapshot_id: String,
        action_kind: ActionKind,
    },
    /// Post snapshot created and linked to its pre snapshot
    PostCreated {
        pre_snapshot_id: String,
        post_snapshot_id: String,
        action_kind: ActionKind,
    },
    /// Pre ran again while a record was pending; nothing was done
    AlreadyPending { pre_snapshot_id: Option<String> },
    /// Post ran with no pending record; nothing was done
    NothingPending,
}

impl Outcome {
    /// Whether the invocation was skipped as a duplicate
    pub fn is_noop(&self) -> bool {
        matches!(self, Outcome::AlreadyPending { .. } | Outcome::NothingPending)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::PreCreated { pre_snapshot_id, .. } => {
                write!(f, "Successfully created pre APT snapshot with ID {}", pre_snapshot_id)
            }
            Outcome::PostCreated {
                pre_snapshot_id,
                post_snapshot_id,
                ..
            } => write!(
                f,
                "Successfully created post APT snapshot with ID {} in reference to pre snapshot {}",
                post_snapshot_id, pre_snapshot_id
            ),
            Outcome::AlreadyPending {
                pre_snapshot_id: Some(id),
            } => write!(f, "Pre APT snapshot {} is still pending, skipping duplicate pre hook", id),
            Outcome::AlreadyPending { pre_snapshot_id: None } => {
                write!(f, "A pre APT snapshot is still pending, skipping duplicate pre hook")
            }
            Outcome::NothingPending => write!(f, "No pending pre APT snapshot, skipping duplicate post hook"),
        }
    }
}

/// Runs the pre and post hooks against one store and one set of tools
pub struct Correlator<'a, R: CommandRunner + ?Sized> {
    config: &'a Config,
    runner: &'a R,
    store: CorrelationStore,
}

impl<'a, R: CommandRunner + ?Sized> Correlator<'a, R> {
    pub fn new(config: &'a Config, runner: &'a R) -> Self {
        Self {
            config,
            runner,
            store: CorrelationStore::new(&config.record_path),
        }
    }

    pub fn store(&self) -> &CorrelationStore {
        &self.store
    }

    /// Dispatch on `phase`; `package_lines` is only read by pre
    pub fn handle<S: AsRef<str>>(&self, phase: Phase, package_lines: &[S]) -> Result<Outcome> {
        match phase {
            Phase::Pre => self.handle_pre(package_lines),
            Phase::Post => self.handle_post(),
        }
    }

    /// Create the pre snapshot and record it for the post hook
    ///
    /// `package_lines` are the archive paths APT writes to the hook's stdin;
    /// an empty list means the transaction installs nothing.
    pub fn handle_pre<S: AsRef<str>>(&self, package_lines: &[S]) -> Result<Outcome> {
        if self.store.exists() {
            let pending = match self.store.peek() {
                Ok(record) => Some(record.pre_snapshot_id),
                Err(e) => {
                    warn!("Pending record is unreadable: {}", e);
                    None
                }
            };
            warn!(
                "Correlation record {} already exists (pre snapshot {:?}), not taking another pre snapshot",
                self.store.path().display(),
                pending
            );
            return Ok(Outcome::AlreadyPending {
                pre_snapshot_id: pending,
            });
        }

        let packages = PackageManager::new(self.runner, self.config);
        let names = apt::package_names(package_lines);

        let mut record = if names.is_empty() {
            let installed = packages.installed_packages()?;
            let mut record = CorrelationRecord::new(String::new(), ActionKind::Unknown, installed);
            record.invocation = packages.running_invocation();
            record
        } else {
            CorrelationRecord::new(String::new(), ActionKind::Install, names)
        };
        debug!(
            "Pre hook classified transaction as {} with {} packages",
            record.action_kind,
            record.package_set.len()
        );

        let description = self.pre_description(&record);
        record.pre_snapshot_id = Snapper::new(self.runner, self.config).create_pre(&description)?;
        self.store.save(&record)?;

        Ok(Outcome::PreCreated {
            pre_snapshot_id: record.pre_snapshot_id,
            action_kind: record.action_kind,
        })
    }

    /// Resolve the pending record and create the matching post snapshot
    pub fn handle_post(&self) -> Result<Outcome> {
        let Some(mut record) = self.store.take()? else {
            warn!(
                "No correlation record at {}, ignoring post hook",
                self.store.path().display()
            );
            return Ok(Outcome::NothingPending);
        };
        info!(
            "Loaded pre snapshot {} ({}) recorded at {}",
            record.pre_snapshot_id, record.action_kind, record.created_at
        );

        let snapper = Snapper::new(self.runner, self.config);

        if record.action_kind == ActionKind::Unknown {
            let current = PackageManager::new(self.runner, self.config).installed_packages()?;
            record.package_set = apt::removed_packages(&record.package_set, &current);
            record.action_kind = ActionKind::Remove;
            info!("Resolved transaction as removal of {} packages", record.package_set.len());

            let before = self.describe(BEFORE, &record);
            snapper.modify_description(&record.pre_snapshot_id, &before)?;
        }

        let after = self.describe(AFTER, &record);
        let post_snapshot_id = snapper.create_post(&record.pre_snapshot_id, &after)?;

        Ok(Outcome::PostCreated {
            pre_snapshot_id: record.pre_snapshot_id,
            post_snapshot_id,
            action_kind: record.action_kind,
        })
    }

    fn describe(&self, prefix: &str, record: &CorrelationRecord) -> String {
        description::format_bounded(
            prefix,
            record.action_kind.as_str(),
            &record.package_set,
            self.config.description_limit,
        )
    }

    /// Description for the pre snapshot
    ///
    /// An unknown transaction only gets a placeholder, replaced by post once
    /// the removed packages are known.
    fn pre_description(&self, record: &CorrelationRecord) -> String {
        match (record.action_kind, record.invocation.as_deref()) {
            (ActionKind::Unknown, Some(invocation)) => description::truncate(
                &format!("{}: {}", BEFORE, invocation),
                self.config.description_limit,
            ),
            (ActionKind::Unknown, None) => format!("{}: Unknown invocation", BEFORE),
            _ => self.describe(BEFORE, record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandOutput;
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// Answers snapper with increasing numbers and dpkg-query with a fixed list
    struct FakeTools {
        installed: RefCell<Vec<&'static str>>,
        next_snapshot: RefCell<u32>,
        snapper_calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeTools {
        fn new(installed: &[&'static str]) -> Self {
            Self {
                installed: RefCell::new(installed.to_vec()),
                next_snapshot: RefCell::new(10),
                snapper_calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FakeTools {
        fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
            let stdout = match program {
                "snapper" => {
                    self.snapper_calls
                        .borrow_mut()
                        .push(args.iter().map(|a| a.to_string()).collect());
                    if args.contains(&"create") {
                        let mut next = self.next_snapshot.borrow_mut();
                        *next += 1;
                        format!("{}\n", next)
                    } else {
                        String::new()
                    }
                }
                "dpkg-query" => self
                    .installed
                    .borrow()
                    .iter()
                    .map(|name| format!("installed {}\n", name))
                    .collect(),
                _ => String::new(),
            };
            Ok(CommandOutput {
                stdout,
                stderr: String::new(),
                status: Some(0),
            })
        }
    }

    #[test]
    fn test_phase_parsing() {
        assert_eq!("pre".parse::<Phase>().unwrap(), Phase::Pre);
        assert_eq!("post".parse::<Phase>().unwrap(), Phase::Post);
        let err = "during".parse::<Phase>().unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_install_pre_description() {
        let dir = tempdir().unwrap();
        let config = Config::in_dir(dir.path());
        let tools = FakeTools::new(&[]);
        let correlator = Correlator::new(&config, &tools);

        let outcome = correlator.handle_pre(&["/tmp/foo_1.0_amd64.deb"]).unwrap();
        assert_eq!(
            outcome,
            Outcome::PreCreated {
                pre_snapshot_id: "11".to_string(),
                action_kind: ActionKind::Install,
            }
        );
        assert_eq!(tools.snapper_calls.borrow()[0].last().unwrap(), "Before: Install foo");
    }

    #[test]
    fn test_unknown_pre_uses_placeholder() {
        let dir = tempdir().unwrap();
        let config = Config::in_dir(dir.path());
        let tools = FakeTools::new(&["bash", "qux"]);
        let correlator = Correlator::new(&config, &tools);

        let lines: [&str; 0] = [];
        correlator.handle_pre(&lines).unwrap();

        assert_eq!(
            tools.snapper_calls.borrow()[0].last().unwrap(),
            "Before: Unknown invocation"
        );
        let record = correlator.store().peek().unwrap();
        assert_eq!(record.action_kind, ActionKind::Unknown);
        assert_eq!(record.package_set, vec!["bash", "qux"]);
    }

    #[test]
    fn test_invocation_placeholder_is_truncated() {
        let config = Config::in_dir("/tmp");
        let tools = FakeTools::new(&[]);
        let correlator = Correlator::new(&config, &tools);

        let mut record = CorrelationRecord::new("1".to_string(), ActionKind::Unknown, Vec::new());
        record.invocation = Some(format!("apt remove {}", "x".repeat(100)));

        let desc = correlator.pre_description(&record);
        assert_eq!(desc.chars().count(), config.description_limit);
        assert!(desc.starts_with("Before: apt remove x"));
        assert!(desc.ends_with("..."));
    }

    #[test]
    fn test_empty_removal_describes_zero_packages() {
        let dir = tempdir().unwrap();
        let config = Config::in_dir(dir.path());
        let tools = FakeTools::new(&["bash"]);
        let correlator = Correlator::new(&config, &tools);

        let lines: [&str; 0] = [];
        correlator.handle_pre(&lines).unwrap();
        let outcome = correlator.handle_post().unwrap();

        assert!(matches!(
            outcome,
            Outcome::PostCreated {
                action_kind: ActionKind::Remove,
                ..
            }
        ));
        let calls = tools.snapper_calls.borrow();
        assert_eq!(calls[1].last().unwrap(), "11");
        assert!(calls[1].contains(&"Before: Remove 0 packages".to_string()));
        assert_eq!(calls[2].last().unwrap(), "After: Remove 0 packages");
    }

    #[test]
    fn test_outcome_messages() {
        let outcome = Outcome::PostCreated {
            pre_snapshot_id: "11".to_string(),
            post_snapshot_id: "12".to_string(),
            action_kind: ActionKind::Install,
        };
        assert_eq!(
            outcome.to_string(),
            "Successfully created post APT snapshot with ID 12 in reference to pre snapshot 11"
        );
        assert!(!outcome.is_noop());
        assert!(Outcome::NothingPending.is_noop());
    }
}
