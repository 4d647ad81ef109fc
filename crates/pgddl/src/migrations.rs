//! Migration directories and replay.
//!
//! A migrations directory holds versioned SQL files:
//! - `V1__init.sql` (up)
//! - `V2__add_users.up.sql` (up)
//! - `V2__add_users.down.sql` (down, never replayed)
//!
//! Replaying feeds every up migration, in version order, through a [`Simulator`].
//!
//! # Example
//!
//! ```ignore
//! use pgddl::{ReplayOptions, Simulator, migrations};
//!
//! let mut sim = Simulator::new();
//! let report = migrations::replay_dir(&mut sim, "./migrations", ReplayOptions::default())?;
//! println!("{} migrations, {} tables", report.applied.len(), sim.tables().len());
//! # Ok::<(), pgddl::SimError>(())
//! ```

use crate::error::{SimError, SimResult};
use crate::script::split_statements;
use crate::simulator::Simulator;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// An up migration on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskMigration {
    pub version: i64,
    pub name: String,
    pub path: PathBuf,
}

impl DiskMigration {
    /// `V{version}__{name}`, independent of the `.up.sql` / `.sql` spelling on disk.
    pub fn canonical_name(&self) -> String {
        format!("V{}__{}", self.version, self.name)
    }
}

/// `(version, name, is_down)` for a `V{version}__{name}[.up|.down].sql` file name.
fn parse_file_name(file_name: &str) -> Option<(i64, &str, bool)> {
    let rest = file_name.strip_prefix('V')?;
    let (stem, down) = match rest.strip_suffix(".down.sql") {
        Some(stem) => (stem, true),
        None => (
            rest.strip_suffix(".up.sql")
                .or_else(|| rest.strip_suffix(".sql"))?,
            false,
        ),
    };
    let (version, name) = stem.split_once("__")?;
    let version = version.parse::<i64>().ok().filter(|v| *v > 0)?;
    (!name.is_empty()).then_some((version, name, down))
}

/// Up migrations of `dir`, sorted by version.
///
/// Down files are never replayed and are skipped, as is anything not named
/// `V{version}__{name}.sql`. Two up files for one version are an error.
pub fn scan_migrations_dir(dir: impl AsRef<Path>) -> SimResult<Vec<DiskMigration>> {
    let dir = dir.as_ref();
    let io_err = |e: std::io::Error| {
        SimError::Io(format!("failed to read migrations dir {}: {e}", dir.display()))
    };

    let mut by_version: BTreeMap<i64, DiskMigration> = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let parsed = match parse_file_name(file_name) {
            Some(parsed) if path.is_file() => parsed,
            _ => {
                tracing::debug!(file = %file_name, "not a migration file, ignoring");
                continue;
            }
        };
        let (version, name, down) = parsed;
        if down {
            continue;
        }

        if let Some(existing) = by_version.get(&version) {
            return Err(SimError::Io(format!(
                "two up migrations for version {version}: {} and {}",
                existing.path.display(),
                path.display()
            )));
        }
        let name = name.to_string();
        by_version.insert(version, DiskMigration { version, name, path });
    }

    Ok(by_version.into_values().collect())
}

/// Replay settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Stop after this version (inclusive). `None` replays everything.
    pub target_version: Option<i64>,
    /// Skip statements outside the supported DDL forms instead of failing.
    pub skip_unsupported: bool,
}

/// A statement skipped because it is not a supported DDL form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStatement {
    pub source: String,
    pub line: usize,
    pub head: String,
}

/// What a replay did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Sources replayed, in order (canonical migration names or file names).
    pub applied: Vec<String>,
    /// Statements applied to the schema.
    pub statements: usize,
    pub skipped: Vec<SkippedStatement>,
}

/// Replay one script. `source` names it in errors and in the report.
pub fn replay_sql(
    sim: &mut Simulator,
    source: &str,
    sql: &str,
    opts: ReplayOptions,
    report: &mut ReplayReport,
) -> SimResult<()> {
    let in_file = |e: SimError| SimError::InFile {
        file: source.to_string(),
        source: Box::new(e),
    };

    for stmt in split_statements(sql).map_err(in_file)? {
        match sim.simulate_query(&stmt.sql) {
            Ok(()) => report.statements += 1,
            Err(SimError::UnsupportedStatement(head)) if opts.skip_unsupported => {
                tracing::warn!(%source, line = stmt.line, %head, "skipping unsupported statement");
                report.skipped.push(SkippedStatement {
                    source: source.to_string(),
                    line: stmt.line,
                    head,
                });
            }
            Err(e) => {
                return Err(in_file(SimError::Statement {
                    line: stmt.line,
                    source: Box::new(e),
                }));
            }
        }
    }

    report.applied.push(source.to_string());
    Ok(())
}

/// Replay one SQL file from disk.
pub fn replay_file(
    sim: &mut Simulator,
    path: impl AsRef<Path>,
    opts: ReplayOptions,
    report: &mut ReplayReport,
) -> SimResult<()> {
    let path = path.as_ref();
    let sql = fs::read_to_string(path)
        .map_err(|e| SimError::Io(format!("failed to read {}: {e}", path.display())))?;
    replay_sql(sim, &path.display().to_string(), &sql, opts, report)
}

/// Replay every up migration of `dir` with `version <= opts.target_version`.
pub fn replay_dir(
    sim: &mut Simulator,
    dir: impl AsRef<Path>,
    opts: ReplayOptions,
) -> SimResult<ReplayReport> {
    let mut report = ReplayReport::default();

    for m in scan_migrations_dir(dir)? {
        if opts.target_version.is_some_and(|target| m.version > target) {
            break;
        }
        let sql = fs::read_to_string(&m.path).map_err(|e| {
            SimError::Io(format!(
                "failed to read migration {}: {e}",
                m.path.display()
            ))
        })?;
        tracing::debug!(migration = %m.canonical_name(), "replaying migration");
        replay_sql(sim, &m.canonical_name(), &sql, opts, &mut report)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_temp_dir() -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("pgddl-migrations-test-{nonce}"));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[test]
    fn parse_file_name_variants() {
        assert_eq!(parse_file_name("V1__init.sql"), Some((1, "init", false)));
        assert_eq!(parse_file_name("V2__users.up.sql"), Some((2, "users", false)));
        assert_eq!(parse_file_name("V2__users.down.sql"), Some((2, "users", true)));

        assert_eq!(parse_file_name("not_migration.sql"), None);
        assert_eq!(parse_file_name("V0__zero.sql"), None);
        assert_eq!(parse_file_name("V3__.sql"), None);
        assert_eq!(parse_file_name("Vx__init.sql"), None);
    }

    #[test]
    fn scan_keeps_up_files_only_and_rejects_two_ups() {
        let dir = make_temp_dir();
        std::fs::write(dir.join("V3__x.down.sql"), "DROP TABLE x;").expect("write");
        std::fs::write(dir.join("V1__a.up.sql"), "CREATE TABLE a (id int);").expect("write");
        std::fs::write(dir.join("V1__a.down.sql"), "DROP TABLE a;").expect("write");

        let found = scan_migrations_dir(&dir).expect("scan");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_name(), "V1__a");
        assert_eq!(found[0].path, dir.join("V1__a.up.sql"));

        std::fs::write(dir.join("V1__b.sql"), "CREATE TABLE b (id int);").expect("write");
        let err = scan_migrations_dir(&dir).expect_err("must fail");
        assert!(err.to_string().contains("two up migrations for version 1"), "{err}");

        std::fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn replay_dir_applies_in_version_order_up_to_target() {
        let dir = make_temp_dir();
        std::fs::write(
            dir.join("V10__add_email.up.sql"),
            "ALTER TABLE account ADD COLUMN email text NOT NULL;",
        )
        .expect("write");
        std::fs::write(dir.join("V10__add_email.down.sql"), "ALTER TABLE account DROP COLUMN email;")
            .expect("write");
        std::fs::write(
            dir.join("V2__init.sql"),
            "CREATE TABLE account (id INTEGER PRIMARY KEY);\nCREATE INDEX account_idx ON account (id);",
        )
        .expect("write");
        std::fs::write(dir.join("README.md"), "# migrations").expect("write");

        let opts = ReplayOptions {
            target_version: Some(2),
            skip_unsupported: true,
        };
        let mut sim = Simulator::new();
        let report = replay_dir(&mut sim, &dir, opts).expect("replay");
        assert_eq!(report.applied, vec!["V2__init"]);
        assert_eq!(report.statements, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 2);
        assert!(!sim.tables()["account"].columns.contains_key("email"));

        let mut sim = Simulator::new();
        let report = replay_dir(
            &mut sim,
            &dir,
            ReplayOptions {
                skip_unsupported: true,
                ..Default::default()
            },
        )
        .expect("replay");
        assert_eq!(report.applied, vec!["V2__init", "V10__add_email"]);
        assert!(sim.tables()["account"].columns["email"].modifiers.not_null);

        std::fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn replay_reports_file_and_line_of_failure() {
        let mut sim = Simulator::new();
        let mut report = ReplayReport::default();
        let err = replay_sql(
            &mut sim,
            "V1__bad",
            "CREATE TABLE a (id int);\n\nALTER TABLE missing DROP COLUMN id;",
            ReplayOptions::default(),
            &mut report,
        )
        .expect_err("must fail");

        assert!(err.is_not_found());
        let text = err.to_string();
        assert!(text.starts_with("V1__bad: statement at line 3"), "{text}");
        assert!(sim.tables().contains_key("a"));
        assert!(report.applied.is_empty());
    }

    #[test]
    fn strict_replay_fails_on_unsupported() {
        let mut sim = Simulator::new();
        let mut report = ReplayReport::default();
        let err = replay_sql(
            &mut sim,
            "inline",
            "CREATE EXTENSION pgcrypto;",
            ReplayOptions::default(),
            &mut report,
        )
        .expect_err("must fail");
        assert!(err.is_unsupported());
    }
}
