use crate::config::ProjectConfig;
use pgddl::{ReplayOptions, ReplayReport, SchemaSnapshot, Simulator};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where the SQL to replay comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A `V<n>__<name>.sql` migrations directory.
    Dir(PathBuf),
    /// Plain SQL files in command-line order; `-` is stdin.
    Files(Vec<PathBuf>),
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub source: Source,
    pub seed: Option<PathBuf>,
    pub options: ReplayOptions,
}

/// One named script to replay.
#[derive(Debug, Clone)]
pub struct Unit {
    pub name: String,
    pub sql: String,
}

/// Merge command-line flags over the config file (flags win).
pub fn plan(
    config: &Path,
    dir: Option<PathBuf>,
    files: Vec<PathBuf>,
    seed: Option<PathBuf>,
    to: Option<i64>,
    strict: bool,
) -> anyhow::Result<(Option<ProjectConfig>, Plan)> {
    let project = ProjectConfig::load_optional(config, dir.is_some() || !files.is_empty())?;

    let source = if !files.is_empty() {
        Source::Files(files)
    } else if let Some(dir) = dir {
        Source::Dir(dir)
    } else if let Some(project) = &project {
        Source::Dir(project.migrations_dir())
    } else {
        anyhow::bail!("nothing to replay: pass --dir or files");
    };

    let seed = seed.or_else(|| project.as_ref().and_then(ProjectConfig::seed_path));
    let strict = strict || project.as_ref().is_some_and(|p| p.file.migrations.strict);

    let plan = Plan {
        source,
        seed,
        options: ReplayOptions {
            target_version: to,
            skip_unsupported: !strict,
        },
    };
    tracing::debug!(?plan, "replay plan");
    Ok((project, plan))
}

impl Plan {
    /// A simulator over the seed snapshot, or an empty one.
    pub fn simulator(&self) -> anyhow::Result<Simulator> {
        let Some(seed) = &self.seed else {
            return Ok(Simulator::new());
        };
        let snapshot = SchemaSnapshot::read(seed)
            .map_err(|e| anyhow::anyhow!("failed to load seed {}: {e}", seed.display()))?;
        tracing::debug!(
            seed = %seed.display(),
            types = snapshot.schema.types.len(),
            tables = snapshot.schema.tables.len(),
            "seeded schema"
        );
        Ok(Simulator::with_state(snapshot.schema))
    }

    /// Replay the whole source, stopping at the first error.
    pub fn replay(&self, sim: &mut Simulator) -> anyhow::Result<ReplayReport> {
        match &self.source {
            Source::Dir(dir) => Ok(pgddl::replay_dir(sim, dir, self.options)?),
            Source::Files(_) => {
                let mut report = ReplayReport::default();
                for unit in self.units()? {
                    pgddl::replay_sql(sim, &unit.name, &unit.sql, self.options, &mut report)?;
                }
                Ok(report)
            }
        }
    }

    /// Load every script of the source, in replay order.
    pub fn units(&self) -> anyhow::Result<Vec<Unit>> {
        match &self.source {
            Source::Dir(dir) => {
                let mut out = Vec::new();
                for m in pgddl::scan_migrations_dir(dir)? {
                    if self
                        .options
                        .target_version
                        .is_some_and(|target| m.version > target)
                    {
                        break;
                    }
                    out.push(Unit {
                        name: m.canonical_name(),
                        sql: read_sql(&m.path)?,
                    });
                }
                Ok(out)
            }
            Source::Files(files) => files
                .iter()
                .map(|f| -> anyhow::Result<Unit> {
                    Ok(Unit {
                        name: display_name(f),
                        sql: read_sql(f)?,
                    })
                })
                .collect(),
        }
    }
}

fn display_name(path: &Path) -> String {
    if path == Path::new("-") {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}

fn read_sql(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| anyhow::anyhow!("failed to read stdin: {e}"))?;
        if buf.trim().is_empty() {
            anyhow::bail!("no SQL provided on stdin");
        }
        return Ok(buf);
    }

    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pgddl-cli-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn flags_override_config() {
        let dir = temp_dir("plan");
        let config = dir.join("pgddl.toml");
        std::fs::write(
            &config,
            "version = \"1\"\n[migrations]\ndir = \"db\"\nstrict = true\n[snapshot]\nseed = \"seed.json\"\n",
        )
        .unwrap();

        let (project, p) = plan(&config, None, Vec::new(), None, Some(4), false).unwrap();
        assert!(project.is_some());
        assert_eq!(p.source, Source::Dir(dir.join("db")));
        assert_eq!(p.seed, Some(dir.join("seed.json")));
        assert!(!p.options.skip_unsupported);
        assert_eq!(p.options.target_version, Some(4));

        let (_, p) = plan(
            &config,
            None,
            vec![PathBuf::from("a.sql")],
            Some(PathBuf::from("other.json")),
            None,
            false,
        )
        .unwrap();
        assert_eq!(p.source, Source::Files(vec![PathBuf::from("a.sql")]));
        assert_eq!(p.seed, Some(PathBuf::from("other.json")));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_config_needs_inputs() {
        let missing = Path::new("/definitely/not/here/pgddl.toml");
        assert!(plan(missing, None, Vec::new(), None, None, false).is_err());

        let (project, p) =
            plan(missing, Some(PathBuf::from("m")), Vec::new(), None, None, false).unwrap();
        assert!(project.is_none());
        assert!(p.options.skip_unsupported);
    }

    #[test]
    fn replays_files_over_a_seed() {
        let dir = temp_dir("seed");
        let mut base = Simulator::new();
        base.simulate_query("CREATE TABLE account (id INTEGER PRIMARY KEY)")
            .unwrap();
        let seed = dir.join("seed.json");
        SchemaSnapshot::new(Vec::new(), base.into_state())
            .write(&seed)
            .unwrap();

        let file = dir.join("add_email.sql");
        std::fs::write(
            &file,
            "ALTER TABLE account ADD COLUMN email text;\nCREATE INDEX ON account (email);",
        )
        .unwrap();

        let (_, p) = plan(
            &dir.join("pgddl.toml"),
            None,
            vec![file.clone()],
            Some(seed),
            None,
            false,
        )
        .unwrap();
        let mut sim = p.simulator().unwrap();
        let report = p.replay(&mut sim).unwrap();

        assert_eq!(report.applied, vec![file.display().to_string()]);
        assert_eq!(report.skipped.len(), 1);
        assert!(sim.tables()["account"].columns.contains_key("email"));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
