use crate::cli::OutputFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_path: PathBuf,
    pub config_dir: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    pub fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        let config_dir = config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;

        Self::from_toml(config_path, config_dir, &raw)
    }

    fn from_toml(config_path: PathBuf, config_dir: PathBuf, raw: &str) -> anyhow::Result<Self> {
        let mut file: ConfigFile = toml::from_str(raw).map_err(|e| {
            anyhow::anyhow!(
                "failed to parse config file {}: {e}",
                config_path.display()
            )
        })?;

        file.expand_env()?;
        file.validate()?;

        Ok(Self {
            config_path,
            config_dir,
            file,
        })
    }

    /// Load `config_path` if it exists.
    ///
    /// A missing file is fine when the command line already names what to replay
    /// (`has_inputs`); otherwise it is an error pointing at `pgddl init`.
    pub fn load_optional(config_path: &Path, has_inputs: bool) -> anyhow::Result<Option<Self>> {
        if config_path.exists() {
            let project = Self::load(config_path.to_path_buf())?;
            tracing::debug!(config = %project.config_path.display(), "loaded config");
            return Ok(Some(project));
        }
        if has_inputs {
            tracing::debug!(config = %config_path.display(), "no config file, using command line only");
            return Ok(None);
        }
        anyhow::bail!(
            "failed to load config {}; pass --dir or files, or run `pgddl init` first",
            config_path.display()
        )
    }

    pub fn resolve_path(&self, p: impl AsRef<Path>) -> PathBuf {
        let p = p.as_ref();
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.config_dir.join(p)
        }
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.resolve_path(&self.file.migrations.dir)
    }

    pub fn seed_path(&self) -> Option<PathBuf> {
        self.file.snapshot.seed.as_ref().map(|p| self.resolve_path(p))
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.file.snapshot.output.as_ref().map(|p| self.resolve_path(p))
    }

    pub fn format(&self) -> anyhow::Result<Option<OutputFormat>> {
        self.file
            .snapshot
            .format
            .as_deref()
            .map(str::parse)
            .transpose()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,

    #[serde(default)]
    pub migrations: MigrationsConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationsConfig {
    #[serde(default = "default_migrations_dir")]
    pub dir: String,
    /// Fail on unsupported statements instead of skipping them.
    #[serde(default)]
    pub strict: bool,
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_migrations_dir(),
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotConfig {
    pub seed: Option<String>,
    pub output: Option<String>,
    pub format: Option<String>,
}

impl ConfigFile {
    fn expand_env(&mut self) -> anyhow::Result<()> {
        self.migrations.dir = expand_env_vars(&self.migrations.dir)?;

        for p in [
            &mut self.snapshot.seed,
            &mut self.snapshot.output,
            &mut self.snapshot.format,
        ]
        .into_iter()
        .flatten()
        {
            *p = expand_env_vars(p)?;
        }

        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.version.trim() != "1" {
            anyhow::bail!("unsupported config version: {}", self.version);
        }

        if self.migrations.dir.trim().is_empty() {
            anyhow::bail!("migrations.dir must not be empty");
        }

        if let Some(format) = &self.snapshot.format {
            format.parse::<OutputFormat>()?;
        }
        for (key, v) in [
            ("snapshot.seed", &self.snapshot.seed),
            ("snapshot.output", &self.snapshot.output),
        ] {
            if v.as_deref().is_some_and(|s| s.trim().is_empty()) {
                anyhow::bail!("{key} must not be empty");
            }
        }

        Ok(())
    }
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            out.push(c);
            continue;
        }
        chars.next();

        let mut key = String::new();
        let mut closed = false;
        for ch in chars.by_ref() {
            if ch == '}' {
                closed = true;
                break;
            }
            key.push(ch);
        }

        if !closed {
            anyhow::bail!("unterminated env var reference: ${{{key}");
        }
        if key.is_empty() {
            anyhow::bail!("invalid env var reference: ${{}}");
        }

        let v = std::env::var(&key)
            .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
        out.push_str(&v);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> anyhow::Result<ProjectConfig> {
        ProjectConfig::from_toml(
            PathBuf::from("proj/pgddl.toml"),
            PathBuf::from("proj"),
            raw,
        )
    }

    #[test]
    fn defaults_and_relative_paths() {
        let cfg = parse("version = \"1\"").unwrap();
        assert_eq!(cfg.migrations_dir(), PathBuf::from("proj/migrations"));
        assert!(!cfg.file.migrations.strict);
        assert_eq!(cfg.seed_path(), None);
        assert_eq!(cfg.format().unwrap(), None);
    }

    #[test]
    fn full_config() {
        let cfg = parse(
            r#"
version = "1"

[migrations]
dir = "db/migrations"
strict = true

[snapshot]
seed = "/abs/seed.json"
output = ".pgddl/schema.json"
format = "table"
"#,
        )
        .unwrap();

        assert_eq!(cfg.migrations_dir(), PathBuf::from("proj/db/migrations"));
        assert!(cfg.file.migrations.strict);
        assert_eq!(cfg.seed_path(), Some(PathBuf::from("/abs/seed.json")));
        assert_eq!(
            cfg.output_path(),
            Some(PathBuf::from("proj/.pgddl/schema.json"))
        );
        assert_eq!(cfg.format().unwrap(), Some(OutputFormat::Table));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse("version = \"2\"").is_err());
        assert!(parse("version = \"1\"\n[snapshot]\nformat = \"yaml\"").is_err());
        assert!(parse("version = \"1\"\n[migrations]\ndir = \"\"").is_err());
        assert!(parse("version = \"1\"\n[snapshot]\noutput = \" \"").is_err());
    }

    #[test]
    fn expands_env_vars() {
        let path = std::env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env_vars("a-${PATH}-b").unwrap(), format!("a-{path}-b"));
        assert_eq!(expand_env_vars("$HOME{x}").unwrap(), "$HOME{x}");
        assert!(expand_env_vars("${UNTERMINATED").is_err());
        assert!(expand_env_vars("${}").is_err());
        assert!(expand_env_vars("${PGDDL_SURELY_NOT_SET_1234}").is_err());
    }
}
