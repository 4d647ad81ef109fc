use crate::cli::InitArgs;
use std::path::Path;

const TEMPLATE: &str = r#"
version = "1"

[migrations]
# V<version>__<name>.sql or V<version>__<name>.up.sql; .down.sql files are ignored
dir = "migrations"
# Fail on statements the simulator does not model (CREATE INDEX, functions, ...)
strict = false

[snapshot]
# Start from a previously written snapshot instead of an empty schema.
# seed = "schema.seed.json"
# Write the replayed schema here instead of printing it.
# output = ".pgddl/schema.json"
format = "json" # json | table
"#;

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    write_template(&args.config)?;
    println!("wrote {}", args.config.display());
    Ok(())
}

fn write_template(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing file: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create directory {}: {e}", parent.display())
            })?;
        }
    }

    std::fs::write(path, TEMPLATE.trim_start_matches('\n'))
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    #[test]
    fn template_is_a_valid_config_and_is_never_overwritten() {
        let dir = std::env::temp_dir().join(format!("pgddl-init-test-{}", std::process::id()));
        let path = dir.join("nested").join("pgddl.toml");

        write_template(&path).unwrap();
        let cfg = ProjectConfig::load(path.clone()).unwrap();
        assert_eq!(cfg.file.migrations.dir, "migrations");
        assert!(!cfg.file.migrations.strict);

        let err = write_template(&path).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
