use crate::error::{SimError, SimResult};
use crate::schema::SchemaState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current on-disk snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A replayed schema as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    /// Sources replayed to produce `schema`, in order.
    pub migrations: Vec<String>,
    pub schema: SchemaState,
}

impl SchemaSnapshot {
    pub fn new(migrations: Vec<String>, schema: SchemaState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            migrations,
            schema,
        }
    }

    /// Read a snapshot, rejecting unknown format versions.
    pub fn read(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| SimError::Io(format!("failed to read {}: {e}", path.display())))?;

        let snapshot = serde_json::from_slice::<SchemaSnapshot>(&data)
            .map_err(|e| SimError::Serialization(format!("Failed to parse snapshot: {e}")))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SimError::Serialization(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Write the snapshot as pretty JSON. The file is replaced atomically.
    pub fn write(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SimError::Io(e.to_string()))?;
        }

        let tmp_path = path.with_extension("json.tmp");
        let data = self.to_json()?;

        std::fs::write(&tmp_path, data).map_err(|e| SimError::Io(e.to_string()))?;
        std::fs::rename(&tmp_path, path).map_err(|e| SimError::Io(e.to_string()))?;
        tracing::debug!(path = %path.display(), "wrote schema snapshot");
        Ok(())
    }

    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SimError::Serialization(format!("Failed to serialize snapshot: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Simulator;

    #[test]
    fn write_then_read_keeps_declaration_order() {
        let mut sim = Simulator::new();
        sim.simulate_script(
            "CREATE TYPE mood AS ENUM ('sad', 'ok');\n\
             CREATE TABLE zeta (id int PRIMARY KEY, feeling mood);\n\
             CREATE TABLE alpha (id int);",
        )
        .unwrap();

        let dir = std::env::temp_dir().join(format!(
            "pgddl-snapshot-test-{}",
            std::process::id()
        ));
        let path = dir.join("nested").join("schema.json");
        let snapshot = SchemaSnapshot::new(vec!["inline".into()], sim.into_state());
        snapshot.write(&path).unwrap();

        let loaded = SchemaSnapshot::read(&path).unwrap();
        assert_eq!(loaded, snapshot);
        let names: Vec<_> = loaded.schema.tables.keys().cloned().collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let snapshot = SchemaSnapshot::new(Vec::new(), SchemaState::default());
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"generatedAt\""));
        assert!(json.contains("\"version\": 1"));
    }

    #[test]
    fn rejects_unknown_version() {
        let dir = std::env::temp_dir().join(format!(
            "pgddl-snapshot-version-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("schema.json");
        std::fs::write(
            &path,
            r#"{"version":7,"generatedAt":"2024-01-01T00:00:00Z","migrations":[],"schema":{"types":{},"tables":{}}}"#,
        )
        .unwrap();

        let err = SchemaSnapshot::read(&path).unwrap_err();
        assert!(matches!(err, SimError::Serialization(_)));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
