//! JSONL (JSON Lines) reading.
//!
//! Each line is a valid JSON object representing one entity. Reading is
//! strict: one malformed line fails the whole file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::StorageError;

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities from the file. Blank lines are skipped.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            let entity = serde_json::from_str(&line).map_err(|source| StorageError::Parse {
                path: self.path.clone(),
                line: idx + 1,
                source,
            })?;
            entities.push(entity);
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct TestEntity {
        id: String,
        value: u32,
    }

    #[test]
    fn test_jsonl_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"1\",\"value\":100}\n\n{\"id\":\"2\",\"value\":200}\n",
        )
        .unwrap();

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        let entities = reader.read_all().unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(
            entities[1],
            TestEntity {
                id: "2".to_string(),
                value: 200
            }
        );
    }

    #[test]
    fn test_jsonl_malformed_line_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"1\",\"value\":100}\n{\"id\":\"2\"}\n{\"id\":\"3\",\"value\":300}\n",
        )
        .unwrap();

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        match reader.read_all() {
            Err(StorageError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_jsonl_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let reader: JsonlReader<TestEntity> =
            JsonlReader::new(temp_dir.path().join("nonexistent.jsonl"));

        assert!(!reader.exists());
        assert!(matches!(reader.read_all(), Err(StorageError::Io(_))));
    }
}
