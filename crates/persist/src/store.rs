//! Content-addressed export store.
//!
//! Layout inside the store directory:
//! ```text
//! store.meta.json              - metadata and schema version
//! exports/
//!   <sha256>.jsonl             - plain JSONL export
//!   <sha256>.jsonl.zst         - zstd compressed JSONL export
//! integrity/
//!   manifest.json              - hash chain manifest
//! ```
//!
//! The file stem is the SHA-256 of the uncompressed JSONL bytes, so two
//! exports of the same world share one file.

use placeweave_worldgen::WorldGenerationResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::records::{ImportedWorld, decode_jsonl, encode_jsonl};

const STORE_SCHEMA_VERSION: u32 = 1;

/// Errors from export and import.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed record on line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("export is missing its {0} record")]
    MissingRecord(&'static str),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("no export named {0} in this store")]
    UnknownExport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Jsonl,
    JsonlZstd,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::JsonlZstd => "jsonl.zst",
        }
    }

    fn of_filename(name: &str) -> Option<Self> {
        if name.ends_with(".jsonl.zst") {
            Some(ExportFormat::JsonlZstd)
        } else if name.ends_with(".jsonl") {
            Some(ExportFormat::Jsonl)
        } else {
            None
        }
    }
}

/// Metadata stored in store.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
    pub export_count: u32,
}

/// A single entry in the integrity manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    /// Hash of the uncompressed JSONL, also the file stem.
    pub content_sha256: String,
    /// Hash of the bytes on disk.
    pub sha256: String,
    pub prev_hash: Option<String>,
    pub seed: u32,
    pub places: usize,
}

/// Integrity manifest tracking every export in a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

/// What [`ExportStore::export`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub filename: String,
    pub content_sha256: String,
    pub bytes_written: usize,
    /// False when an identical export already existed.
    pub created: bool,
}

/// File-backed store of exported worlds with integrity checking.
pub struct ExportStore {
    root: PathBuf,
    meta: StoreMeta,
    manifest: IntegrityManifest,
}

impl ExportStore {
    /// Open or create an export store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("exports"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join("store.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        let (meta, manifest) = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.schema_version != STORE_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: STORE_SCHEMA_VERSION,
                });
            }
            let manifest: IntegrityManifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = StoreMeta {
                schema_version: STORE_SCHEMA_VERSION,
                export_count: 0,
            };
            let manifest = IntegrityManifest::default();
            write_json(&meta_path, &meta)?;
            write_json(&manifest_path, &manifest)?;
            (meta, manifest)
        };

        Ok(Self {
            root,
            meta,
            manifest,
        })
    }

    /// Write `result` under its content hash and chain it into the manifest.
    pub fn export(
        &mut self,
        result: &WorldGenerationResult,
        format: ExportFormat,
    ) -> Result<ExportReceipt, StoreError> {
        let jsonl = encode_jsonl(result)?;
        let content_sha256 = sha256_hex(&jsonl);
        let filename = format!("{content_sha256}.{}", format.extension());

        if self.manifest.entries.iter().any(|e| e.filename == filename) {
            tracing::debug!(%filename, "export already present");
            return Ok(ExportReceipt {
                filename,
                content_sha256,
                bytes_written: 0,
                created: false,
            });
        }

        let stored = match format {
            ExportFormat::Jsonl => jsonl,
            ExportFormat::JsonlZstd => zstd_compress(&jsonl)?,
        };
        let hash = sha256_hex(&stored);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());

        std::fs::write(self.root.join("exports").join(&filename), &stored)?;

        self.manifest.entries.push(ManifestEntry {
            filename: filename.clone(),
            content_sha256: content_sha256.clone(),
            sha256: hash,
            prev_hash,
            seed: result.config.seed,
            places: result.places.len(),
        });
        self.meta.export_count += 1;
        write_json(&self.root.join("store.meta.json"), &self.meta)?;
        write_json(&self.root.join("integrity").join("manifest.json"), &self.manifest)?;

        tracing::info!(%filename, bytes = stored.len(), "world exported");
        Ok(ExportReceipt {
            filename,
            content_sha256,
            bytes_written: stored.len(),
            created: true,
        })
    }

    /// Read an export back, checking both the stored and the content hash.
    pub fn load(&self, filename: &str) -> Result<ImportedWorld, StoreError> {
        let entry = self
            .manifest
            .entries
            .iter()
            .find(|e| e.filename == filename)
            .ok_or_else(|| StoreError::UnknownExport(filename.to_string()))?;
        let stored = std::fs::read(self.root.join("exports").join(filename))?;
        check_hash(&entry.sha256, &stored)?;

        let jsonl = match ExportFormat::of_filename(filename) {
            Some(ExportFormat::JsonlZstd) => zstd_decompress(&stored)?,
            _ => stored,
        };
        check_hash(&entry.content_sha256, &jsonl)?;
        decode_jsonl(&jsonl)
    }

    /// Verify the manifest chain and every export's hashes.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut previous: Option<&str> = None;
        for entry in &self.manifest.entries {
            if entry.prev_hash.as_deref() != previous {
                return Err(StoreError::IntegrityMismatch {
                    expected: previous.unwrap_or("<chain start>").to_string(),
                    actual: entry.prev_hash.as_deref().unwrap_or("<chain start>").to_string(),
                });
            }
            let stored = std::fs::read(self.root.join("exports").join(&entry.filename))?;
            check_hash(&entry.sha256, &stored)?;
            if !entry.filename.starts_with(&entry.content_sha256) {
                return Err(StoreError::IntegrityMismatch {
                    expected: entry.content_sha256.clone(),
                    actual: entry.filename.clone(),
                });
            }
            previous = Some(&entry.sha256);
        }
        Ok(())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.manifest.entries
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes)?;
    Ok(())
}

fn check_hash(expected: &str, data: &[u8]) -> Result<(), StoreError> {
    let actual = sha256_hex(data);
    if actual == expected {
        Ok(())
    } else {
        Err(StoreError::IntegrityMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use placeweave_worldgen::{WorldGenerationConfig, WorldShape, generate};

    fn world(seed: u32) -> WorldGenerationResult {
        generate(&WorldGenerationConfig {
            seed,
            shape: WorldShape::Bands { count: 2 },
            ..WorldGenerationConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn open_lays_out_an_empty_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ExportStore::open(tmp.path().join("worlds")).unwrap();
        assert_eq!(store.meta().export_count, 0);
        assert!(store.root().join("exports").is_dir());
        assert!(store.root().join("integrity").is_dir());
    }

    #[test]
    fn filename_is_the_content_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ExportStore::open(tmp.path()).unwrap();
        let w = world(3);
        let receipt = store.export(&w, ExportFormat::Jsonl).unwrap();
        let expected = sha256_hex(&encode_jsonl(&w).unwrap());
        assert_eq!(receipt.filename, format!("{expected}.jsonl"));
        assert!(receipt.created);
    }

    #[test]
    fn identical_worlds_share_one_export() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ExportStore::open(tmp.path()).unwrap();
        let first = store.export(&world(3), ExportFormat::Jsonl).unwrap();
        let second = store.export(&world(3), ExportFormat::Jsonl).unwrap();
        assert_eq!(first.filename, second.filename);
        assert!(!second.created);
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn compressed_export_loads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ExportStore::open(tmp.path()).unwrap();
        let w = world(4);
        let plain = store.export(&w, ExportFormat::Jsonl).unwrap();
        let packed = store.export(&w, ExportFormat::JsonlZstd).unwrap();
        assert_eq!(plain.content_sha256, packed.content_sha256);
        assert!(packed.filename.ends_with(".jsonl.zst"));
        assert!(packed.bytes_written < plain.bytes_written);

        let loaded = store.load(&packed.filename).unwrap();
        assert_eq!(loaded.places, w.places);
        assert_eq!(loaded.vertices, w.vertices);
    }

    #[test]
    fn chain_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut store = ExportStore::open(tmp.path()).unwrap();
            store.export(&world(1), ExportFormat::Jsonl).unwrap();
            store.export(&world(2), ExportFormat::JsonlZstd).unwrap();
        }
        let store = ExportStore::open(tmp.path()).unwrap();
        assert_eq!(store.meta().export_count, 2);
        assert_eq!(store.entries()[1].prev_hash.as_deref(), Some(store.entries()[0].sha256.as_str()));
        store.verify_integrity().unwrap();
    }

    #[test]
    fn flipped_byte_breaks_integrity() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = ExportStore::open(tmp.path()).unwrap();
        let receipt = store.export(&world(6), ExportFormat::Jsonl).unwrap();

        let path = tmp.path().join("exports").join(&receipt.filename);
        let mut data = std::fs::read(&path).unwrap();
        if let Some(byte) = data.first_mut() {
            *byte ^= 0xff;
        }
        std::fs::write(&path, &data).unwrap();

        let store = ExportStore::open(tmp.path()).unwrap();
        assert!(store.verify_integrity().is_err());
        assert!(matches!(
            store.load(&receipt.filename),
            Err(StoreError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn unknown_export_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ExportStore::open(tmp.path()).unwrap();
        assert!(matches!(
            store.load("deadbeef.jsonl"),
            Err(StoreError::UnknownExport(_))
        ));
    }

    #[test]
    fn newer_store_schema_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let _store = ExportStore::open(tmp.path()).unwrap();

        let meta_path = tmp.path().join("store.meta.json");
        let mut meta: StoreMeta =
            serde_json::from_reader(std::fs::File::open(&meta_path).unwrap()).unwrap();
        meta.schema_version = 999;
        serde_json::to_writer_pretty(std::fs::File::create(&meta_path).unwrap(), &meta).unwrap();

        match ExportStore::open(tmp.path()) {
            Err(StoreError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, STORE_SCHEMA_VERSION);
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("store with schema 999 opened"),
        }
    }
}
