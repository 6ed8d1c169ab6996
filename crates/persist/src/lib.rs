//! Export and import of generated worlds.
//!
//! A world is written as JSON lines: one header, the config, each vertex,
//! each place, then the stats record. Exports live in an [`ExportStore`]
//! under the SHA-256 of their JSONL bytes, optionally zstd compressed.
//!
//! # Invariants
//! - Encoding is deterministic: the same world always yields the same bytes.
//! - Every export is listed in a hash-chained manifest; a broken chain or a
//!   changed file fails [`ExportStore::verify_integrity`].
//! - Stage timings are never exported.

mod records;
mod store;

pub use records::{ImportedWorld, RECORD_SCHEMA_VERSION, Record, decode_jsonl, encode_jsonl};
pub use store::{
    ExportFormat, ExportReceipt, ExportStore, IntegrityManifest, ManifestEntry, StoreError,
    StoreMeta, sha256_hex,
};
