use placeweave_common::Vertex;
use placeweave_kernel::Place;
use placeweave_worldgen::{
    ConnectionStats, Diagnostics, GenerationStatus, WorldGenerationConfig, WorldGenerationResult,
};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::StoreError;

/// Version of the line format written by [`encode_jsonl`].
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// One line of an exported world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    Header { schema_version: u32 },
    Config(WorldGenerationConfig),
    Vertex(Vertex),
    Place(Place),
    Stats {
        connection_stats: ConnectionStats,
        status: GenerationStatus,
        diagnostics: Diagnostics,
    },
}

impl Record {
    fn kind(&self) -> &'static str {
        match self {
            Record::Header { .. } => "header",
            Record::Config(_) => "config",
            Record::Vertex(_) => "vertex",
            Record::Place(_) => "place",
            Record::Stats { .. } => "stats",
        }
    }
}

/// A world read back from JSONL. Stage timings are not exported.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedWorld {
    pub config: WorldGenerationConfig,
    pub vertices: Vec<Vertex>,
    pub places: Vec<Place>,
    pub connection_stats: ConnectionStats,
    pub status: GenerationStatus,
    pub diagnostics: Diagnostics,
}

impl ImportedWorld {
    pub fn into_result(self) -> WorldGenerationResult {
        WorldGenerationResult {
            places: self.places,
            vertices: self.vertices,
            connection_stats: self.connection_stats,
            config: self.config,
            status: self.status,
            diagnostics: self.diagnostics,
        }
    }
}

/// Serialize a world as newline-delimited JSON: a header, the config, every
/// vertex, every place, then the stats. Byte-identical for identical worlds.
pub fn encode_jsonl(result: &WorldGenerationResult) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let mut line = |record: &Record| -> Result<(), StoreError> {
        serde_json::to_writer(&mut buf, record)?;
        buf.write_all(b"\n")?;
        Ok(())
    };
    line(&Record::Header {
        schema_version: RECORD_SCHEMA_VERSION,
    })?;
    line(&Record::Config(result.config.clone()))?;
    for v in &result.vertices {
        line(&Record::Vertex(v.clone()))?;
    }
    for p in &result.places {
        line(&Record::Place(p.clone()))?;
    }
    line(&Record::Stats {
        connection_stats: result.connection_stats,
        status: result.status,
        diagnostics: result.diagnostics.clone(),
    })?;
    Ok(buf)
}

/// Parse the output of [`encode_jsonl`]. Blank lines are ignored.
pub fn decode_jsonl(bytes: &[u8]) -> Result<ImportedWorld, StoreError> {
    let text = std::str::from_utf8(bytes).map_err(|e| StoreError::Malformed {
        line: 0,
        reason: e.to_string(),
    })?;

    let mut header_seen = false;
    let mut config = None;
    let mut stats = None;
    let mut vertices = Vec::new();
    let mut places = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(raw).map_err(|e| StoreError::Malformed {
            line,
            reason: e.to_string(),
        })?;
        if !header_seen && !matches!(record, Record::Header { .. }) {
            return Err(StoreError::Malformed {
                line,
                reason: format!("expected header, found {}", record.kind()),
            });
        }
        match record {
            Record::Header { schema_version } => {
                if schema_version != RECORD_SCHEMA_VERSION {
                    return Err(StoreError::SchemaMismatch {
                        file_version: schema_version,
                        expected_version: RECORD_SCHEMA_VERSION,
                    });
                }
                header_seen = true;
            }
            Record::Config(c) => config = Some(c),
            Record::Vertex(v) => vertices.push(v),
            Record::Place(p) => places.push(p),
            Record::Stats {
                connection_stats,
                status,
                diagnostics,
            } => stats = Some((connection_stats, status, diagnostics)),
        }
    }

    let config = config.ok_or(StoreError::MissingRecord("config"))?;
    let (connection_stats, status, diagnostics) = stats.ok_or(StoreError::MissingRecord("stats"))?;
    tracing::debug!(vertices = vertices.len(), places = places.len(), "world decoded");
    Ok(ImportedWorld {
        config,
        vertices,
        places,
        connection_stats,
        status,
        diagnostics,
    })
}
