//! Snapshot files, rule archives and binary checkpoints.

use crate::error::{IoError, Result};
use chimera_core::codec::state_from_snapshot_json;
use chimera_core::{RuleRegistry, StateCodec};
use chimera_data::OrganismState;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{AlignedVec, Deserialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Writes the state's snapshot as pretty-printed JSON.
pub fn write_snapshot_file<P: AsRef<Path>>(state: &OrganismState, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(&state.snapshot())
        .map_err(|e| IoError::serialization(format!("snapshot serialization failed: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| IoError::from(e).with_context(format!("writing snapshot to {path:?}")))?;
    tracing::debug!(path = %path.display(), age = state.age(), "Snapshot written");
    Ok(())
}

/// Reads a JSON snapshot file into a fresh state.
pub fn read_snapshot_file<P: AsRef<Path>>(path: P) -> Result<OrganismState> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| IoError::from(e).with_context(format!("reading snapshot from {path:?}")))?;
    state_from_snapshot_json(&json)
        .map_err(|e| IoError::from(e).with_context(format!("decoding snapshot {path:?}")))
}

/// Saves every rule body as a gzip-compressed export blob.
pub fn save_rule_archive<P: AsRef<Path>>(registry: &RuleRegistry, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = registry.export_json()?;
    let file = File::create(path)
        .map_err(|e| IoError::from(e).with_context(format!("creating {path:?}")))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(json.as_bytes())
        .map_err(|e| IoError::compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| IoError::compression(e.to_string()))?;
    tracing::info!(path = %path.display(), rules = registry.rule_count(), "Rule archive saved");
    Ok(())
}

/// Merges an archive written by [`save_rule_archive`] into `registry`.
/// Plain (uncompressed) JSON exports are accepted too. Returns the number of
/// rules in the archive.
pub fn load_rule_archive<P: AsRef<Path>>(registry: &mut RuleRegistry, path: P) -> Result<usize> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| IoError::from(e).with_context(format!("reading {path:?}")))?;

    let json = if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = String::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_string(&mut decoded)
            .map_err(|e| IoError::compression(e.to_string()).with_context(format!("{path:?}")))?;
        decoded
    } else {
        String::from_utf8(bytes).map_err(|e| {
            IoError::serialization(format!("archive is not UTF-8: {e}"))
                .with_context(format!("{path:?}"))
        })?
    };

    let before = registry.rule_count();
    let count = registry
        .import_json(&json)
        .map_err(|e| IoError::from(e).with_context(format!("importing {path:?}")))?;
    tracing::debug!(path = %path.display(), count, before, after = registry.rule_count(), "Rule archive loaded");
    Ok(count)
}

/// Writes a validated rkyv archive of the state.
pub fn save_checkpoint<P: AsRef<Path>>(state: &OrganismState, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut serializer = AllocSerializer::<256>::default();
    serializer
        .serialize_value(state)
        .map_err(|e| IoError::rkyv(format!("serialization failed: {e:?}")))?;
    let bytes = serializer.into_serializer().into_inner();
    let mut file = File::create(path)
        .map_err(|e| IoError::from(e).with_context(format!("creating {path:?}")))?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Reads a checkpoint written by [`save_checkpoint`]. The archive is
/// validated before use and every field is re-clamped after decoding.
pub fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<OrganismState> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| IoError::from(e).with_context(format!("reading {path:?}")))?;
    let mut aligned = AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(&bytes);

    let archived = rkyv::check_archived_root::<OrganismState>(&aligned)
        .map_err(|e| IoError::rkyv(format!("validation failed: {e:?}")))?;
    let mut deserializer = SharedDeserializeMap::default();
    let state: OrganismState = archived
        .deserialize(&mut deserializer)
        .map_err(|e| IoError::rkyv(format!("deserialization failed: {e:?}")))?;
    Ok(state.sanitized())
}
