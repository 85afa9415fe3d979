use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const ENTRIES_ENTRY: &str = "store/entries.json";
pub const BUNDLE_FORMAT_V1: &str = "checkboard-store-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub payload_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportedBundle {
    pub bundle_format_detected: String,
    pub entries: Vec<(String, String)>,
}

/// Writes every store entry into a zip bundle. Values are kept as their raw
/// JSON text so entries that no longer decode survive the round trip.
pub fn export_store_bundle(
    entries: &[(String, String)],
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let payload_rows: Vec<serde_json::Value> = entries
        .iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect();
    let payload = serde_json::to_vec_pretty(&payload_rows).context("failed to serialize entries")?;
    let payload_sha256 = format!("{:x}", Sha256::digest(&payload));

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "entryCount": entries.len(),
        "payloadSha256": payload_sha256,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(ENTRIES_ENTRY, opts)
        .context("failed to start entries entry")?;
    zip.write_all(&payload)
        .context("failed to write entries entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: entries.len(),
        payload_sha256,
    })
}

/// Reads and verifies a bundle written by [`export_store_bundle`].
pub fn read_store_bundle(in_path: &Path) -> anyhow::Result<ImportedBundle> {
    if !is_zip_file(in_path)? {
        return Err(anyhow!(
            "not a zip bundle: {}",
            in_path.to_string_lossy()
        ));
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut payload = Vec::new();
    archive
        .by_name(ENTRIES_ENTRY)
        .context("bundle missing store/entries.json")?
        .read_to_end(&mut payload)
        .context("failed to read store/entries.json")?;

    let expected = manifest
        .get("payloadSha256")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let actual = format!("{:x}", Sha256::digest(&payload));
    if expected != actual {
        return Err(anyhow!(
            "entries checksum mismatch: manifest {} vs payload {}",
            expected,
            actual
        ));
    }

    let rows: Vec<serde_json::Value> =
        serde_json::from_slice(&payload).context("store/entries.json is invalid JSON")?;
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let key = row.get("key").and_then(|v| v.as_str());
        let value = row.get("value").and_then(|v| v.as_str());
        let (Some(key), Some(value)) = (key, value) else {
            return Err(anyhow!("malformed entry row: {}", row));
        };
        entries.push((key.to_string(), value.to_string()));
    }

    Ok(ImportedBundle {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        entries,
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
