use crate::store::GradeDefinition;
use anyhow::{anyhow, Context};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DEFINITIONS_ENTRY: &str = "definitions.json";
pub const BUNDLE_FORMAT_V1: &str = "gradingd-definitions-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleManifest {
    format: String,
    version: u32,
    app_version: String,
    exported_at: String,
    definition_count: usize,
    sha256: String,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub definition_count: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub fn export_definitions_bundle(
    definitions: &[GradeDefinition],
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let payload =
        serde_json::to_vec_pretty(definitions).context("failed to serialize definitions")?;
    let manifest = BundleManifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        version: 1,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        definition_count: definitions.len(),
        sha256: sha256_hex(&payload),
    };

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DEFINITIONS_ENTRY, opts)
        .context("failed to start definitions entry")?;
    zip.write_all(&payload)
        .context("failed to write definitions entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        definition_count: definitions.len(),
    })
}

/// Reads and checksum-verifies a bundle. Definitions come back as stored at
/// export time; callers re-validate them on insert.
pub fn read_definitions_bundle(in_path: &Path) -> anyhow::Result<Vec<GradeDefinition>> {
    if !is_zip_file(in_path)? {
        return Err(anyhow!(
            "not a definitions bundle: {}",
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
    let manifest: BundleManifest =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", manifest.format));
    }

    let mut payload: Vec<u8> = Vec::new();
    archive
        .by_name(DEFINITIONS_ENTRY)
        .context("bundle missing definitions.json")?
        .read_to_end(&mut payload)
        .context("failed to read definitions.json")?;
    let actual = sha256_hex(&payload);
    if actual != manifest.sha256 {
        return Err(anyhow!(
            "definitions checksum mismatch: manifest {} but payload {}",
            manifest.sha256,
            actual
        ));
    }

    let definitions: Vec<GradeDefinition> =
        serde_json::from_slice(&payload).context("definitions.json is invalid")?;
    if definitions.len() != manifest.definition_count {
        return Err(anyhow!(
            "manifest lists {} definitions but bundle has {}",
            manifest.definition_count,
            definitions.len()
        ));
    }
    Ok(definitions)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::Scale;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn definition(id: &str, scale: Scale) -> GradeDefinition {
        GradeDefinition {
            id: id.to_string(),
            name: scale.name().to_string(),
            scale: scale.key().to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            superseded_by: None,
            ranges: scale.ranges(),
        }
    }

    #[test]
    fn exported_bundle_reads_back() {
        let dir = temp_dir("gradingd-bundle-read");
        let out = dir.join("nested").join("defs.zip");
        let defs = vec![definition("d1", Scale::Cbse), definition("d2", Scale::Gpa4)];
        let summary = export_definitions_bundle(&defs, &out).expect("export");
        assert_eq!(summary.definition_count, 2);
        assert_eq!(summary.bundle_format, BUNDLE_FORMAT_V1);
        assert_eq!(read_definitions_bundle(&out).expect("read"), defs);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let dir = temp_dir("gradingd-bundle-tamper");
        let good = dir.join("good.zip");
        export_definitions_bundle(&[definition("d1", Scale::Icse)], &good).expect("export");

        // Rebuild the zip with the original manifest and an edited payload.
        let mut archive = ZipArchive::new(File::open(&good).expect("open")).expect("zip");
        let mut manifest = String::new();
        archive
            .by_name(MANIFEST_ENTRY)
            .expect("manifest")
            .read_to_string(&mut manifest)
            .expect("read manifest");
        let forged = serde_json::to_vec_pretty(&[definition("d1", Scale::Gpa4)]).expect("json");

        let bad = dir.join("bad.zip");
        let mut zip = ZipWriter::new(File::create(&bad).expect("create"));
        let opts = FileOptions::default();
        zip.start_file(MANIFEST_ENTRY, opts).expect("start");
        zip.write_all(manifest.as_bytes()).expect("write");
        zip.start_file(DEFINITIONS_ENTRY, opts).expect("start");
        zip.write_all(&forged).expect("write");
        zip.finish().expect("finish");

        let e = read_definitions_bundle(&bad).expect_err("tampered");
        assert!(e.to_string().contains("checksum mismatch"), "{}", e);
    }

    #[test]
    fn non_zip_input_is_rejected() {
        let dir = temp_dir("gradingd-bundle-plain");
        let p = dir.join("defs.json");
        std::fs::write(&p, b"[]").expect("write");
        assert!(read_definitions_bundle(&p).is_err());
    }
}
