//! Opaque binary outputs: PDF test reports and Simulink Test `.mldatx`
//! result containers. Neither is interpreted beyond a structural check.

use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfSummary {
    pub bytes: u64,
    /// From the header, e.g. `1.7`.
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub bytes: u64,
    pub entries: usize,
}

pub fn inspect_pdf(path: &Path) -> Result<PdfSummary, String> {
    let mut file = File::open(path).map_err(|e| e.to_string())?;
    let bytes = file.metadata().map_err(|e| e.to_string())?.len();
    let mut header = [0u8; 16];
    let read = file.read(&mut header).map_err(|e| e.to_string())?;
    let header = &header[..read];
    if !header.starts_with(PDF_MAGIC) {
        return Err("missing '%PDF-' header".to_string());
    }
    let version = String::from_utf8_lossy(&header[PDF_MAGIC.len()..])
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect::<String>();
    Ok(PdfSummary {
        bytes,
        version: (!version.is_empty()).then_some(version),
    })
}

/// `.mldatx` files are zip archives (Open Packaging Conventions).
pub fn inspect_container(path: &Path) -> Result<ContainerSummary, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let bytes = file.metadata().map_err(|e| e.to_string())?.len();
    let archive = zip::ZipArchive::new(file).map_err(|e| format!("not a valid container: {}", e))?;
    if archive.is_empty() {
        return Err("container has no entries".to_string());
    }
    Ok(ContainerSummary {
        bytes,
        entries: archive.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pdf_header_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("report.pdf");
        std::fs::write(&good, b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n").unwrap();
        let summary = inspect_pdf(&good).unwrap();
        assert_eq!(summary.version.as_deref(), Some("1.7"));

        let bad = dir.path().join("bad.pdf");
        std::fs::write(&bad, b"<html>").unwrap();
        assert!(inspect_pdf(&bad).is_err());
    }

    #[test]
    fn container_must_be_a_non_empty_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.mldatx");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file("[Content_Types].xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.finish().unwrap();
        assert_eq!(inspect_container(&path).unwrap().entries, 1);

        let junk = dir.path().join("junk.mldatx");
        std::fs::write(&junk, b"not a zip").unwrap();
        assert!(inspect_container(&junk).is_err());
    }
}
