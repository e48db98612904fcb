use std::path::Path;

use super::WidgetError;
use crate::models::attachment::AttachedFile;

/// Extensions the file picker offers, with the media type sent for each.
/// This only narrows the picker; the server accepts whatever arrives.
const ACCEPTED: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("csv", "text/csv"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tiff", "image/tiff"),
    ("svg", "image/svg+xml"),
];

pub fn accepted_extensions() -> impl Iterator<Item = &'static str> {
    ACCEPTED.iter().map(|(ext, _)| *ext)
}

pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED.iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, media_type)| *media_type)
}

/// Reads a file from disk for staging, refusing extensions outside the list.
pub async fn load_attachment(path: &Path) -> Result<AttachedFile, WidgetError> {
    let media_type = media_type_for(path).ok_or_else(||
        WidgetError::UnsupportedFile(path.display().to_string())
    )?;
    let data = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(AttachedFile::new(name, media_type, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn maps_extensions_case_insensitively() {
        assert_eq!(media_type_for(Path::new("scan.PDF")), Some("application/pdf"));
        assert_eq!(media_type_for(Path::new("a/b/photo.JpG")), Some("image/jpeg"));
        assert_eq!(media_type_for(Path::new("notes.md")), Some("text/markdown"));
    }

    #[test]
    fn rejects_unlisted_or_missing_extensions() {
        assert_eq!(media_type_for(Path::new("run.exe")), None);
        assert_eq!(media_type_for(Path::new("Makefile")), None);
    }

    #[test]
    fn allow_list_covers_each_category() {
        let exts: Vec<_> = accepted_extensions().collect();
        for ext in ["pdf", "docx", "xlsx", "csv", "png", "svg", "txt", "json", "md"] {
            assert!(exts.contains(&ext), "{}", ext);
        }
    }

    #[tokio::test]
    async fn loads_accepted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.csv");
        std::fs::write(&path, "rate,term\n6.5,30\n").unwrap();

        let file = load_attachment(&path).await.unwrap();
        assert_eq!(file.name, "rates.csv");
        assert_eq!(file.media_type, "text/csv");
        assert_eq!(file.data, b"rate,term\n6.5,30\n");
    }

    #[tokio::test]
    async fn refuses_before_reading_disallowed_file() {
        let err = load_attachment(&PathBuf::from("/nonexistent/tool.sh")).await.unwrap_err();
        assert!(matches!(err, WidgetError::UnsupportedFile(_)));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = load_attachment(Path::new("/nonexistent/report.pdf")).await.unwrap_err();
        assert!(matches!(err, WidgetError::Io(_)));
    }
}
