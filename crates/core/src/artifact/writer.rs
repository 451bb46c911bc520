//! File system artifact writer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::ArtifactError;
use crate::appliance::ArtifactPayload;
use crate::config::OutputConfig;
use crate::report::{ReportArtifact, ReportUser};

/// Replace characters that would escape or split a path component.
pub fn sanitize_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Decode the base64 text of a report. Line breaks and padding whitespace are ignored.
pub fn decode_payload(data: &str) -> Result<Vec<u8>, ArtifactError> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ArtifactError::Decode(e.to_string()))
}

/// Writes report archives under a results root.
///
/// Ticket reports go to `<root>/<sub-request>/<initials>.zip`; flat-list reports
/// go to `<root>/<initials>_<start>_<end>.zip`. Existing files are replaced.
/// Within one run, [`unique_path_for`] keeps two users from sharing a file.
///
/// [`unique_path_for`]: ArtifactWriter::unique_path_for
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    results_dir: PathBuf,
    verify_checksum: bool,
}

impl ArtifactWriter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            results_dir: config.results_dir.clone(),
            verify_checksum: config.verify_checksum,
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Destination path for `user`'s report.
    pub fn path_for(&self, user: &ReportUser) -> PathBuf {
        match &user.origin {
            Some(origin) => self
                .results_dir
                .join(sanitize_component(&origin.sub_request_id))
                .join(format!("{}.zip", sanitize_component(&user.initials))),
            None => self.results_dir.join(format!(
                "{}_{}.zip",
                sanitize_component(&user.initials),
                user.window.file_suffix()
            )),
        }
    }

    /// Like [`path_for`](Self::path_for), but suffixed `_2`, `_3`, ... until the
    /// path is not in `taken`.
    pub fn unique_path_for(&self, user: &ReportUser, taken: &HashSet<PathBuf>) -> PathBuf {
        let base = self.path_for(user);
        if !taken.contains(&base) {
            return base;
        }

        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut n = 2;
        loop {
            let candidate = base.with_file_name(format!("{}_{}.zip", stem, n));
            if !taken.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Decode, verify and write `payload` for `user` at its default path.
    pub async fn write(
        &self,
        user: &ReportUser,
        payload: &ArtifactPayload,
    ) -> Result<ReportArtifact, ArtifactError> {
        self.write_to(self.path_for(user), user, payload).await
    }

    /// Decode, verify and write `payload` for `user` at `path`.
    pub async fn write_to(
        &self,
        path: PathBuf,
        user: &ReportUser,
        payload: &ArtifactPayload,
    ) -> Result<ReportArtifact, ArtifactError> {
        let bytes = decode_payload(&payload.data)?;

        if self.verify_checksum {
            if let Some(expected) = &payload.md5 {
                let actual = format!("{:x}", md5::compute(&bytes));
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(ArtifactError::ChecksumMismatch {
                        path,
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ArtifactError::DirectoryCreationFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let tmp = path.with_extension("zip.part");
        Self::write_file(&tmp, &bytes).await?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| ArtifactError::WriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
        info!(user = %user.display_name, path = %path.display(), "Report saved");

        Ok(ReportArtifact {
            path,
            display_name: user.display_name.clone(),
            origin: user.origin.clone(),
        })
    }

    async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
        let map_err = |e: std::io::Error| ArtifactError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        };
        let mut file = File::create(path).await.map_err(map_err)?;
        file.write_all(bytes).await.map_err(map_err)?;
        file.sync_all().await.map_err(map_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportWindow, TicketOrigin};
    use tempfile::TempDir;

    fn window() -> ReportWindow {
        ReportWindow::from_appliance_bounds("00:00:01 2024/08/04", "23:59:59 2024/08/04").unwrap()
    }

    fn writer(dir: &Path) -> ArtifactWriter {
        ArtifactWriter::new(&OutputConfig {
            results_dir: dir.to_path_buf(),
            verify_checksum: true,
        })
    }

    fn ticket_user(name: &str, sub: &str) -> ReportUser {
        ReportUser::for_ticket(
            name,
            window(),
            TicketOrigin {
                ticket_id: "serviceCall$1".to_string(),
                sub_request_id: sub.to_string(),
                work_item_id: "data$1".to_string(),
            },
        )
    }

    fn payload(bytes: &[u8], with_md5: bool) -> ArtifactPayload {
        ArtifactPayload {
            data: STANDARD.encode(bytes),
            md5: with_md5.then(|| format!("{:x}", md5::compute(bytes))),
        }
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("RP/1"), "RP_1");
        assert_eq!(sanitize_component(r"a\b"), "a_b");
        assert_eq!(sanitize_component(".."), "_");
        assert_eq!(sanitize_component(""), "_");
        assert_eq!(sanitize_component("Иван П. С."), "Иван П. С.");
    }

    #[test]
    fn test_decode_payload_ignores_line_breaks() {
        let encoded = STANDARD.encode(b"PK\x03\x04 zip bytes");
        let (a, b) = encoded.split_at(8);
        let wrapped = format!("{}\r\n{}\n", a, b);
        assert_eq!(decode_payload(&wrapped).unwrap(), b"PK\x03\x04 zip bytes");
    }

    #[test]
    fn test_decode_payload_invalid() {
        assert!(matches!(
            decode_payload("not base64!!"),
            Err(ArtifactError::Decode(_))
        ));
    }

    #[test]
    fn test_path_for_ticket_user() {
        let w = writer(Path::new("Reports"));
        let path = w.path_for(&ticket_user("Иван Петрович Сидоров", "RP7"));
        assert_eq!(path, PathBuf::from("Reports/RP7/Иван П. С..zip"));
    }

    #[test]
    fn test_path_for_flat_user() {
        let w = writer(Path::new("Reports"));
        let path = w.path_for(&ReportUser::new("Ann Bee", window()));
        assert_eq!(
            path,
            PathBuf::from("Reports/Ann B._04-08-2024-T-00-00-01_04-08-2024-T-23-59-59.zip")
        );
    }

    #[test]
    fn test_unique_path_for_suffixes_taken_paths() {
        let w = writer(Path::new("Reports"));
        let petrov = ticket_user("Ivan Petrov", "S1");
        let pavlov = ticket_user("Ivan Pavlov", "S1");

        let mut taken = HashSet::new();
        let first = w.unique_path_for(&petrov, &taken);
        assert_eq!(first, PathBuf::from("Reports/S1/Ivan P..zip"));
        taken.insert(first);

        assert_eq!(
            w.unique_path_for(&pavlov, &taken),
            PathBuf::from("Reports/S1/Ivan P._2.zip")
        );
        taken.insert(PathBuf::from("Reports/S1/Ivan P._2.zip"));
        assert_eq!(
            w.unique_path_for(&pavlov, &taken),
            PathBuf::from("Reports/S1/Ivan P._3.zip")
        );

        // Other sub-requests are unaffected.
        assert_eq!(
            w.unique_path_for(&ticket_user("Ivan Pavlov", "S2"), &taken),
            PathBuf::from("Reports/S2/Ivan P..zip")
        );
    }

    #[tokio::test]
    async fn test_write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let w = writer(dir.path());
        let user = ticket_user("Ann Bee", "RP1");

        let artifact = w.write(&user, &payload(b"zip-data", true)).await.unwrap();

        assert_eq!(artifact.path, dir.path().join("RP1").join("Ann B..zip"));
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"zip-data");
        assert_eq!(artifact.origin, user.origin);
        assert!(!dir.path().join("RP1").join("Ann B..zip.part").exists());
    }

    #[tokio::test]
    async fn test_write_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let w = writer(dir.path());
        let user = ticket_user("Ann Bee", "RP1");

        w.write(&user, &payload(b"first", false)).await.unwrap();
        let artifact = w.write(&user, &payload(b"second", false)).await.unwrap();
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_write_checksum_mismatch() {
        let dir = TempDir::new().unwrap();
        let w = writer(dir.path());
        let user = ReportUser::new("Ann Bee", window());
        let mut p = payload(b"zip-data", true);
        p.md5 = Some("00000000000000000000000000000000".to_string());

        let err = w.write(&user, &p).await.unwrap_err();
        assert!(matches!(err, ArtifactError::ChecksumMismatch { .. }));
        assert!(!w.path_for(&user).exists());
    }

    #[tokio::test]
    async fn test_write_checksum_disabled_by_default() {
        let dir = TempDir::new().unwrap();
        let w = ArtifactWriter::new(&OutputConfig {
            results_dir: dir.path().to_path_buf(),
            ..OutputConfig::default()
        });
        let user = ReportUser::new("Ann Bee", window());
        let mut p = payload(b"zip-data", true);
        p.md5 = Some("00000000000000000000000000000000".to_string());

        assert!(w.write(&user, &p).await.is_ok());
    }
}
