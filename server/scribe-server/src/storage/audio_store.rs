//! Uploaded recordings on local disk.

use std::path::{Path, PathBuf};

use database_layer::AudioReference;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// MIME types accepted for consultation recordings.
pub const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/x-wav",
    "audio/wave",
    "audio/webm",
    "audio/ogg",
    "audio/mp4",
    "audio/m4a",
    "audio/x-m4a",
    "audio/aac",
    "audio/flac",
];

/// Compares the essence only, so `audio/webm;codecs=opus` is accepted.
pub fn is_allowed_audio_type(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_AUDIO_TYPES.contains(&essence.as_str())
}

fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/webm" => "webm",
        "audio/ogg" => "ogg",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/aac" => "aac",
        "audio/flac" => "flac",
        _ => "bin",
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the recording under a fresh name and returns its reference.
    /// The client's file name is recorded but never used as a path.
    pub async fn save(
        &self,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> std::io::Result<AudioReference> {
        fs::create_dir_all(&self.root).await?;
        let stored_name = format!("{}.{}", Uuid::new_v4(), extension_for(mime_type));
        let path = self.root.join(&stored_name);
        fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Stored consultation audio");

        Ok(AudioReference {
            file_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes: bytes.len() as u64,
            sha256: sha256_hex(bytes),
            storage_path: path.to_string_lossy().into_owned(),
        })
    }

    /// Deletes a recording written by [`AudioStore::save`]. A file that is
    /// already gone is not an error.
    pub async fn remove(&self, reference: &AudioReference) -> std::io::Result<()> {
        match fs::remove_file(&reference.storage_path).await {
            Ok(()) => {
                debug!(path = %reference.storage_path, "Removed consultation audio");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Number of stored recordings.
    pub async fn file_count(&self) -> std::io::Result<usize> {
        let mut count = 0;
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("scribe-audio-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_allow_list() {
        assert!(is_allowed_audio_type("audio/wav"));
        assert!(is_allowed_audio_type("Audio/WebM; codecs=opus"));
        assert!(!is_allowed_audio_type("video/mp4"));
        assert!(!is_allowed_audio_type("application/octet-stream"));
        assert!(!is_allowed_audio_type(""));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_save_writes_file_and_reference() {
        let store = AudioStore::new(temp_root());
        let reference = store.save("../../etc/passwd", "audio/wav", b"RIFF....").await.unwrap();
        assert_eq!(reference.size_bytes, 8);
        assert_eq!(reference.file_name, "../../etc/passwd");
        assert!(reference.storage_path.ends_with(".wav"));
        assert!(Path::new(&reference.storage_path).starts_with(store.root()));
        assert_eq!(store.file_count().await.unwrap(), 1);
        let _ = fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn test_mixed_case_mime_keeps_extension() {
        let store = AudioStore::new(temp_root());
        let reference = store.save("visit.WAV", "Audio/WAV", b"RIFF").await.unwrap();
        assert!(reference.storage_path.ends_with(".wav"));
        assert_eq!(extension_for("AUDIO/WEBM; codecs=opus"), "webm");
        let _ = fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn test_remove_deletes_file_once() {
        let store = AudioStore::new(temp_root());
        let reference = store.save("a.ogg", "audio/ogg", b"OggS").await.unwrap();
        store.remove(&reference).await.unwrap();
        assert_eq!(store.file_count().await.unwrap(), 0);
        store.remove(&reference).await.unwrap();
        let _ = fs::remove_dir_all(store.root()).await;
    }

    #[tokio::test]
    async fn test_missing_root_counts_zero() {
        assert_eq!(AudioStore::new(temp_root()).file_count().await.unwrap(), 0);
    }
}
