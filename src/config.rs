// Credential and output-path resolution. Each value is prompted for with
// the previously stored value shown as the default, then written back
// through the store so the next run can reuse it.

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The five values persisted between runs, stored as a flat plaintext
/// JSON document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Secrets {
    pub url: String,
    pub username: String,
    pub password: String,
    pub image_path: String,
    pub transcription_path: String,
}

/// Fully resolved configuration for one run. Both directories exist by
/// the time this is handed to the rest of the program.
#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub username: String,
    pub password: String,
    pub image_dir: PathBuf,
    pub transcription_dir: PathBuf,
}

/// Where secrets live between runs. File-backed in the binary, in-memory
/// in tests.
pub trait SecretStore {
    fn load(&self) -> Option<Secrets>;
    fn save(&mut self, secrets: &Secrets) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Secrets persisted as a JSON file, by default in the user's home
/// directory.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn in_home() -> Self {
        let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        FileStore {
            path: dir.join(".escriptorium-fetcher.json"),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        FileStore { path }
    }
}

impl SecretStore for FileStore {
    fn load(&self) -> Option<Secrets> {
        let data = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&data).ok()
    }

    fn save(&mut self, secrets: &Secrets) -> Result<()> {
        let data = serde_json::to_string_pretty(secrets)?;
        fs::write(&self.path, data)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove {}", self.path.display()))
            }
        }
    }
}

/// Store that never touches disk; used by tests.
#[derive(Default)]
pub struct MemoryStore {
    secrets: Option<Secrets>,
}

impl SecretStore for MemoryStore {
    fn load(&self) -> Option<Secrets> {
        self.secrets.clone()
    }

    fn save(&mut self, secrets: &Secrets) -> Result<()> {
        self.secrets = Some(secrets.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.secrets = None;
        Ok(())
    }
}

/// Create a directory and any missing parents. Safe to call when the
/// directory already exists.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))
}

/// Prompt for a value, offering `default` when it is non-empty.
fn prompt_with_default(prompt: &str, default: &str) -> Result<String> {
    if default.is_empty() {
        Ok(Input::<String>::new().with_prompt(prompt).interact_text()?)
    } else {
        Ok(Input::<String>::new()
            .with_prompt(prompt)
            .default(default.to_string())
            .interact_text()?)
    }
}

/// Prompt hidden and re-ask until the entered password is non-empty.
fn prompt_password() -> Result<String> {
    loop {
        let entered = Password::new()
            .with_prompt("eScriptorium password")
            .allow_empty_password(true)
            .interact()?;
        if !entered.is_empty() {
            return Ok(entered);
        }
    }
}

/// Collect URL, username, password and the two output paths, reusing
/// stored values as defaults, create the output directories and persist
/// the answers back through the store.
///
/// `reset_password` discards the stored password and forces a fresh
/// (non-empty) one.
pub fn resolve_settings(store: &mut dyn SecretStore, reset_password: bool) -> Result<Settings> {
    let stored = store.load().unwrap_or_default();

    let url = prompt_with_default("eScriptorium URL", &stored.url)?;
    let url = url.trim_end_matches('/').to_string();

    let username = prompt_with_default("eScriptorium username", &stored.username)?;

    let password = if reset_password || stored.password.is_empty() {
        prompt_password()?
    } else {
        stored.password.clone()
    };

    let image_default = if stored.image_path.is_empty() {
        "./images".to_string()
    } else {
        stored.image_path.clone()
    };
    let image_path = prompt_with_default("Path for the images", &image_default)?;
    let image_path = image_path.trim_end_matches('/').to_string();

    let transcription_default = if stored.transcription_path.is_empty() {
        "./alto".to_string()
    } else {
        stored.transcription_path.clone()
    };
    let transcription_path =
        prompt_with_default("Path for the transcriptions", &transcription_default)?;
    let transcription_path = transcription_path.trim_end_matches('/').to_string();

    let image_dir = PathBuf::from(&image_path);
    let transcription_dir = PathBuf::from(&transcription_path);
    ensure_dir(&image_dir)?;
    ensure_dir(&transcription_dir)?;

    store.save(&Secrets {
        url: url.clone(),
        username: username.clone(),
        password: password.clone(),
        image_path,
        transcription_path,
    })?;

    Ok(Settings {
        url,
        username,
        password,
        image_dir,
        transcription_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_secrets() -> Secrets {
        Secrets {
            url: "https://escriptorium.example.org".into(),
            username: "reader".into(),
            password: "hunter2".into(),
            image_path: "/data/images".into(),
            transcription_path: "/data/alto".into(),
        }
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::at(dir.path().join("secrets.json"));
        assert!(store.load().is_none());

        let secrets = sample_secrets();
        store.save(&secrets).unwrap();
        assert_eq!(store.load(), Some(secrets));
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::at(dir.path().join("secrets.json"));
        store.save(&sample_secrets()).unwrap();

        store.clear().unwrap();
        assert!(store.load().is_none());
        // clearing again must not fail on the missing file
        store.clear().unwrap();
    }

    #[test]
    fn file_store_ignores_corrupt_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        fs::write(&path, "not json at all").unwrap();
        let store = FileStore::at(path);
        assert!(store.load().is_none());
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::default();
        assert!(store.load().is_none());
        store.save(&sample_secrets()).unwrap();
        assert_eq!(store.load(), Some(sample_secrets()));
        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn ensure_dir_leaves_existing_siblings_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("images");
        ensure_dir(&target).unwrap();
        fs::write(target.join("existing.png"), b"pixels").unwrap();

        // re-creating the directory must not raise or touch the file
        ensure_dir(&target).unwrap();
        assert_eq!(fs::read(target.join("existing.png")).unwrap(), b"pixels");
    }

    #[test]
    fn ensure_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("c");
        ensure_dir(&target).unwrap();
        assert!(target.is_dir());
    }
}
