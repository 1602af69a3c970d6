//! Export service
//!
//! Writes a finished run to a session directory on disk:
//!
//! ```text
//! {base}/session_{YYYYmmdd_HHMMSS}_{8hex}/
//!     outline.json
//!     articles/section_01.md ...
//!     images/section_01.png ...
//!     article_combined.md
//!     manifest.json
//! ```

use crate::generation::ImageRef;
use crate::pipeline::assembler::{alt_text, assemble};
use crate::pipeline::types::{
    AggregateStatus, Document, ErrorInfo, Outline, SectionResult, SectionStatus,
};
use crate::pipeline::utils::section_file_stem;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

const SESSION_PREFIX: &str = "session_";
const ARTICLES_DIR: &str = "articles";
const IMAGES_DIR: &str = "images";

/// Export failures
#[derive(Error, Debug)]
pub enum ExportError {
    /// Filesystem operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being written or read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A JSON artifact could not be serialized
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        /// Path of the artifact
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl ExportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Paths written by an export
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// Session directory
    pub session_dir: PathBuf,
    /// `outline.json`
    pub outline_path: PathBuf,
    /// One Markdown file per succeeded section
    pub article_paths: Vec<PathBuf>,
    /// Downloaded images
    pub image_paths: Vec<PathBuf>,
    /// `article_combined.md`
    pub combined_path: PathBuf,
    /// `manifest.json`
    pub manifest_path: PathBuf,
    /// Non-fatal problems (e.g. failed image downloads)
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    topic: &'a str,
    status: AggregateStatus,
    exported_at: String,
    sections: Vec<ManifestSection<'a>>,
}

#[derive(Debug, Serialize)]
struct ManifestSection<'a> {
    index: usize,
    title: &'a str,
    status: SectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a ErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    article: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a ImageRef>,
}

/// Writes runs to session directories under a base directory
#[derive(Debug, Clone)]
pub struct ExportService {
    base_dir: PathBuf,
    http: reqwest::Client,
    download_timeout: Duration,
}

impl ExportService {
    /// Create a service rooted at `base_dir`
    ///
    /// `http` is used to download remote images; each download is bounded
    /// by `download_timeout`.
    pub fn new(
        base_dir: impl Into<PathBuf>,
        http: reqwest::Client,
        download_timeout: Duration,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            http,
            download_timeout,
        }
    }

    /// Create a fresh session directory with `articles/` and `images/`
    pub async fn create_session_dir(&self) -> Result<PathBuf, ExportError> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        let session_dir = self
            .base_dir
            .join(format!("{}{}_{}", SESSION_PREFIX, timestamp, &suffix[..8]));

        for dir in [session_dir.join(ARTICLES_DIR), session_dir.join(IMAGES_DIR)] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| ExportError::io(&dir, e))?;
        }

        tracing::info!(session_dir = %session_dir.display(), "Created session directory");
        Ok(session_dir)
    }

    /// Write outline, sections, images, combined article and manifest
    ///
    /// A failed image download drops that image with a warning; it never
    /// fails the export.
    pub async fn export(
        &self,
        session_dir: &Path,
        outline: &Outline,
        document: &Document,
    ) -> Result<ExportSummary, ExportError> {
        let outline_path = session_dir.join("outline.json");
        write_json(&outline_path, outline).await?;

        let mut warnings = Vec::new();
        let mut image_paths = Vec::new();
        let mut sections: Vec<SectionResult> = Vec::with_capacity(document.sections.len());

        for result in &document.sections {
            let mut result = result.clone();
            if let Some(ImageRef::Remote(url)) = &result.image {
                let relative = format!("{}/{}.png", IMAGES_DIR, section_file_stem(result.index));
                let path = session_dir.join(&relative);
                match self.download(url, &path).await {
                    Ok(()) => {
                        image_paths.push(path);
                        result.image = Some(ImageRef::Local(relative));
                    }
                    Err(e) => {
                        tracing::warn!(index = result.index, error = %e, "Image download failed");
                        warnings.push(format!(
                            "Section {}: image download failed: {}",
                            result.index + 1,
                            e
                        ));
                        result.image = None;
                    }
                }
            }
            sections.push(result);
        }

        let mut article_paths = Vec::new();
        for (descriptor, result) in outline.sections.iter().zip(&sections) {
            let Some(text) = result.text.as_deref().filter(|_| result.is_succeeded()) else {
                continue;
            };
            let path = session_dir
                .join(ARTICLES_DIR)
                .join(format!("{}.md", section_file_stem(result.index)));
            let mut content = format!("## {}\n\n", descriptor.title);
            if let Some(image) = &result.image {
                content.push_str(&format!("![{}](../{})\n\n", alt_text(descriptor), image.location()));
            }
            content.push_str(text.trim_end());
            content.push('\n');
            write_file(&path, content.as_bytes()).await?;
            article_paths.push(path);
        }

        let localized = assemble(outline, sections);
        let combined_path = session_dir.join("article_combined.md");
        write_file(&combined_path, localized.markdown.as_bytes()).await?;

        let manifest = Manifest {
            topic: &outline.topic,
            status: localized.status,
            exported_at: chrono::Local::now().to_rfc3339(),
            sections: outline
                .sections
                .iter()
                .zip(&localized.sections)
                .map(|(descriptor, result)| ManifestSection {
                    index: result.index,
                    title: &descriptor.title,
                    status: result.status,
                    error: result.error.as_ref(),
                    warning: result.warning.as_deref(),
                    article: result.is_succeeded().then(|| {
                        format!("{}/{}.md", ARTICLES_DIR, section_file_stem(result.index))
                    }),
                    image: result.image.as_ref(),
                })
                .collect(),
        };
        let manifest_path = session_dir.join("manifest.json");
        write_json(&manifest_path, &manifest).await?;

        tracing::info!(
            session_dir = %session_dir.display(),
            articles = article_paths.len(),
            images = image_paths.len(),
            warnings = warnings.len(),
            "Export complete"
        );

        Ok(ExportSummary {
            session_dir: session_dir.to_path_buf(),
            outline_path,
            article_paths,
            image_paths,
            combined_path,
            manifest_path,
            warnings,
        })
    }

    /// Remove session directories older than `max_age`
    ///
    /// Returns the number of directories removed. Per-entry failures are
    /// logged and skipped.
    pub async fn clean_old_sessions(&self, max_age: Duration) -> usize {
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(base_dir = %self.base_dir.display(), error = %e, "No sessions to clean");
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read session entry");
                    break;
                }
            };

            let path = entry.path();
            let is_session = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SESSION_PREFIX));
            if !is_session {
                continue;
            }

            let modified = match entry.metadata().await {
                Ok(metadata) if metadata.is_dir() => metadata.modified(),
                Ok(_) => continue,
                Err(e) => Err(e),
            };
            let age = match modified {
                Ok(modified) => now.duration_since(modified).unwrap_or(Duration::ZERO),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to read session metadata");
                    continue;
                }
            };

            if age >= max_age {
                match fs::remove_dir_all(&path).await {
                    Ok(()) => {
                        tracing::info!(path = %path.display(), "Removed old session");
                        removed += 1;
                    }
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "Failed to remove session");
                    }
                }
            }
        }
        removed
    }

    async fn download(&self, url: &str, path: &Path) -> Result<(), String> {
        let bytes = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| e.to_string())?
            .bytes()
            .await
            .map_err(|e| e.to_string())?;
        fs::write(path, &bytes).await.map_err(|e| e.to_string())
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    fs::write(path, contents)
        .await
        .map_err(|e| ExportError::io(path, e))
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| ExportError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, json.as_bytes()).await
}
