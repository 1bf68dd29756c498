//! Dataset sources: where profile files are listed and fetched from.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::SourceConfig;

/// Trait for sources that can list and fetch dataset files.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// List available dataset files.
    async fn list_files(&self) -> Result<Vec<RemoteFile>>;

    /// Fetch the raw bytes of one file.
    async fn fetch_file(&self, file: &RemoteFile) -> Result<Bytes>;
}

/// A listed dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// File name, used as the dataset id
    pub name: String,
    /// URL or filesystem path
    pub location: String,
}

// ============================================================================
// HTTP directory listing
// ============================================================================

/// HTML directory index served over HTTP(S).
pub struct HttpDirectorySource {
    client: Client,
    base_url: String,
    suffix: String,
}

impl HttpDirectorySource {
    pub fn new(base_url: &str, suffix: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            suffix: suffix.to_string(),
        })
    }

    fn file_url(&self, href: &str) -> String {
        if href.contains("://") {
            href.to_string()
        } else {
            format!("{}/{}", self.base_url.trim_end_matches('/'), href)
        }
    }
}

#[async_trait]
impl DatasetSource for HttpDirectorySource {
    #[instrument(skip(self), fields(url = %self.base_url))]
    async fn list_files(&self) -> Result<Vec<RemoteFile>> {
        let response = self.client.get(&self.base_url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Directory listing failed: {}", response.status()));
        }

        let body = response.text().await?;
        let files = unique_names(
            parse_directory_listing(&body, &self.suffix)
                .into_iter()
                .map(|href| RemoteFile {
                    name: file_name(&href).to_string(),
                    location: self.file_url(&href),
                })
                .collect(),
        );

        info!(count = files.len(), "Listed files");
        Ok(files)
    }

    #[instrument(skip(self), fields(url = %file.location))]
    async fn fetch_file(&self, file: &RemoteFile) -> Result<Bytes> {
        debug!("Downloading file");

        let response = self.client.get(&file.location).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Download failed: {}", response.status()));
        }

        let bytes = response.bytes().await?;
        debug!(size = bytes.len(), "Downloaded file");
        Ok(bytes)
    }
}

/// Every `href` target in an HTML listing that ends with `suffix`, in
/// document order, without duplicates.
pub fn parse_directory_listing(body: &str, suffix: &str) -> Vec<String> {
    let mut hrefs: Vec<String> = Vec::new();
    for chunk in body.split("href=").skip(1) {
        let Some(quote) = chunk.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let rest = &chunk[1..];
        let Some(end) = rest.find(quote) else {
            continue;
        };
        let href = &rest[..end];
        if href.ends_with(suffix) && !hrefs.iter().any(|h| h == href) {
            hrefs.push(href.to_string());
        }
    }
    hrefs
}

fn file_name(href: &str) -> &str {
    href.rsplit('/').next().unwrap_or(href)
}

/// Keep the first file for each name.
///
/// The name becomes the dataset id, so two locations sharing it would
/// overwrite each other's outputs.
pub fn unique_names(files: Vec<RemoteFile>) -> Vec<RemoteFile> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|file| {
            let first = seen.insert(file.name.clone());
            if !first {
                warn!(name = %file.name, location = %file.location, "Skipping file with duplicate name");
            }
            first
        })
        .collect()
}

// ============================================================================
// Local directory
// ============================================================================

/// Directory tree on the local filesystem.
pub struct LocalDirectorySource {
    root: PathBuf,
    suffix: String,
}

impl LocalDirectorySource {
    pub fn new(root: impl Into<PathBuf>, suffix: &str) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.to_string(),
        }
    }
}

#[async_trait]
impl DatasetSource for LocalDirectorySource {
    async fn list_files(&self) -> Result<Vec<RemoteFile>> {
        let root = self.root.clone();
        let suffix = self.suffix.clone();

        let mut files = tokio::task::spawn_blocking(move || -> Result<Vec<RemoteFile>> {
            let mut files = Vec::new();
            for entry in WalkDir::new(&root).follow_links(true) {
                let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().is_file() && name.ends_with(&suffix) {
                    files.push(RemoteFile {
                        name,
                        location: entry.path().display().to_string(),
                    });
                }
            }
            Ok(files)
        })
        .await??;

        files.sort_by(|a, b| a.location.cmp(&b.location));
        let files = unique_names(files);
        info!(count = files.len(), root = %self.root.display(), "Listed files");
        Ok(files)
    }

    async fn fetch_file(&self, file: &RemoteFile) -> Result<Bytes> {
        let data = tokio::fs::read(&file.location)
            .await
            .with_context(|| format!("Failed to read {}", file.location))?;
        Ok(Bytes::from(data))
    }
}

/// Create the source for a source config.
pub fn create_source(config: &SourceConfig, timeout: Duration) -> Result<Box<dyn DatasetSource>> {
    Ok(match config {
        SourceConfig::Http { url, suffix } => {
            Box::new(HttpDirectorySource::new(url, suffix, timeout)?)
        }
        SourceConfig::Local { path, suffix } => Box::new(LocalDirectorySource::new(path, suffix)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::temp_test_dir;

    const LISTING: &str = r#"<html><body><h1>Index of /geo/indian_ocean/2025/08</h1>
<pre><a href="?C=N;O=D">Name</a> <a href="/geo/indian_ocean/2025/">Parent Directory</a>
<a href="20250801_prof.nc">20250801_prof.nc</a>  2025-08-02 03:11  1.2M
<a href="20250802_prof.nc">20250802_prof.nc</a>  2025-08-03 03:09  1.1M
<a href='20250803_prof.nc'>20250803_prof.nc</a><a href="20250803_prof.nc.md5">md5</a>
<a href="20250801_prof.nc">again</a>
</pre></body></html>"#;

    #[test]
    fn test_parse_directory_listing() {
        let hrefs = parse_directory_listing(LISTING, ".nc");
        assert_eq!(
            hrefs,
            vec!["20250801_prof.nc", "20250802_prof.nc", "20250803_prof.nc"]
        );
    }

    #[test]
    fn test_file_urls() {
        let source = HttpDirectorySource::new(
            "https://data-argo.ifremer.fr/geo/indian_ocean/2025/08/",
            ".nc",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            source.file_url("20250801_prof.nc"),
            "https://data-argo.ifremer.fr/geo/indian_ocean/2025/08/20250801_prof.nc"
        );
        assert_eq!(source.file_url("https://mirror/x.nc"), "https://mirror/x.nc");
        assert_eq!(file_name("sub/dir/x.nc"), "x.nc");
    }

    #[tokio::test]
    async fn test_local_source_lists_and_reads() {
        let dir = temp_test_dir();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.nc"), b"bbb").unwrap();
        std::fs::write(dir.path().join("nested/a.nc"), b"a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let source = LocalDirectorySource::new(dir.path(), ".nc");
        let files = source.list_files().await.unwrap();

        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.nc", "a.nc"]);
        assert_eq!(source.fetch_file(&files[0]).await.unwrap(), Bytes::from_static(b"bbb"));
    }

    #[test]
    fn test_same_name_in_two_directories() {
        let listing = r#"<a href="a/x.nc">a</a> <a href="b/x.nc">b</a> <a href="b/y.nc">y</a>"#;
        let source =
            HttpDirectorySource::new("https://host/argo/", ".nc", Duration::from_secs(5)).unwrap();

        let files = unique_names(
            parse_directory_listing(listing, ".nc")
                .into_iter()
                .map(|href| RemoteFile {
                    name: file_name(&href).to_string(),
                    location: source.file_url(&href),
                })
                .collect(),
        );

        assert_eq!(
            files,
            vec![
                RemoteFile {
                    name: "x.nc".to_string(),
                    location: "https://host/argo/a/x.nc".to_string(),
                },
                RemoteFile {
                    name: "y.nc".to_string(),
                    location: "https://host/argo/b/y.nc".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_local_source_skips_duplicate_names() {
        let dir = temp_test_dir();
        for sub in ["a", "b"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
            std::fs::write(dir.path().join(sub).join("x.nc"), sub.as_bytes()).unwrap();
        }

        let source = LocalDirectorySource::new(dir.path(), ".nc");
        let files = source.list_files().await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "x.nc");
        assert_eq!(source.fetch_file(&files[0]).await.unwrap(), Bytes::from_static(b"a"));
    }
}
