//! Cached show artwork and the `tvshow.nfo` written into show folders.

use std::path::{Path, PathBuf};

use showrunner_core::{Show, ShowData, ShowId};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ArtworkError {
    #[error("download failed: {0}")]
    Network(String),
    #[error("download returned HTTP {0}")]
    Status(u16),
    #[error("not an http(s) artwork url: {0:?}")]
    UnsupportedUrl(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct ArtworkCache {
    dir: PathBuf,
    client: reqwest::Client,
}

impl ArtworkCache {
    pub fn new(dir: PathBuf) -> Self {
        Self::with_client(dir, reqwest::Client::new())
    }

    pub fn with_client(dir: PathBuf, client: reqwest::Client) -> Self {
        Self { dir, client }
    }

    pub fn show_dir(&self, id: ShowId) -> PathBuf {
        self.dir
            .join("shows")
            .join(format!("{}-{}", id.indexer, id.id))
    }

    /// Download any poster/fanart the cache does not hold yet. Returns how many files were fetched.
    pub async fn refresh(&self, show: &Show) -> Result<usize, ArtworkError> {
        let (poster, backdrop) = show.read(|d| (d.poster_url.clone(), d.backdrop_url.clone()));
        let dir = self.show_dir(show.id());
        tokio::fs::create_dir_all(&dir).await?;

        let mut fetched = 0;
        for (name, url) in [("poster", poster), ("fanart", backdrop)] {
            let Some(url) = url else { continue };
            let path = dir.join(format!("{name}.{}", image_extension(&url)));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            self.download(&url, &path).await?;
            fetched += 1;
        }
        debug!(show = %show.id(), fetched, "artwork cache refreshed");
        Ok(fetched)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), ArtworkError> {
        let parsed =
            reqwest::Url::parse(url).map_err(|_| ArtworkError::UnsupportedUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ArtworkError::UnsupportedUrl(url.to_string()));
        }
        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| ArtworkError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ArtworkError::Status(resp.status().as_u16()));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ArtworkError::Network(e.to_string()))?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    pub async fn purge(&self, id: ShowId) -> Result<(), ArtworkError> {
        match tokio::fs::remove_dir_all(self.show_dir(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn image_extension(url: &str) -> &'static str {
    if url.to_ascii_lowercase().ends_with(".png") {
        "png"
    } else {
        "jpg"
    }
}

/// Write `tvshow.nfo` into the show folder.
pub async fn write_show_nfo(show: &Show) -> Result<PathBuf, ArtworkError> {
    let (location, xml) = show.read(|d| (d.location.clone(), render_nfo(show.id(), d)));
    if !tokio::fs::try_exists(&location).await.unwrap_or(false) {
        warn!(show = %show.id(), path = %location.display(), "show folder missing, nfo not written");
        return Err(ArtworkError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", location.display()),
        )));
    }
    let path = location.join("tvshow.nfo");
    tokio::fs::write(&path, xml).await?;
    Ok(path)
}

fn render_nfo(id: ShowId, data: &ShowData) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<tvshow>\n");
    push_tag(&mut xml, "title", Some(&data.name));
    push_tag(&mut xml, "plot", data.overview.as_deref());
    push_tag(&mut xml, "studio", data.network.as_deref());
    push_tag(&mut xml, "status", data.status.as_deref());
    let premiered = data.first_aired.map(|d| d.format("%Y-%m-%d").to_string());
    push_tag(&mut xml, "premiered", premiered.as_deref());
    for genre in &data.genres {
        push_tag(&mut xml, "genre", Some(genre));
    }
    xml.push_str(&format!(
        "  <uniqueid type=\"{}\" default=\"true\">{}</uniqueid>\n",
        id.indexer, id.id
    ));
    if let Some(imdb) = data.imdb_id.as_deref() {
        xml.push_str(&format!(
            "  <uniqueid type=\"imdb\">{}</uniqueid>\n",
            xml_escape(imdb)
        ));
    }
    xml.push_str("</tvshow>\n");
    xml
}

fn push_tag(xml: &mut String, tag: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        xml.push_str(&format!("  <{tag}>{}</{tag}>\n", xml_escape(value)));
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
