// API client module: a small blocking HTTP client for the eScriptorium
// REST API. It is intentionally synchronous: the fetch workflow is one
// sequential pipeline, so there is nothing useful to overlap.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;

/// Blocking API client holding a reqwest client, the server base URL and
/// the auth token obtained at connect time.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

/// A project groups documents on the server.
#[derive(Deserialize, Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A document as returned by `/api/documents/`. The `project` field holds
/// the owning project's slug; the document list endpoint is unfiltered, so
/// the caller filters on it.
#[derive(Deserialize, Debug, Clone)]
pub struct Document {
    pub pk: i64,
    pub name: String,
    pub project: String,
}

/// A transcription layer attached to a document.
#[derive(Deserialize, Debug, Clone)]
pub struct Transcription {
    pub pk: i64,
    pub name: String,
}

/// Reference to a part's image file on the server.
#[derive(Deserialize, Debug, Clone)]
pub struct PartImage {
    pub uri: String,
}

/// One page of a document; the unit of the download loop.
#[derive(Deserialize, Debug, Clone)]
pub struct DocumentPart {
    pub pk: i64,
    pub title: String,
    pub filename: String,
    pub image: PartImage,
}

/// eScriptorium paginates every list endpoint. `next` is an absolute URL
/// to the following page, or null on the last one.
#[derive(Deserialize, Debug)]
struct Page<T> {
    next: Option<String>,
    results: Vec<T>,
}

/// Expected response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// The server operations the download loop needs. `ApiClient` is the real
/// implementation; tests drive the loop with an in-memory one instead.
pub trait Remote {
    fn list_parts(&self, document_pk: i64) -> Result<Vec<DocumentPart>>;
    /// Fetch a part's image by its `image.uri` reference, returning the
    /// raw bytes untouched. Fetching by reference works regardless of the
    /// part's metadata, so it is the only image access path here.
    fn fetch_image(&self, uri: &str) -> Result<Vec<u8>>;
    /// Fetch the ALTO export for one part and one transcription layer:
    /// the raw bytes of a single-entry zip archive.
    fn fetch_alto_export(
        &self,
        document_pk: i64,
        part_pk: i64,
        transcription_pk: i64,
    ) -> Result<Vec<u8>>;
}

impl ApiClient {
    /// Authenticate against `{base}/api/token-auth/` and return a client
    /// that sends the obtained token on every later request.
    pub fn connect(url: &str, username: &str, password: &str) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let auth_url = format!("{}/api/token-auth/", base_url);
        let res = client
            .post(&auth_url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .context("Failed to send auth request")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_else(|_| "".into());
            anyhow::bail!("Login failed: {} - {}", status, txt);
        }
        let resp: TokenResponse = res.json().context("Parsing auth response json")?;
        Ok(ApiClient {
            client,
            base_url,
            token: resp.token,
        })
    }

    /// Build the Authorization header map carrying the session token.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let val = format!("Token {}", self.token);
        if let Ok(v) = HeaderValue::from_str(&val) {
            headers.insert(AUTHORIZATION, v);
        }
        headers
    }

    /// Fetch every page of a paginated list endpoint, following `next`
    /// links until the server reports no more.
    fn get_all<T: serde::de::DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            let res = self
                .client
                .get(&url)
                .headers(self.auth_headers())
                .send()
                .with_context(|| format!("Failed to request {}", url))?;
            if !res.status().is_success() {
                let status = res.status();
                let txt = res.text().unwrap_or_else(|_| "".into());
                anyhow::bail!("Request to {} failed: {} - {}", url, status, txt);
            }
            let page: Page<T> = res
                .json()
                .with_context(|| format!("Parsing response from {}", url))?;
            out.extend(page.results);
            next = page.next;
        }
        Ok(out)
    }

    /// GET a URL and return the response body as raw bytes.
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .client
            .get(url)
            .headers(self.auth_headers())
            .send()
            .with_context(|| format!("Failed to request {}", url))?;
        if !res.status().is_success() {
            anyhow::bail!("Download from {} failed: {}", url, res.status());
        }
        let bytes = res
            .bytes()
            .with_context(|| format!("Reading body from {}", url))?;
        Ok(bytes.to_vec())
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.get_all(format!("{}/api/projects/", self.base_url))
    }

    pub fn list_documents(&self) -> Result<Vec<Document>> {
        self.get_all(format!("{}/api/documents/", self.base_url))
    }

    pub fn list_transcriptions(&self, document_pk: i64) -> Result<Vec<Transcription>> {
        self.get_all(format!(
            "{}/api/documents/{}/transcriptions/",
            self.base_url, document_pk
        ))
    }
}

impl Remote for ApiClient {
    fn list_parts(&self, document_pk: i64) -> Result<Vec<DocumentPart>> {
        self.get_all(format!(
            "{}/api/documents/{}/parts/",
            self.base_url, document_pk
        ))
    }

    fn fetch_image(&self, uri: &str) -> Result<Vec<u8>> {
        // Image URIs come back server-relative (`/media/...`) but may be
        // absolute on some deployments.
        let url = if uri.starts_with("http") {
            uri.to_string()
        } else {
            format!("{}{}", self.base_url, uri)
        };
        self.get_bytes(&url)
    }

    fn fetch_alto_export(
        &self,
        document_pk: i64,
        part_pk: i64,
        transcription_pk: i64,
    ) -> Result<Vec<u8>> {
        let url = format!(
            "{}/api/documents/{}/parts/{}/transcriptions/{}/alto/",
            self.base_url, document_pk, part_pk, transcription_pk
        );
        self.get_bytes(&url)
    }
}
