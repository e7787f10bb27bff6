// Fetch orchestration: walks documents and their parts, downloading the
// page image and/or the ALTO transcription of each part. A failure on one
// part is recorded and reported, never aborting the rest of the run.

use crate::api::{Document, DocumentPart, Remote};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

/// Which halves of the per-part work are enabled.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub images: bool,
    pub transcriptions: bool,
}

/// Destination directories for the two kinds of output. Each document
/// gets a subdirectory named after it under both.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub image_dir: PathBuf,
    pub transcription_dir: PathBuf,
}

/// Outcome of one part, kept for the end-of-run summary. A failed part
/// carries every error it hit: the image and transcription sub-steps run
/// independently, so one part can fail twice.
#[derive(Debug)]
pub enum PartOutcome {
    Done { title: String },
    Failed { title: String, errors: Vec<anyhow::Error> },
}

/// Aggregate result of a run.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<PartOutcome>,
}

impl FetchReport {
    pub fn part_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PartOutcome::Failed { .. }))
            .count()
    }
}

/// Derive the transcription filename from the part's image filename: the
/// extension is replaced by `.xml`, not appended.
pub fn xml_filename(part_filename: &str) -> String {
    match part_filename.rsplit_once('.') {
        Some((stem, _)) => format!("{}.xml", stem),
        None => format!("{}.xml", part_filename),
    }
}

/// Read the sole entry of an ALTO export archive and return its
/// decompressed bytes.
pub fn read_single_entry(archive: &[u8]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).context("Opening export archive")?;
    if zip.len() == 0 {
        anyhow::bail!("Export archive has no entries");
    }
    let mut entry = zip.by_index(0).context("Reading export archive entry")?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .context("Decompressing export archive entry")?;
    Ok(bytes)
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg} {pos}/{len}").unwrap()
}

/// Download everything for the given documents. `transcription_pk` is the
/// layer chosen once for the whole run; it must be present when
/// `options.transcriptions` is set.
///
/// A failing part is printed as it happens and recorded in the report;
/// the loop then moves on to the next part. Listing a document's parts is
/// the only step that aborts the run, since without the list there is
/// nothing to continue with.
pub fn fetch_documents<R: Remote>(
    remote: &R,
    documents: &[Document],
    transcription_pk: Option<i64>,
    paths: &OutputPaths,
    options: FetchOptions,
) -> Result<FetchReport> {
    let mut report = FetchReport::default();
    for document in documents {
        let parts = remote
            .list_parts(document.pk)
            .with_context(|| format!("Failed to list parts of {}", document.name))?;
        let bar = ProgressBar::new(parts.len() as u64);
        bar.set_style(progress_style());
        bar.set_message(format!("Downloading {}", document.name));
        for part in &parts {
            let errors = fetch_part(remote, document, part, transcription_pk, paths, options);
            if errors.is_empty() {
                report.outcomes.push(PartOutcome::Done {
                    title: part.title.clone(),
                });
            } else {
                for e in &errors {
                    bar.println(format!("Error {}: {:#}", part.title, e));
                }
                report.outcomes.push(PartOutcome::Failed {
                    title: part.title.clone(),
                    errors,
                });
            }
            bar.inc(1);
        }
        bar.finish();
    }
    Ok(report)
}

/// Run both sub-steps for one part. An image failure never skips the
/// transcription step; every error is returned.
fn fetch_part<R: Remote>(
    remote: &R,
    document: &Document,
    part: &DocumentPart,
    transcription_pk: Option<i64>,
    paths: &OutputPaths,
    options: FetchOptions,
) -> Vec<anyhow::Error> {
    let mut errors = Vec::new();
    if options.images {
        if let Err(e) = save_image(remote, document, part, &paths.image_dir) {
            errors.push(e);
        }
    }
    if options.transcriptions {
        if let Some(pk) = transcription_pk {
            if let Err(e) = save_transcription(remote, document, part, pk, &paths.transcription_dir)
            {
                errors.push(e);
            }
        }
    }
    errors
}

/// Write the part's image verbatim to `{image_dir}/{document}/{filename}`.
/// The bytes are never decoded or re-encoded, so the original pixel data
/// survives untouched.
fn save_image<R: Remote>(
    remote: &R,
    document: &Document,
    part: &DocumentPart,
    image_dir: &Path,
) -> Result<()> {
    let bytes = remote.fetch_image(&part.image.uri)?;
    let dir = image_dir.join(&document.name);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let dest = dir.join(&part.filename);
    fs::write(&dest, bytes).with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(())
}

/// Fetch the part's ALTO export, unpack the single zip entry and write it
/// to `{transcription_dir}/{document}/{stem}.xml`.
fn save_transcription<R: Remote>(
    remote: &R,
    document: &Document,
    part: &DocumentPart,
    transcription_pk: i64,
    transcription_dir: &Path,
) -> Result<()> {
    let archive = remote.fetch_alto_export(document.pk, part.pk, transcription_pk)?;
    let xml = read_single_entry(&archive)?;
    let dir = transcription_dir.join(&document.name);
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let dest = dir.join(xml_filename(&part.filename));
    fs::write(&dest, xml).with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(())
}
