// UI layer: numbered selection prompts and the top-level fetch flow.
// The functions are small and synchronous to make the flow easy to follow.

use crate::api::ApiClient;
use crate::config::{self, SecretStore};
use crate::fetch::{self, FetchOptions, OutputPaths};
use anyhow::{Context, Result};
use dialoguer::Input;

/// Flags accepted by the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub reset_password: bool,
    pub clear_secrets: bool,
    pub no_images: bool,
    pub no_transcriptions: bool,
}

/// Resolve a selection input against a list of `len` items: a
/// non-negative index within range, or nothing.
pub fn parse_selection(input: &str, len: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(i) if i < len => Some(i),
        _ => None,
    }
}

/// Print `index  name` lines and prompt until the user enters a valid
/// index. Project and transcription selection both go through this, so
/// invalid input is always re-asked instead of silently falling through.
fn select_index(prompt: &str, names: &[&str]) -> Result<usize> {
    for (i, name) in names.iter().enumerate() {
        println!("{:>3}  {}", i, name);
    }
    loop {
        let input: String = Input::new().with_prompt(prompt).interact_text()?;
        match parse_selection(&input, names.len()) {
            Some(i) => return Ok(i),
            None => println!(
                "Please enter a number between 0 and {}.",
                names.len() - 1
            ),
        }
    }
}

/// Top-level interactive flow: resolve settings, connect, pick a project
/// and a transcription layer, then download everything. This call blocks
/// until the run is complete.
pub fn run(store: &mut dyn SecretStore, options: RunOptions) -> Result<()> {
    if options.clear_secrets {
        store.clear()?;
    }
    let settings = config::resolve_settings(store, options.reset_password)?;

    let client = ApiClient::connect(&settings.url, &settings.username, &settings.password)
        .context("Failed to connect to eScriptorium")?;

    let projects = client.list_projects()?;
    if projects.is_empty() {
        anyhow::bail!("No projects are visible for this account");
    }
    let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
    let project = &projects[select_index("Select a project to fetch", &names)?];
    println!("Fetching {}...", project.slug);

    let documents: Vec<_> = client
        .list_documents()?
        .into_iter()
        .filter(|d| d.project == project.slug)
        .collect();
    if documents.is_empty() {
        println!("Project {} has no documents.", project.name);
        return Ok(());
    }

    // The layer list is read from the first document; the chosen layer is
    // applied to every document in the run.
    let transcription_pk = if options.no_transcriptions {
        None
    } else {
        let layers = client.list_transcriptions(documents[0].pk)?;
        if layers.is_empty() {
            anyhow::bail!(
                "Document {} has no transcription layers",
                documents[0].name
            );
        }
        let names: Vec<&str> = layers.iter().map(|t| t.name.as_str()).collect();
        let layer = &layers[select_index("Select a transcription to fetch", &names)?];
        println!("Fetching text from {}...", layer.name);
        Some(layer.pk)
    };

    let paths = OutputPaths {
        image_dir: settings.image_dir.clone(),
        transcription_dir: settings.transcription_dir.clone(),
    };
    let fetch_options = FetchOptions {
        images: !options.no_images,
        transcriptions: !options.no_transcriptions,
    };
    let report = fetch::fetch_documents(&client, &documents, transcription_pk, &paths, fetch_options)?;

    if report.failed_count() > 0 {
        println!(
            "All done, {} of {} parts failed.",
            report.failed_count(),
            report.part_count()
        );
    } else {
        println!("All done.");
    }
    Ok(())
}
