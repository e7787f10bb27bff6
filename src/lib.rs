// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to implement the interactive fetcher.
//
// Module responsibilities:
// - `api`: Typed blocking client for the eScriptorium REST API (auth,
//   project/document/part listings, image and ALTO export downloads).
// - `config`: Credential and output-path resolution backed by a
//   pluggable secret store.
// - `fetch`: The download loop over documents and parts, with per-part
//   failure isolation.
// - `ui`: Numbered selection prompts and the top-level interactive flow.
//
// Keeping this separation makes it easier to test the download logic
// against an in-memory server stand-in and store.
pub mod api;
pub mod config;
pub mod fetch;
pub mod ui;
