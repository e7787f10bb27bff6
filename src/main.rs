// Entrypoint for the CLI application.
// - Keeps `main` small: parse the flags, build the file-backed secret
//   store and hand both to the UI flow.
// - Returns `anyhow::Result` so setup errors exit non-zero with context.

use escriptorium_fetcher::config::FileStore;
use escriptorium_fetcher::ui::{self, RunOptions};

const USAGE: &str = "Usage: escriptorium-fetcher [--reset-password] [--clear-secrets] \
[--no-images] [--no-transcriptions]";

fn main() -> anyhow::Result<()> {
    let mut options = RunOptions::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--reset-password" => options.reset_password = true,
            "--clear-secrets" => options.clear_secrets = true,
            "--no-images" => options.no_images = true,
            "--no-transcriptions" => options.no_transcriptions = true,
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(());
            }
            other => anyhow::bail!("Unknown flag {:?}\n{}", other, USAGE),
        }
    }

    // Secrets live in `~/.escriptorium-fetcher.json` between runs.
    let mut store = FileStore::in_home();
    ui::run(&mut store, options)
}
