//! Fetches the MUMBA observation files from the campaign archive.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{cli::create_spinner, config::Config, species::MUMBA_FILES};

pub async fn fetch_obs(config: &Config) -> Result<String> {
    fs::create_dir_all(&config.obs_dir)?;

    for fname in MUMBA_FILES {
        let dest = config.obs_dir.join(fname);
        if dest.exists() {
            println!("`{fname}` already present, skipping");
            continue;
        }

        let url = file_url(&config.obs_url, fname);
        let bar = create_spinner(format!("Downloading {fname}..."));
        download_tab_file(&url, &dest, &bar).await?;
        bar.finish_with_message(format!("{fname} downloaded"));
    }

    Ok(config.obs_dir.to_string_lossy().to_string())
}

/// Streams one `.tab` file to disk. The spinner picks up byte counts once
/// the archive reports a content length.
async fn download_tab_file(url: &str, dest: &Path, bar: &ProgressBar) -> Result<()> {
    let response = reqwest::get(url).await?.error_for_status()?;

    if let Some(total) = response.content_length() {
        bar.set_length(total);
        bar.set_style(
            ProgressStyle::with_template("{msg} {bytes}/{total_bytes} ({percent}%)").unwrap(),
        );
    }

    let mut file = File::create(dest)?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)?;
        bar.inc(chunk.len() as u64);
    }

    Ok(())
}

fn file_url(base: &str, fname: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), fname)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn should_join_archive_url_and_file_name() {
        assert_eq!(
            file_url("https://example.org/mumba/", MUMBA_FILES[2]),
            "https://example.org/mumba/MUMBA_O3_2012-12-21_2013-02-15.tab"
        );
        assert_eq!(file_url("https://example.org", "x.tab"), "https://example.org/x.tab");
    }
}
