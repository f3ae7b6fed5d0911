// Lists a folder the way the player sees it: directory order, resolved tags.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tunedeck::audio::{list_audio_entries, list_subdirectories, MetadataResolver};

#[derive(Parser)]
#[command(name = "tunedeck_scan")]
#[command(about = "Print the playable files of a folder with their resolved metadata")]
struct Args {
    /// Folder to list
    folder: PathBuf,

    /// Also print child folders
    #[arg(long)]
    dirs: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tunedeck=debug")))
        .init();

    info!("Scanning {}", args.folder.display());
    let entries = list_audio_entries(&args.folder, MetadataResolver::new()).await?;

    for (index, entry) in entries.iter().enumerate() {
        println!("{:>3}. {}", index + 1, entry.display_name);
        if let Some(meta) = &entry.metadata {
            println!("     {} / {} / {}", meta.artist, meta.title, meta.album);
            println!(
                "     {:.1}s, {} kbps, {} Hz, {} ch{}",
                meta.duration_seconds,
                meta.bitrate / 1000,
                meta.sample_rate,
                meta.channels,
                meta.cover_art
                    .as_ref()
                    .map(|art| format!(", cover {}", art.format))
                    .unwrap_or_default()
            );
        }
    }

    if args.dirs {
        for dir in list_subdirectories(&args.folder)? {
            println!("  [dir] {}", dir.display());
        }
    }

    println!("{} playable files", entries.len());
    Ok(())
}
