use std::io::Write as _;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vidstitch::pipeline::{Pipeline, PipelineOpts};
use vidstitch::scan::{AUDIO_EXTENSIONS, VIDEO_EXTENSIONS, list_media_files};
use vidstitch::select::{
    has_extension, print_numbered_list, prompt_multi, prompt_output_path, prompt_single,
};
use vidstitch::VidstitchError;

#[derive(Parser, Debug)]
#[command(name = "vidstitch", version)]
#[command(about = "Concatenate video clips with normalized audio and background music")]
struct Cli {
    /// Directory containing the candidate video clips.
    #[arg(short = 'v', long)]
    video_dir: PathBuf,

    /// Directory containing the candidate music tracks.
    #[arg(short = 'm', long)]
    music_dir: PathBuf,

    /// Output MP4 path. Prompted for when omitted.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let videos = list_media_files(&cli.video_dir, VIDEO_EXTENSIONS)?;
    if videos.is_empty() {
        return Err(VidstitchError::config(format!(
            "no video files found in '{}'",
            cli.video_dir.display()
        ))
        .into());
    }
    let tracks = list_media_files(&cli.music_dir, AUDIO_EXTENSIONS)?;
    if tracks.is_empty() {
        return Err(VidstitchError::config(format!(
            "no music files found in '{}'",
            cli.music_dir.display()
        ))
        .into());
    }

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();

    print_numbered_list(&mut out, "Available videos", &videos)?;
    let video_paths = prompt_multi(&mut input, &mut out, "Select videos to combine: ", &videos)?;

    print_numbered_list(&mut out, "Available music tracks", &tracks)?;
    let music_path = prompt_single(&mut input, &mut out, "Select background music: ", &tracks)?;

    let output_path = match cli.output {
        Some(path) if has_extension(&path, VIDEO_EXTENSIONS) => path,
        Some(path) => {
            return Err(VidstitchError::config(format!(
                "output '{}' must end in one of: {}",
                path.display(),
                VIDEO_EXTENSIONS.join(", ")
            ))
            .into());
        }
        None => prompt_output_path(&mut input, &mut out, VIDEO_EXTENSIONS)?,
    };
    out.flush()?;

    let mut pipeline = Pipeline::new();
    pipeline.run(&PipelineOpts {
        video_paths,
        music_path,
        output_path: output_path.clone(),
    })?;

    eprintln!("wrote {}", output_path.display());
    Ok(())
}
