use clap::Parser;
use eqharvest::output;
use eqharvest::pipeline;
use eqharvest::render::LatexmkRenderer;
use log::{error, info, LevelFilter};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Parameters {
    /// Root document (tex)
    texfile: PathBuf,

    /// Output directory
    #[clap(short, long, default_value = "output")]
    outdir: PathBuf,

    /// Rasterization resolution for document pages
    #[clap(long, default_value_t = 150.0)]
    dpi: f32,

    /// verbose
    #[clap(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() {
    let params = Parameters::parse();
    let level = if params.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::builder().filter_level(level).init();
    if let Err(e) = run(params) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(params: Parameters) -> Result<(), Box<dyn std::error::Error>> {
    let texfile = params.texfile.canonicalize()?;
    let base_dir = texfile
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();
    // the paper is identified by its directory name, as on arXiv dumps
    let paper = base_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "paper".to_string());
    let outdir = params.outdir.join(paper);
    std::fs::create_dir_all(&outdir)?;
    let outdir = outdir.canonicalize()?;

    // compiler scratch lives outside the dataset and is removed on drop
    let build_dir = tempfile::tempdir()?;
    let renderer = LatexmkRenderer::new(build_dir.path().to_path_buf(), params.dpi)?;
    let harvest = pipeline::harvest(&texfile, &base_dir, &renderer)?;
    info!(
        "{}: {} equation(s) localized, {} failed",
        texfile.display(),
        harvest.records.len(),
        harvest.failures.len()
    );
    output::write_dataset(&outdir, &harvest)?;
    Ok(())
}
