use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use annoimg::{AnnotatorConfig, DatasetType, Project};

#[derive(Parser)]
#[command(name = "annoimg")]
#[command(about = "Create image annotation projects and export them as YOLO or COCO datasets")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a project over a set of images
    Init {
        #[arg(long)]
        name: String,

        /// Comma-separated class names, in id order
        #[arg(long, value_delimiter = ',')]
        classes: Vec<String>,

        #[arg(long, value_enum, default_value_t = Format::Yolo)]
        format: Format,

        /// Project file to write
        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        #[arg(value_name = "IMAGES", required = true)]
        images: Vec<PathBuf>,
    },

    /// Export a project's labels
    Export {
        #[arg(long, value_name = "FILE")]
        project: PathBuf,

        /// Output directory
        #[arg(long, value_name = "DIR")]
        out: PathBuf,

        /// Defaults to the project's dataset type
        #[arg(long, value_enum)]
        format: Option<Format>,

        #[arg(long)]
        ignore_polygons: bool,

        #[arg(long)]
        save_empty_files: bool,

        /// TOML settings file
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,
    },

    /// Print how many labels each class has
    Count {
        #[arg(long, value_name = "FILE")]
        project: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yolo,
    Coco,
}

impl From<Format> for DatasetType {
    fn from(format: Format) -> Self {
        match format {
            Format::Yolo => DatasetType::Yolo,
            Format::Coco => DatasetType::Coco,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match args.command {
        Command::Init {
            name,
            classes,
            format,
            out,
            images,
        } => {
            let classes = classes
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            let mut project = Project::create(name, &images, classes, format.into())?;
            project.save(&out)?;
            println!("Created {:?} with {} images", out, project.images().len());
        }
        Command::Export {
            project,
            out,
            format,
            ignore_polygons,
            save_empty_files,
            config,
        } => {
            let config = match config {
                Some(path) => AnnotatorConfig::load(path)?,
                None => AnnotatorConfig::default(),
            };
            let mut options = config.export;
            options.ignore_polygons |= ignore_polygons;
            options.save_empty_files |= save_empty_files;

            let (project, report) = Project::load(&project)?;
            if report.dropped_records > 0 {
                println!("Skipped {} unreadable label records", report.dropped_records);
            }
            let dataset_type = format.map(DatasetType::from).unwrap_or(project.dataset_type);
            let summary = project.export(dataset_type, options, &out)?;
            println!(
                "Exported {} annotations as {} into {:?} ({} files)",
                summary.annotations, dataset_type, out, summary.files_written
            );
        }
        Command::Count { project } => {
            let (project, _) = Project::load(&project)?;
            for (class_name, count) in project.label_counts() {
                println!("{class_name}: {count}");
            }
        }
    }

    Ok(())
}
