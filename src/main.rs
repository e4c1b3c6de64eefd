//! ACGAN for MNIST / Fashion-MNIST
//!
//! Main entry point providing CLI interface for:
//! - Downloading the dataset
//! - Training the ACGAN model
//! - Rendering class-conditioned samples from a checkpoint
//! - Evaluating the discriminator on the test split

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_acgan_mnist::{
    data::{DataLoader, DatasetFetcher, DatasetKind, Split},
    model::{Acgan, LabelMode},
    training::{evaluate, Trainer},
    utils::{find_latest_checkpoint, load_checkpoint, save_grid, Config, ImageGrid},
};

/// Auxiliary Classifier GAN for handwritten digits and clothing
#[derive(Parser)]
#[command(name = "acgan")]
#[command(version = "0.1.0")]
#[command(about = "Train and sample a class-conditioned GAN on MNIST or Fashion-MNIST")]
struct Cli {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the IDX files
    Fetch {
        /// mnist or fashion_mnist (defaults to the configured dataset)
        #[arg(short, long)]
        dataset: Option<String>,

        /// Target directory (defaults to the configured data_dir)
        #[arg(long)]
        dir: Option<String>,
    },

    /// Train the ACGAN model
    Train {
        /// Override the configured number of steps
        #[arg(short, long)]
        steps: Option<usize>,

        /// Resume from this checkpoint directory
        #[arg(long)]
        resume: Option<String>,

        /// Resume from the latest checkpoint in the checkpoint directory
        #[arg(long, conflicts_with = "resume")]
        latest: bool,
    },

    /// Render a grid of generated samples
    Generate {
        /// Checkpoint directory (defaults to the latest one)
        #[arg(long)]
        checkpoint: Option<String>,

        #[arg(long, default_value = "5")]
        rows: i64,

        #[arg(long, default_value = "5")]
        cols: i64,

        /// Generate only this class
        #[arg(long, conflicts_with = "ordered")]
        class: Option<i64>,

        /// Label tiles in class order instead of at random
        #[arg(long)]
        ordered: bool,

        /// Output PNG path
        #[arg(short, long, default_value = "samples.png")]
        output: String,
    },

    /// Evaluate the discriminator on the test split
    Evaluate {
        /// Checkpoint directory (defaults to the latest one)
        #[arg(long)]
        checkpoint: Option<String>,
    },

    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Fetch { dataset, dir } => {
            fetch_data(&cli.config, dataset, dir).await?;
        }
        Commands::Train {
            steps,
            resume,
            latest,
        } => {
            train_model(&cli.config, steps, resume, latest)?;
        }
        Commands::Generate {
            checkpoint,
            rows,
            cols,
            class,
            ordered,
            output,
        } => {
            let labels = LabelMode::new(class, ordered);
            generate_samples(&cli.config, checkpoint, rows, cols, labels, &output)?;
        }
        Commands::Evaluate { checkpoint } => {
            evaluate_model(&cli.config, checkpoint)?;
        }
        Commands::Init { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

fn load_config(config_path: &str) -> Result<Config> {
    let config = Config::load_or_default(config_path)?;
    config.validate()?;
    Ok(config)
}

/// Restore the latest checkpoint, or the one given explicitly
fn restore_model(config: &Config, checkpoint: Option<String>) -> Result<Acgan> {
    let device = config.get_device();
    let mut model = config.build_model(device);

    let path = match checkpoint {
        Some(path) => PathBuf::from(path),
        None => find_latest_checkpoint(&config.training.checkpoint_dir)?,
    };
    let (step, _) = load_checkpoint(&mut model, &path)?;
    info!("Restored model trained for {} steps", step);

    Ok(model)
}

/// Download the dataset
async fn fetch_data(
    config_path: &str,
    dataset: Option<String>,
    dir: Option<String>,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let kind = dataset
        .map(|name| DatasetKind::from_name(&name))
        .unwrap_or(config.data.dataset);
    let dir = dir.unwrap_or(config.data.data_dir);

    info!("Fetching {} into {}", kind, dir);
    let files = DatasetFetcher::new().fetch(kind, &dir).await?;
    info!("{} files ready in {}", files.len(), dir);

    Ok(())
}

/// Train the ACGAN model
fn train_model(
    config_path: &str,
    steps: Option<usize>,
    resume: Option<String>,
    latest: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(steps) = steps {
        config.training.train_steps = steps;
    }

    // Determine device
    let device = config.get_device();
    info!("Using device: {:?}", device);

    // Load data
    let dataset = config.load_dataset(Split::Train)?;
    info!(
        "Loaded {} {} training images ({}x{})",
        dataset.len(),
        config.data.dataset,
        dataset.image_rows(),
        dataset.image_cols()
    );

    let data_loader = DataLoader::new(dataset, config.data.batch_size, true, false);

    // Create model
    let mut model = config.build_model(device);

    // Resume from checkpoint if requested
    let resume = match (resume, latest) {
        (Some(path), _) => Some(PathBuf::from(path)),
        (None, true) => Some(find_latest_checkpoint(&config.training.checkpoint_dir)?),
        (None, false) => None,
    };
    let mut trainer = Trainer::new(config.training_config(), device);
    let start_step = match resume {
        Some(path) => {
            let (step, metrics) = load_checkpoint(&mut model, &path)?;
            info!("Resumed from step {}", step);
            trainer = trainer.with_metrics(metrics);
            step + 1
        }
        None => 0,
    };

    // Train
    let metrics = trainer.train(&mut model, &data_loader, start_step)?;

    info!(
        "Training complete. Final D_loss: {:.4}, G_loss: {:.4}, c_loss: {:.4}",
        metrics.latest_d_loss().unwrap_or(0.0),
        metrics.latest_g_loss().unwrap_or(0.0),
        metrics.latest_c_loss().unwrap_or(0.0)
    );

    Ok(())
}

/// Generate a sample grid from a trained model
fn generate_samples(
    config_path: &str,
    checkpoint: Option<String>,
    rows: i64,
    cols: i64,
    labels: LabelMode,
    output: &str,
) -> Result<()> {
    if rows <= 0 || cols <= 0 {
        bail!("grid must have at least one row and column");
    }

    let config = load_config(config_path)?;
    let model = restore_model(&config, checkpoint)?;

    let grid = ImageGrid::new(rows, cols);
    let labels = model.grid_labels(labels, grid.len())?;
    let samples = model.generate(&labels);

    save_grid(&samples, &grid, Path::new(output))?;
    info!("Saved {}x{} sample grid to {}", rows, cols, output);

    let class_names = config.data.dataset.class_names();
    let classes = labels.argmax(-1, false).to_device(tch::Device::Cpu);
    let shown: Vec<&str> = Vec::<i64>::try_from(&classes)?
        .into_iter()
        .take(cols as usize)
        .map(|c| class_names.get(c as usize).copied().unwrap_or("?"))
        .collect();
    info!("First row: {}", shown.join(", "));

    Ok(())
}

/// Evaluate the discriminator and classifier on held-out images
fn evaluate_model(config_path: &str, checkpoint: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let model = restore_model(&config, checkpoint)?;

    let dataset = config.load_dataset(Split::Test)?;
    let mut data_loader = DataLoader::new(dataset, config.data.batch_size, false, false);

    let report = evaluate(&model, &mut data_loader);
    println!("Test images:       {}", report.num_samples);
    println!("Class accuracy:    {:.2}%", report.accuracy * 100.0);
    println!("Mean real score:   {:.4}", report.mean_real_score);

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    let config = Config::default();
    config.save(output_path)?;

    info!("Created default configuration at {}", output_path);
    Ok(())
}
