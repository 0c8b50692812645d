//! SSL Dataset CLI
//!
//! Inspect supported datasets and produce reproducible labeled/unlabeled
//! splits that can be saved and replayed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use ssl_dataset::utils::logging::{init_logging, LogConfig};
use ssl_dataset::utils::{format_bar, format_number};
use ssl_dataset::{DatasetKind, NormalizationTable, SslConfig, SslDataset, SslSplit};

/// Semi-supervised dataset preparation
///
/// Loads CIFAR and remote-sensing datasets and splits them into a balanced
/// labeled subset and an unlabeled pool.
#[derive(Parser, Debug)]
#[command(name = "ssl_dataset")]
#[command(version)]
#[command(about = "Balanced labeled/unlabeled dataset splits with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List supported datasets with their class counts and statistics
    Datasets,

    /// Show the class distribution of a dataset partition
    Stats {
        /// Dataset name (cifar10, cifar100, ucm, aid, eurosat_rgb, eurosat_ms)
        #[arg(short, long)]
        dataset: Option<DatasetKind>,

        /// Root directory containing the dataset directories
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Use the test partition instead of the training partition
        #[arg(long, default_value = "false")]
        eval: bool,

        /// Random seed for datasets without a fixed partition
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Compute a balanced labeled/unlabeled split and save it as JSON
    Split {
        /// Dataset name (cifar10, cifar100, ucm, aid, eurosat_rgb, eurosat_ms)
        #[arg(short, long)]
        dataset: Option<DatasetKind>,

        /// Root directory containing the dataset directories
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Total number of labeled samples
        #[arg(short, long)]
        num_labels: Option<usize>,

        /// Random seed for the labeled selection
        #[arg(long)]
        seed: Option<u64>,

        /// Remove labeled samples from the unlabeled pool
        #[arg(long, default_value = "false")]
        exclude_labeled: bool,

        /// Reuse the labeled indices of a previously saved split
        #[arg(long)]
        index_file: Option<PathBuf>,

        /// Where to write the split
        #[arg(short, long, default_value = "output/split.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    let config = match &cli.config {
        Some(path) => SslConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => SslConfig::default(),
    };

    match cli.command {
        Commands::Datasets => cmd_datasets(),

        Commands::Stats {
            dataset,
            data_dir,
            eval,
            seed,
        } => {
            let mut config = config;
            if let Some(dataset) = dataset {
                config.dataset = dataset;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if eval {
                config.train = false;
            }
            cmd_stats(&config)
        }

        Commands::Split {
            dataset,
            data_dir,
            num_labels,
            seed,
            exclude_labeled,
            index_file,
            output,
        } => {
            let mut config = config;
            if let Some(dataset) = dataset {
                config.dataset = dataset;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if let Some(num_labels) = num_labels {
                config.num_labels = num_labels;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if exclude_labeled {
                config.include_labeled_in_unlabeled = false;
            }
            if index_file.is_some() {
                config.index_file = index_file;
            }
            cmd_split(&config, &output)
        }
    }
}

fn cmd_datasets() -> Result<()> {
    let table = NormalizationTable::with_defaults();

    println!("{}", "Supported Datasets:".cyan().bold());
    println!(
        "  {:12} {:>7} {:>6}  {:10} {}",
        "name", "classes", "crop", "partition", "mean / std"
    );
    for kind in DatasetKind::ALL {
        let stats = table.get(kind)?;
        println!(
            "  {:12} {:>7} {:>6}  {:10} [{:.3}, {:.3}, {:.3}] / [{:.3}, {:.3}, {:.3}]",
            kind.name(),
            kind.default_num_classes(),
            kind.crop_size(),
            if kind.is_presplit() { "fixed" } else { "seeded" },
            stats.mean[0],
            stats.mean[1],
            stats.mean[2],
            stats.std[0],
            stats.std[1],
            stats.std[2],
        );
    }

    Ok(())
}

fn cmd_stats(config: &SslConfig) -> Result<()> {
    info!(
        "Computing statistics for {} in {:?}",
        config.dataset, config.data_dir
    );

    let dataset = SslDataset::from_config(config)?;
    let data = dataset
        .get_data()
        .with_context(|| format!("Failed to load {}", config.dataset))?;

    println!("{}", "Dataset Statistics:".cyan().bold());
    println!("  Dataset:           {}", config.dataset);
    println!(
        "  Partition:         {}",
        if config.train { "train" } else { "test" }
    );
    println!("  Total samples:     {}", format_number(data.len()));
    println!("  Number of classes: {}", dataset.num_classes());
    println!();

    println!("{}", "Class Distribution:".cyan().bold());
    let total = data.len();
    let largest = data.class_counts().into_iter().max().unwrap_or(0);
    for (idx, count) in data.class_counts().iter().enumerate() {
        let class_name = data
            .label_encoding
            .as_ref()
            .and_then(|names| names.get(idx))
            .cloned()
            .unwrap_or_else(|| format!("class {}", idx));
        let pct = 100.0 * *count as f64 / total.max(1) as f64;
        println!(
            "  {:30} {:>6} ({:>5.1}%) {}",
            class_name,
            count,
            pct,
            format_bar(*count, largest, 30).green()
        );
    }

    Ok(())
}

fn cmd_split(config: &SslConfig, output: &Path) -> Result<()> {
    let dataset = SslDataset::from_config(config)?;
    let data = dataset
        .get_data()
        .with_context(|| format!("Failed to load {}", config.dataset))?;

    let explicit = match &config.index_file {
        Some(path) => {
            info!("Reusing labeled indices from {:?}", path);
            Some(SslSplit::load(path)?.labeled_indices)
        }
        None => None,
    };

    let split = dataset.compute_split(
        &data,
        config.num_labels,
        explicit.as_deref(),
        config.include_labeled_in_unlabeled,
    )?;

    println!("{}", split.stats(&data.targets));

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    split.save(output)?;

    println!(
        "{} Split saved to {}",
        "Done:".green().bold(),
        output.display()
    );

    Ok(())
}
