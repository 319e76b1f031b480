use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};

use yolo_prep::cli::{Cli, Command};
use yolo_prep::{batch, clean, merge, relabel, resize, split, visualize, voc};

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} (y/n): ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Resize(args) => {
            let stats = resize::resize_images(&args.to_config())?;
            stats.log_summary("Image letterboxing");
        }
        Command::ResizeLabeled(args) => {
            let stats = resize::resize_dataset(&args.to_config())?;
            stats.log_summary("Dataset letterboxing");
        }
        Command::Visualize(args) => {
            let stats = visualize::visualize(&args.to_config())?;
            stats.log_summary("Bounding box visualization");
        }
        Command::Batch(args) => {
            let stats = batch::split_into_batches(&args.to_config())?;
            stats.log_summary("Batching");
        }
        Command::Merge(args) => {
            let stats = merge::merge_pairs(&args.to_config())?;
            stats.log_summary("Merge");
        }
        Command::Xml2yolo(args) => {
            let stats = voc::convert_directory(&args.to_config())?;
            stats.log_summary("XML conversion");
        }
        Command::ChangeClass(args) => {
            let stats = relabel::change_class_ids(&args.to_config())?;
            stats.log_summary("Class rewrite");
        }
        Command::Split(args) => {
            split::split_dataset(&args.to_config()?)?;
        }
        Command::CleanClasses(args) => {
            let stats = clean::remove_disallowed_classes(&args.to_config())?;
            stats.log_summary();
        }
        Command::CleanEmpty(args) => {
            let config = args.to_config();
            eprintln!(
                "This removes empty label files in {:?} and their matching images in {:?}.",
                config.labels, config.images
            );
            if !args.yes && !confirm("Continue?")? {
                eprintln!("Cancelled.");
                return Ok(());
            }
            let stats = clean::remove_empty_labels(&config)?;
            stats.log_summary();
        }
    }

    Ok(())
}
