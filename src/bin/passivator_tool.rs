use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use rustpassivator::codec::{UNKNOWN_LEGACY_TYPE, decompress, read_frame};
use rustpassivator::storage::{BeanStore, DurabilityMode, FileBeanStore};
use rustpassivator::{BeanId, CapturedObject, FrameGeneration};
use std::io::Cursor;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "passivator-tool")]
#[command(about = "Developer tooling for passivated bean stores")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a stored frame and print its header
    Inspect {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        bean: String,
        #[arg(long, value_enum, default_value_t = GenerationArg::Structured)]
        generation: GenerationArg,
    },
    /// List stored bean identifiers
    List {
        #[arg(long)]
        dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GenerationArg {
    Legacy,
    Structured,
}

impl From<GenerationArg> for FrameGeneration {
    fn from(value: GenerationArg) -> Self {
        match value {
            GenerationArg::Legacy => FrameGeneration::Legacy,
            GenerationArg::Structured => FrameGeneration::Structured,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect {
            dir,
            bean,
            generation,
        } => inspect(&dir, &BeanId::new(bean), generation.into()),
        Command::List { dir } => list(&dir),
    }
}

fn open_store(dir: &Path) -> Result<FileBeanStore> {
    if !dir.is_dir() {
        return Err(anyhow!("Store directory '{}' does not exist", dir.display()));
    }
    FileBeanStore::open(dir, DurabilityMode::Async)
        .with_context(|| format!("Failed to open store '{}'", dir.display()))
}

fn inspect(dir: &Path, id: &BeanId, generation: FrameGeneration) -> Result<()> {
    let store = open_store(dir)?;
    let compressed = store
        .read_bytes(id)
        .with_context(|| format!("Failed to read entry for '{}'", id))?
        .ok_or_else(|| anyhow!("No entry for '{}' in '{}'", id, dir.display()))?;
    let bytes = decompress(&compressed).context("Entry is not a compressed frame")?;
    let frame = read_frame(&mut Cursor::new(&bytes), generation, UNKNOWN_LEGACY_TYPE)
        .with_context(|| format!("Failed to decode {} frame", generation))?;

    println!("Bean:              {}", id);
    println!("File:              {}", store.path_for(id).display());
    println!("Generation:        {}", generation);
    println!(
        "Size:              {} bytes ({} compressed)",
        bytes.len(),
        compressed.len()
    );
    println!("Last access time:  {}", format_millis(frame.last_access_time));
    match &frame.persistence_context {
        Some(binding) => println!(
            "Context binding:   {} [{}]",
            binding.binding_id,
            binding.unit_names.join(", ")
        ),
        None => println!("Context binding:   none"),
    }
    println!("Primary:           {}", describe(&frame.primary));
    println!("Managed context:   {} bytes", frame.managed_context.len());
    match &frame.interceptors {
        None => println!("Interceptors:      absent"),
        Some(interceptors) => {
            println!("Interceptors:      {}", interceptors.len());
            for (index, interceptor) in interceptors.iter().enumerate() {
                println!("  [{}] {}", index, describe(interceptor));
            }
        }
    }
    Ok(())
}

fn list(dir: &Path) -> Result<()> {
    let store = open_store(dir)?;
    let ids = store.list().context("Failed to list store")?;
    if ids.is_empty() {
        println!("No passivated beans in '{}'", dir.display());
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

fn describe(record: &CapturedObject) -> String {
    match record {
        CapturedObject::Native { type_name, bytes } => {
            format!("{} (native, {} bytes)", type_name, bytes.len())
        }
        CapturedObject::Reconstructed {
            type_name,
            fields_by_class,
        } => {
            let levels = fields_by_class
                .iter()
                .map(|class| format!("{}: {} fields", class.class_name, class.fields.len()))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} (reconstructed; {})", type_name, levels)
        }
    }
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
