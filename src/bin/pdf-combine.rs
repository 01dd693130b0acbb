//! PDF Combine CLI tool
//!
//! A command-line tool for combining PDF and PNG files into one PDF.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use pdf_combine::pdf::{extract_metadata, merge_files, MergeOptions};
use pdf_combine::selection::{expand_inputs, parse_move, parse_order};
use pdf_combine::{resolve_output_path, FileSelection};

/// PDF Combine - Merge PDF and PNG files into a single PDF
#[derive(Parser)]
#[command(name = "pdf-combine")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge files in the order given, writing merged.pdf
    pdf-combine merge cover.png intro.pdf body.pdf

    # Merge numbered PDFs and name the result
    pdf-combine merge --name handout \"[0-9]*.pdf\"

    # Check the order first, then put the third file first
    pdf-combine list a.pdf b.pdf c.png
    pdf-combine merge --move 3:1 a.pdf b.pdf c.png

    # Rearrange everything and open the result
    pdf-combine merge --order 2,3,1 -o out/notes.pdf --open a.pdf b.pdf c.pdf")]
struct Cli {
    /// Show debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge PDF and PNG files into one PDF
    Merge {
        /// Input PDF and PNG files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Name of the merged file, without extension (defaults to "merged")
        #[arg(short, long)]
        name: Option<String>,

        /// Output PDF file path (overrides --name and --dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory the named output is written to
        #[arg(long, env = "PDF_COMBINE_DIR", default_value = ".")]
        dir: PathBuf,

        /// New order as 1-based positions, e.g. "3,1,2"
        #[arg(long)]
        order: Option<String>,

        /// Move one file, e.g. "4:1" moves the fourth file to the front (repeatable)
        #[arg(long = "move", value_name = "FROM:TO")]
        moves: Vec<String>,

        /// Reverse the order (applied after --order, before --move)
        #[arg(long)]
        reverse: bool,

        /// Minimum number of files required
        #[arg(long, default_value_t = 1)]
        min_files: usize,

        /// Title stored in the PDF's document info (defaults to --name)
        #[arg(long)]
        title: Option<String>,

        /// Print the final order and output path without merging
        #[arg(long)]
        dry_run: bool,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show the files that would be merged, in order
    List {
        /// Input files. Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

/// Arguments of the merge subcommand
struct MergeArgs {
    inputs: Vec<String>,
    name: Option<String>,
    output: Option<PathBuf>,
    dir: PathBuf,
    order: Option<String>,
    moves: Vec<String>,
    reverse: bool,
    min_files: usize,
    title: Option<String>,
    dry_run: bool,
    open: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Merge {
            inputs, name, output, dir, order, moves, reverse,
            min_files, title, dry_run, open,
        } => {
            cmd_merge(MergeArgs {
                inputs, name, output, dir, order, moves, reverse,
                min_files, title, dry_run, open,
            })
        }
        Commands::List { inputs } => cmd_list(inputs),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Expand inputs and apply the requested reordering
fn build_selection(args: &MergeArgs) -> Result<FileSelection> {
    let paths = expand_inputs(&args.inputs)?;
    let mut selection = FileSelection::from_paths(paths)?;

    if let Some(spec) = &args.order {
        let order = parse_order(spec)?;
        selection
            .apply_order(&order)
            .with_context(|| format!("cannot apply --order {}", spec))?;
    }

    if args.reverse {
        selection.reverse();
    }

    for spec in &args.moves {
        let (from, to) = parse_move(spec)?;
        selection
            .move_item(from, to)
            .with_context(|| format!("cannot apply --move {}", spec))?;
    }

    Ok(selection)
}

fn print_selection(selection: &FileSelection) {
    for (position, file) in selection.iter().enumerate() {
        if file.kind.is_supported() {
            println!("{:>3}. {} ({})", position + 1, file.name, file.kind);
        } else {
            println!("{:>3}. {} (unsupported, will be skipped)", position + 1, file.name);
        }
    }
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Merge the selected files into one PDF
fn cmd_merge(args: MergeArgs) -> Result<()> {
    let selection = build_selection(&args)?;
    selection.validate(args.min_files)?;

    let output = resolve_output_path(&args.dir, args.name.as_deref(), args.output.as_deref());

    if args.dry_run {
        print_selection(&selection);
        println!("Output: {}", output.display());
        return Ok(());
    }

    eprintln!("Merging {} files...", selection.len());

    let options = MergeOptions {
        sources: selection.into_vec(),
        output_path: output,
        title: args.title.or(args.name),
    };

    let summary = merge_files(&options)
        .with_context(|| format!("could not create {}", options.output_path.display()))?;

    for path in &summary.skipped {
        eprintln!("Skipped (not a PDF or PNG): {}", path.display());
    }
    eprintln!(
        "Merged {} pages from {} files to: {}",
        summary.page_count,
        summary.source_count,
        summary.output_path.display()
    );

    if args.open {
        open_file(&summary.output_path)?;
    }

    Ok(())
}

/// List the selection in merge order
fn cmd_list(inputs: Vec<String>) -> Result<()> {
    let paths = expand_inputs(&inputs)?;
    let selection = FileSelection::from_paths(paths)?;
    print_selection(&selection);
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let metadata = extract_metadata(&input)
        .with_context(|| format!("could not read {}", input.display()))?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }
    if let Some(producer) = metadata.producer {
        println!("Producer: {}", producer);
    }

    for (number, (width, height)) in metadata.page_sizes.iter().enumerate() {
        println!("  Page {}: {} x {} pt", number + 1, width, height);
    }

    Ok(())
}
