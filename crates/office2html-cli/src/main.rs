use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use clap::Parser;

use office2html::{DecodePreference, DecodedFile, FileType, HtmlOptions};

#[derive(Parser)]
#[command(
    name = "office2html",
    version,
    about = "Translate ODF, OOXML, and legacy Office files to HTML"
)]
struct Cli {
    /// Input file path (.odt, .ods, .odp, .odg, .docx, .xlsx, .pptx, ...)
    input: PathBuf,

    /// Output directory (default: input path with an -html suffix)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Password for encrypted documents
    #[arg(short, long)]
    password: Option<String>,

    /// Open as an explicit type instead of probing (extension-style name,
    /// e.g. "odt" or "xlsx")
    #[arg(short = 't', long = "type")]
    file_type: Option<String>,

    /// Decoder engine (native, pdf2htmlex, wvware)
    #[arg(long, default_value = "native")]
    engine: String,

    /// Emit data-path attributes for inline editing
    #[arg(long)]
    editable: bool,

    /// Apply a JSON edit diff and re-save the package next to the output
    #[arg(long)]
    diff: Option<PathBuf>,

    /// Write shared resources next to the pages instead of inlining them
    #[arg(long)]
    external_resources: bool,

    /// Pretty-print the generated HTML
    #[arg(long)]
    format: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let output = cli.output.clone().unwrap_or_else(|| {
        let mut name = cli
            .input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        name.push_str("-html");
        cli.input.with_file_name(name)
    });

    let engine =
        DecodePreference::parse(&cli.engine).map_err(|message| anyhow::anyhow!(message))?;

    let mut decoded = match &cli.file_type {
        Some(name) => {
            let file_type = FileType::from_extension(name);
            if file_type == FileType::Unknown {
                bail!("unknown file type: {name}");
            }
            office2html::open_as(&cli.input, file_type)
                .with_context(|| format!("opening {:?} as {name}", cli.input))?
        }
        None => office2html::open_with_preference(&cli.input, engine)
            .with_context(|| format!("opening {:?}", cli.input))?,
    };

    if let DecodedFile::Document(document) = &mut decoded {
        if document.password_encrypted() {
            let Some(password) = &cli.password else {
                bail!("{:?} is password protected; pass --password", cli.input);
            };
            let decrypted = document
                .decrypt(password)
                .with_context(|| "decrypting input")?;
            if !decrypted {
                bail!("wrong password for {:?}", cli.input);
            }
        }
    }

    if let Some(diff_path) = &cli.diff {
        let diff_json = std::fs::read_to_string(diff_path)
            .with_context(|| format!("reading diff {diff_path:?}"))?;
        let diff = office2html::edit::EditDiff::parse(&diff_json)
            .with_context(|| "parsing edit diff")?;
        let saved = office2html::edit_and_save(&decoded, &diff)
            .with_context(|| "applying edit diff")?;
        let saved_path = cli.input.with_extension("edited.odt");
        std::fs::write(&saved_path, saved)
            .with_context(|| format!("writing edited package to {saved_path:?}"))?;
        println!("Saved edited package: {saved_path:?}");
    }

    let options = HtmlOptions {
        editable: cli.editable,
        embed_resources: !cli.external_resources,
        format_html: cli.format,
        ..Default::default()
    };

    let translated = office2html::translate(&decoded, &options)
        .with_context(|| format!("translating {:?}", cli.input))?;
    office2html::html::write_output(&output, &translated, &decoded.meta())
        .with_context(|| format!("writing output to {output:?}"))?;

    println!(
        "Translated: {:?} -> {:?} ({} page{})",
        cli.input,
        output,
        translated.pages.len(),
        if translated.pages.len() == 1 { "" } else { "s" }
    );
    Ok(())
}
