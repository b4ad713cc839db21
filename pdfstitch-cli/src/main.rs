use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pdfstitch::operations::{merge_and_stamp, MergeOptions, MetadataMode};
use pdfstitch::{
    generate_pdf, parse_document, save_output, GenerateOptions, OverlayTemplate, StampOptions,
    StampPosition, StandardFont, TemplateDirectory,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdfstitch",
    about = "Merge PDF files and stamp page numbers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge multiple PDFs into one
    Merge {
        /// Input PDF files, in output order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Stamp page numbers across the merged result
        #[arg(long)]
        page_numbers: bool,

        /// Document title written to the info dictionary
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        overlay: OverlayArgs,
    },

    /// Stamp page numbers on every page of a PDF
    Stamp {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Skip the page number line (useful with --header)
        #[arg(long)]
        no_page_numbers: bool,

        #[command(flatten)]
        overlay: OverlayArgs,
    },

    /// Render a template and stamp it
    Generate {
        /// Template name, resolved inside the template directory
        template: String,

        /// Template data as a JSON object
        #[arg(short, long)]
        data: Option<String>,

        /// Directory holding the templates
        #[arg(long, env = "PDFSTITCH_TEMPLATE_DIR", default_value = "templates")]
        template_dir: PathBuf,

        /// Output file path; defaults to output.pdf in the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory used when no output path is given
        #[arg(long, env = "PDFSTITCH_OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        /// Skip the page number line
        #[arg(long)]
        no_page_numbers: bool,

        #[command(flatten)]
        overlay: OverlayArgs,
    },

    /// Get information about a PDF file
    Info {
        /// Input PDF file
        input: PathBuf,
    },
}

#[derive(Args)]
struct OverlayArgs {
    /// Page number format; {page} and {total} are replaced
    #[arg(long, default_value = "page {page} of {total}")]
    format: String,

    /// Stamp position: bottom-left, bottom-center, bottom-right, top-left,
    /// top-center or top-right
    #[arg(long, default_value = "bottom-center")]
    position: StampPosition,

    /// Font size in points
    #[arg(long, default_value_t = 10.0)]
    font_size: f64,

    /// Standard font name
    #[arg(long, default_value = "Helvetica")]
    font: StandardFont,

    /// Text drawn at the top center of every page
    #[arg(long)]
    header: Option<String>,
}

impl OverlayArgs {
    fn template(&self) -> OverlayTemplate {
        OverlayTemplate {
            format: self.format.clone(),
            position: self.position,
            font_size: self.font_size,
            font: self.font,
            ..OverlayTemplate::default()
        }
    }

    fn stamp_options(&self, page_numbers: bool) -> StampOptions {
        StampOptions {
            template: self.template(),
            page_numbers,
            header_text: self.header.clone(),
            ..StampOptions::default()
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfstitch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            files,
            output,
            page_numbers,
            title,
            overlay,
        } => {
            let inputs = files
                .iter()
                .map(|path| read_pdf(path))
                .collect::<Result<Vec<_>>>()?;

            let metadata = match title {
                Some(title) => MetadataMode::Custom {
                    title: Some(title),
                    author: None,
                    subject: None,
                    keywords: None,
                },
                None => MetadataMode::FromFirst,
            };
            let stamp = (page_numbers || overlay.header.is_some())
                .then(|| overlay.stamp_options(page_numbers));

            let merged = merge_and_stamp(&inputs, MergeOptions { metadata }, stamp)
                .context("Failed to merge PDFs")?;
            write_pdf(&output, &merged)?;

            println!(
                "Merged {} files into {}",
                files.len(),
                output.display()
            );
        }

        Commands::Stamp {
            input,
            output,
            no_page_numbers,
            overlay,
        } => {
            if no_page_numbers && overlay.header.is_none() {
                bail!("Nothing to stamp: pass --header or drop --no-page-numbers");
            }
            let bytes = read_pdf(&input)?;
            let stamped = pdfstitch::stamp_page_numbers_with(
                &bytes,
                overlay.stamp_options(!no_page_numbers),
            )
            .with_context(|| format!("Failed to stamp {}", input.display()))?;
            write_pdf(&output, &stamped)?;

            println!("Stamped {} into {}", input.display(), output.display());
        }

        Commands::Generate {
            template,
            data,
            template_dir,
            output,
            output_dir,
            no_page_numbers,
            overlay,
        } => {
            let data: serde_json::Value = match data {
                Some(json) => serde_json::from_str(&json).context("--data is not valid JSON")?,
                None => serde_json::Value::Object(Default::default()),
            };
            let options = GenerateOptions {
                header_text: overlay.header.clone(),
                page_numbers: !no_page_numbers,
                template: overlay.template(),
            };

            let adapter = TemplateDirectory::new(&template_dir);
            let bytes = generate_pdf(&adapter, &template, &data, &options)
                .with_context(|| format!("Failed to generate from template '{template}'"))?;

            let path = match output {
                Some(path) => {
                    write_pdf(&path, &bytes)?;
                    path
                }
                None => save_output(&output_dir, None, &bytes)
                    .with_context(|| format!("Failed to save into {}", output_dir.display()))?,
            };
            println!("Generated {}", path.display());
        }

        Commands::Info { input } => {
            let bytes = read_pdf(&input)?;
            let doc = parse_document(&bytes)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            let pages = doc.pages()?;

            println!("PDF Information for: {}", input.display());
            println!("==========================================");
            println!("PDF Version: {}", doc.version());
            println!("Objects: {}", doc.len());
            println!("Pages: {}", pages.len());

            if let Some(info) = doc.info_dictionary() {
                for key in ["Title", "Author", "Subject", "Producer"] {
                    if let Some(value) = info.get(key).and_then(|v| v.as_string()) {
                        println!("{key}: {}", decode_text(value));
                    }
                }
            }

            if !pages.is_empty() {
                println!("\nPage Information:");
                println!("-----------------");
                for (i, page) in pages.iter().enumerate() {
                    let [llx, lly, urx, ury] = page.media_box;
                    println!(
                        "Page {}: MediaBox [{llx} {lly} {urx} {ury}], {:.1} x {:.1} points, rotation {}",
                        i + 1,
                        page.width(),
                        page.height(),
                        page.rotation
                    );
                }
            }
        }
    }

    Ok(())
}

fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_pdf(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// PDF text strings are UTF-16BE with a BOM or single-byte
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}
