use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{info, warn};

use manual_composer::builder::{ManualBuilder, RenderedManual};
use manual_composer::fonts::{self, TrueTypeShaper};
use manual_composer::images::FsImageResolver;
use manual_composer::manifest::Manifest;
use manual_composer::samples;
use manual_composer::shaping::{StandardFontShaper, TextShaper};
use manual_composer::sink;

/// Composes paginated user manuals from TOML manifests or the built-in screenshot manual.
///
/// Set `RUST_LOG=debug` to trace page breaks and text splits.
#[derive(Parser)]
#[command(author, version, about = "Compose paginated user-manual PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a manifest to PDF.
    Render {
        /// TOML manifest describing the manual.
        manifest: PathBuf,

        /// Output PDF path.
        #[arg(short, long)]
        output: PathBuf,

        /// Directory image sources are resolved against.
        #[arg(long, default_value = ".")]
        images: PathBuf,

        /// Add a PDF outline entry for every heading.
        #[arg(long)]
        bookmarks: bool,

        /// Draw with the PDF base-14 fonts instead of embedding the TrueType family.
        #[arg(long)]
        standard_fonts: bool,
    },

    /// Print the page layout of a manifest without writing a PDF.
    Inspect {
        /// TOML manifest describing the manual.
        manifest: PathBuf,

        /// Directory image sources are resolved against.
        #[arg(long, default_value = ".")]
        images: PathBuf,

        /// Measure text with the bundled TrueType fonts instead of base-14 metrics.
        #[arg(long)]
        truetype: bool,
    },

    /// Render the built-in contact management screenshot manual.
    #[command(name = "screenshot-manual", aliases = ["screenshot_manual", "screenshots"])]
    ScreenshotManual {
        /// Directory holding the screenshots.
        #[arg(long, default_value = "screenshots")]
        screenshots: PathBuf,

        /// Output PDF path.
        #[arg(
            short,
            long,
            default_value = "Contact_Management_System_Screenshot_Manual.pdf"
        )]
        output: PathBuf,

        /// Date printed on the cover page, e.g. 2024-01-31; defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Add a PDF outline entry for every section.
        #[arg(long)]
        bookmarks: bool,

        /// Draw with the PDF base-14 fonts instead of embedding the TrueType family.
        #[arg(long)]
        standard_fonts: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            manifest,
            output,
            images,
            bookmarks,
            standard_fonts,
        } => render(&manifest, &output, images, bookmarks, standard_fonts),
        Commands::Inspect {
            manifest,
            images,
            truetype,
        } => inspect(&manifest, images, truetype),
        Commands::ScreenshotManual {
            screenshots,
            output,
            date,
            bookmarks,
            standard_fonts,
        } => {
            let date = cover_date(date);
            screenshot_manual(screenshots, &output, &date, bookmarks, standard_fonts)
        }
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn render(
    manifest: &Path,
    output: &Path,
    images: PathBuf,
    bookmarks: bool,
    standard_fonts: bool,
) -> Result<(), Box<dyn Error>> {
    let resolver = FsImageResolver::new(images);
    let builder = Manifest::load(manifest)?.to_builder(&resolver)?;
    let rendered = render_builder(&builder, &resolver, bookmarks, standard_fonts)?;
    write_output(output, &rendered)
}

fn inspect(manifest: &Path, images: PathBuf, truetype: bool) -> Result<(), Box<dyn Error>> {
    let resolver = FsImageResolver::new(images);
    let builder = Manifest::load(manifest)?.to_builder(&resolver)?;
    let shaper: Box<dyn TextShaper> = if truetype {
        Box::new(TrueTypeShaper::from_default_fonts()?)
    } else {
        Box::new(StandardFontShaper::new())
    };

    let pages = builder.layout(&shaper, &resolver)?;
    print!("{}", sink::outline(&pages)?);
    for section in builder.sections() {
        match pages.page_of_block(section.block_index) {
            Some(page) => println!("section {:?} starts on page {}", section.title, page),
            None => println!("section {:?} was not placed", section.title),
        }
    }
    Ok(())
}

/// The cover date: `date` when given, otherwise today in `YYYY-MM-DD` form.
fn cover_date(date: Option<String>) -> String {
    date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string())
}

fn screenshot_manual(
    screenshots: PathBuf,
    output: &Path,
    date: &str,
    bookmarks: bool,
    standard_fonts: bool,
) -> Result<(), Box<dyn Error>> {
    let resolver = FsImageResolver::new(screenshots);
    let builder = samples::screenshot_manual(&resolver, Some(date));
    let rendered = render_builder(&builder, &resolver, bookmarks, standard_fonts)?;
    write_output(output, &rendered)
}

/// Renders with the embedded TrueType family when it can be found, else with the base-14 fonts.
fn render_builder(
    builder: &ManualBuilder,
    resolver: &FsImageResolver,
    bookmarks: bool,
    standard_fonts: bool,
) -> manual_composer::Result<RenderedManual> {
    let font_files = if standard_fonts {
        None
    } else {
        match fonts::default_font_files() {
            Ok(files) => Some(files),
            Err(err) => {
                warn!("{err}; drawing with the PDF standard fonts");
                None
            }
        }
    };
    let rendered = match font_files {
        Some(files) => builder.render_embedded(&files, resolver)?,
        None => builder.render(&StandardFontShaper::new(), resolver)?,
    };
    if bookmarks {
        builder.add_bookmarks(rendered)
    } else {
        Ok(rendered)
    }
}

fn write_output(output: &Path, rendered: &RenderedManual) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &rendered.bytes)?;
    info!("wrote {}", output.display());
    println!(
        "Generated {} ({} pages, {} bytes)",
        output.display(),
        rendered.pages.len(),
        rendered.bytes.len()
    );
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_cover_date_is_kept() {
        assert_eq!(cover_date(Some("2024-01-31".to_owned())), "2024-01-31");
    }

    #[test]
    fn cover_date_defaults_to_today() {
        let date = cover_date(None);
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
    }

    #[test]
    fn screenshot_manual_accepts_font_and_date_flags() {
        let cli = Cli::try_parse_from([
            "manual-composer",
            "screenshot-manual",
            "--date",
            "2024-01-31",
            "--standard-fonts",
        ])
        .expect("parses");
        match cli.command {
            Commands::ScreenshotManual {
                date,
                standard_fonts,
                ..
            } => {
                assert_eq!(date.as_deref(), Some("2024-01-31"));
                assert!(standard_fonts);
            }
            _ => panic!("expected the screenshot-manual command"),
        }
    }
}
