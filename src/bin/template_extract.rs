use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use template_extract::{Extractor, Options, TemplateSet};

#[derive(Parser)]
#[command(
    name = "template-extract",
    about = "Extract items and links from HTML pages with site templates"
)]
struct Cli {
    /// JSON options file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Template directory
    #[arg(short, long, global = true)]
    templates: Option<PathBuf>,
    #[arg(long, global = true)]
    user_agent: Option<String>,
    #[arg(long, global = true)]
    proxy_file: Option<PathBuf>,
    /// Directory of `<domain>/<file>` cookie files
    #[arg(long, global = true)]
    cookie_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract from one page
    Extract {
        url: String,
        /// Read the page from a file instead of fetching it
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Print the plain text form instead of JSON
        #[arg(long)]
        text: bool,
    },
    /// Load every template and print it back
    Check,
}

impl Cli {
    fn options(&self) -> anyhow::Result<Options> {
        let mut options = match &self.config {
            Some(path) => Options::from_file(path)?,
            None => Options::default(),
        };
        if let Some(dir) = &self.templates {
            options.template_dir = dir.clone();
        }
        if let Some(user_agent) = &self.user_agent {
            options.user_agent = user_agent.clone();
        }
        if let Some(path) = &self.proxy_file {
            options.proxy_file = Some(path.clone());
        }
        if let Some(dir) = &self.cookie_dir {
            options.cookie_dir = Some(dir.clone());
        }
        Ok(options)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli.options()?;

    match &cli.command {
        Commands::Extract { url, input, text } => {
            let extractor = Extractor::new(&options)?;
            let page = match input {
                Some(path) => {
                    fs::read(path).with_context(|| format!("reading {}", path.display()))?
                }
                None => extractor
                    .fetcher()
                    .get(url, "")
                    .with_context(|| format!("fetching {url}"))?
                    .body,
            };

            let result = extractor.extract(url, &page)?;
            if *text {
                print!("{result}");
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Commands::Check => {
            let templates = TemplateSet::load_dir(&options.template_dir)?;
            for template in templates.iter() {
                println!("{template}");
            }
            println!("{} templates OK", templates.len());
        }
    }
    Ok(())
}
