//! amz-offers - Amazon offer aggregation and optimal price resolution CLI

use amz_offers::amazon::details::DetailMode;
use amz_offers::amazon::regions::Region;
use amz_offers::commands::{
    read_pages, read_pairs, DetailsCommand, ImagesCommand, ProductPage, ProductPair, ResolveCommand,
};
use amz_offers::config::{Backend, Config, OutputFormat};
use amz_offers::format::Formatter;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "amz-offers",
    version,
    about = "Resolve the optimal New-condition price of Amazon products",
    long_about = "Reads a product's buy-box and all-offers panel, deduplicates the offers and picks an optimal price from a band around the third cheapest offer."
)]
struct Cli {
    /// Amazon region (overrides config and AMZ_REGION)
    #[arg(short, long, global = true)]
    region: Option<Region>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "AMZ_PROXY")]
    proxy: Option<String>,

    /// Delay between products in milliseconds
    #[arg(long, global = true, env = "AMZ_DELAY")]
    delay: Option<u64>,

    /// Lower price band multiplier
    #[arg(long, global = true, env = "AMZ_LOWER")]
    lower: Option<f64>,

    /// Upper price band multiplier
    #[arg(long, global = true, env = "AMZ_UPPER")]
    upper: Option<f64>,

    /// Page load retries for the details and images commands
    #[arg(long, global = true, env = "AMZ_RETRIES")]
    retries: Option<u32>,

    /// Page backend (http, chromium)
    #[arg(short, long, global = true)]
    backend: Option<Backend>,

    /// Show the browser window (chromium backend)
    #[arg(long, global = true)]
    headed: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one product from its page and offers panel URLs
    #[command(alias = "r")]
    Resolve {
        /// Product detail page URL
        main_url: String,

        /// All-offers panel URL
        panel_url: String,
    },

    /// Resolve products by ASIN
    #[command(alias = "a")]
    Asin {
        /// ASIN(s) to resolve
        #[arg(required = true)]
        asins: Vec<String>,
    },

    /// Resolve every URL pair in a file (main_url,panel_url per line)
    #[command(alias = "b")]
    Batch {
        /// Input file
        file: PathBuf,
    },

    /// Read title, price, features and detail tables of product pages
    #[command(alias = "d")]
    Details {
        /// Product URLs or ASINs
        inputs: Vec<String>,

        /// Detail mode (electronics, book)
        #[arg(short, long)]
        mode: Option<DetailMode>,

        /// File with one product URL per line
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Collect high-resolution image URLs of product pages
    #[command(alias = "i")]
    Images {
        /// Product URLs or ASINs
        inputs: Vec<String>,

        /// File with one product URL per line
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List output columns
    Columns,

    /// List supported regions
    Regions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(region) = cli.region {
        config.region = region;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(lower) = cli.lower {
        config.lower_multiplier = lower;
    }
    if let Some(upper) = cli.upper {
        config.upper_multiplier = upper;
    }
    if let Some(retries) = cli.retries {
        config.max_retries = retries;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if cli.headed {
        config.headless = false;
    }

    match cli.command {
        Commands::Resolve { main_url, panel_url } => {
            let cmd = ResolveCommand::new(config);
            let output = cmd.execute(&[ProductPair::new(main_url, panel_url)]).await?;
            println!("{}", output);
        }

        Commands::Asin { asins } => {
            let pairs = asins
                .iter()
                .map(|asin| ProductPair::from_asin(asin, config.region))
                .collect::<Result<Vec<_>>>()?;

            let cmd = ResolveCommand::new(config);
            let output = cmd.execute(&pairs).await?;
            println!("{}", output);
        }

        Commands::Batch { file } => {
            let pairs = read_pairs(&file)?;
            if pairs.is_empty() {
                info!("No product pairs found in {}", file.display());
            }

            let cmd = ResolveCommand::new(config);
            let output = cmd.execute(&pairs).await?;
            println!("{}", output);
        }

        Commands::Details { inputs, mode, file } => {
            let pages = collect_pages(&inputs, file.as_deref(), config.region)?;
            let mut cmd = DetailsCommand::new(config);
            if let Some(mode) = mode {
                cmd = cmd.with_mode(mode);
            }
            let output = cmd.execute(&pages).await?;
            println!("{}", output);
        }

        Commands::Images { inputs, file } => {
            let pages = collect_pages(&inputs, file.as_deref(), config.region)?;
            let cmd = ImagesCommand::new(config);
            let output = cmd.execute(&pages).await?;
            println!("{}", output);
        }

        Commands::Columns => {
            let formatter = Formatter::new(config.format, config.region);
            println!("{}", formatter.format_columns());
        }

        Commands::Regions => {
            println!("Supported Amazon regions:\n");
            println!("{:<6} {:<20} {:<10}", "Code", "Domain", "Currency");
            println!("{:-<6} {:-<20} {:-<10}", "", "", "");

            for region in Region::all() {
                println!(
                    "{:<6} {:<20} {:<10}",
                    region.to_string(),
                    region.domain(),
                    region.currency()
                );
            }
        }
    }

    Ok(())
}

/// Product pages from the command line, then from the input file.
fn collect_pages(inputs: &[String], file: Option<&Path>, region: Region) -> Result<Vec<ProductPage>> {
    let mut pages = inputs
        .iter()
        .map(|input| ProductPage::parse(input, region))
        .collect::<Result<Vec<_>>>()?;

    if let Some(file) = file {
        pages.extend(read_pages(file)?);
    }
    if pages.is_empty() {
        bail!("No products given. Pass URLs or ASINs, or --file");
    }
    Ok(pages)
}
