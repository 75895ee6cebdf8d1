//! Maintenance utilities for the object store and the catalog.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use gps_core::{
    catalog::{closest_in_time, Filters, QueryField},
    load_config, read_area,
    store::{check_in_store, join_key, push_outputs, remove_prefix},
    BlobStore, Catalog, DataHubClient, HttpOriginDownloader, ObjectStoreBlobStore,
    OriginDownloader, SearchQuery, StoreEnvironment,
};
use gps_service::init_logging;

#[derive(Parser)]
#[command(name = "gps-admin", version, about = "Maintenance utilities for the processing service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List depth-limited prefixes of input or output sets
    Check {
        names: Vec<String>,
        /// Look under the input prefix instead of the output prefix
        #[arg(short, long)]
        input: bool,
        /// Every set under the prefix
        #[arg(short, long)]
        all: bool,
        #[arg(short, long, default_value_t = 1)]
        depth: usize,
    },
    /// Remove input or output sets from the store
    Delete {
        names: Vec<String>,
        #[arg(short, long)]
        input: bool,
        #[arg(short, long)]
        all: bool,
    },
    /// Upload a local directory as an input set
    Seed {
        dir: PathBuf,
        #[arg(long, default_value = "test")]
        name: String,
    },
    /// Find the closest-in-time radar and RGB snapshots for an area
    Nearest {
        area: PathBuf,
        #[arg(long, default_value_t = 50.0)]
        max_cloud: f64,
        /// Download both snapshots to the configured download path
        #[arg(long)]
        download: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            names,
            input,
            all,
            depth,
        } => {
            let (store, env) = open_store()?;
            let prefix = if input { &env.input_prefix } else { &env.output_prefix };
            for target in targets(prefix, &names, all)? {
                let found = check_in_store(store.as_ref(), &target, depth).await?;
                println!("{} ({} entries)", target, found.len());
                for entry in found {
                    println!("  {}", entry);
                }
            }
        }
        Command::Delete { names, input, all } => {
            let (store, env) = open_store()?;
            let prefix = if input { &env.input_prefix } else { &env.output_prefix };
            for target in targets(prefix, &names, all)? {
                let removed = remove_prefix(store.as_ref(), &target).await?;
                println!("{}: removed {} objects", target, removed.len());
            }
        }
        Command::Seed { dir, name } => {
            if !dir.is_dir() {
                bail!("{} is not a directory", dir.display());
            }
            let (store, env) = open_store()?;
            let prefix = join_key(&[&env.input_prefix, &name]);
            let keys = push_outputs(store.as_ref(), &prefix, &dir)
                .await
                .with_context(|| format!("Failed to upload {}", dir.display()))?;
            for key in &keys {
                println!("{}", key);
            }
            info!(set = %name, objects = keys.len(), "Input set seeded");
        }
        Command::Nearest {
            area,
            max_cloud,
            download,
        } => nearest(area, max_cloud, download).await?,
    }
    Ok(())
}

fn open_store() -> Result<(Arc<dyn BlobStore>, StoreEnvironment)> {
    let env = StoreEnvironment::from_env().context("Object store environment is incomplete")?;
    let store = ObjectStoreBlobStore::from_environment(&env).context("Failed to open object store")?;
    Ok((Arc::new(store), env))
}

/// Store prefixes addressed by a check or delete.
fn targets(prefix: &str, names: &[String], all: bool) -> Result<Vec<String>> {
    if all {
        return Ok(vec![join_key(&[prefix])]);
    }
    if names.is_empty() {
        bail!("name at least one set, or pass --all");
    }
    Ok(names.iter().map(|name| join_key(&[prefix, name])).collect())
}

async fn nearest(area_path: PathBuf, max_cloud: f64, download: bool) -> Result<()> {
    let config_path = std::env::var("GPS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    let area = read_area(&area_path).await?;
    let client = DataHubClient::new(config.catalog.clone(), config.credentials.clone())?
        .verbose(config.verbose);

    let radar_query = SearchQuery::new().with_filter(&Filters::radar());
    let rgb_query = SearchQuery::new()
        .with_filter(&Filters::rgb())
        .with(QueryField::CloudCoverPercentage, format!("[0 TO {}]", max_cloud));

    let radar = client.search(&radar_query, Some(&area.wkt)).await?;
    let rgb = client.search(&rgb_query, Some(&area.wkt)).await?;
    info!(radar = radar.len(), rgb = rgb.len(), "Searched area {}", area.name);

    let Some((a, b, gap)) = closest_in_time(&radar, &rgb) else {
        println!("No pair found for {}", area.name);
        return Ok(());
    };
    println!("radar: {} ({})", a.title, a.begin_position);
    println!("rgb:   {} ({})", b.title, b.begin_position);
    println!("gap:   {} minutes", gap.num_minutes());

    if download {
        let Some(dest) = config.download.output() else {
            bail!("--download needs [download] enable = true and a path");
        };
        let downloader = HttpOriginDownloader::new(
            config.credentials.clone(),
            Duration::from_secs(config.catalog.timeout_secs),
        )?;
        for snapshot in [a, b] {
            let path = downloader.fetch(snapshot, dest).await?;
            println!("downloaded {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_check() {
        let cli = Cli::try_parse_from(["gps-admin", "check", "setA", "setB", "-i", "-d", "2"]).unwrap();
        match cli.command {
            Command::Check {
                names,
                input,
                all,
                depth,
            } => {
                assert_eq!(names, vec!["setA", "setB"]);
                assert!(input);
                assert!(!all);
                assert_eq!(depth, 2);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_targets() {
        assert_eq!(
            targets("output/", &["setA".to_string()], false).unwrap(),
            vec!["output/setA"]
        );
        assert_eq!(targets("output", &[], true).unwrap(), vec!["output"]);
        assert!(targets("output", &[], false).is_err());
    }
}
