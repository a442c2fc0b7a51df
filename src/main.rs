//! aliddns - Dynamic DNS client for Alibaba Cloud DNS.

use aliddns::config::{config_path, normalize_ip_apis, Config, Credentials};
use aliddns::detector::IpDetector;
use aliddns::geo::GeoLocator;
use aliddns::providers::{delete_records, list_records, AlidnsProvider};
use aliddns::record::{split_domain, zone_of, DesiredRecord};
use aliddns::resolver::DnsResolver;
use aliddns::{DdnsError, Outcome, Reconciler, RedoSpec, Scheduler};
use clap::{CommandFactory, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aliddns")]
#[command(about = "Keep an Alibaba Cloud DNS A/AAAA record in sync with your public IP")]
#[command(version)]
struct Cli {
    /// AccessKey ID (falls back to $AKID, $AccessKeyID)
    #[arg(long = "access-key-id", visible_alias = "id", global = true)]
    access_key_id: Option<String>,

    /// AccessKey secret (falls back to $AKSCT, $AccessKeySecret)
    #[arg(long = "access-key-secret", visible_alias = "secret", global = true)]
    access_key_secret: Option<String>,

    /// Web API to get IP, like http://myip.ipip.net (repeatable)
    #[arg(long = "ipapi", visible_alias = "api", global = true)]
    ipapi: Vec<String>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all records of a zone
    List {
        /// Zone name, like example.com
        #[arg(short, long)]
        domain: String,
    },

    /// Delete every record for a host label
    Delete {
        /// Full domain name, like ddns.example.com
        #[arg(short, long)]
        domain: String,
    },

    /// Point a record at an address, creating it if missing
    Update {
        /// Full domain name, like ddns.example.com
        #[arg(short, long)]
        domain: String,

        /// Address, like 1.2.3.4
        #[arg(short, long)]
        ipaddr: String,

        /// Update the AAAA record
        #[arg(short = '6', long)]
        ipv6: bool,
    },

    /// Detect the public IP and update the record, optionally repeating
    AutoUpdate {
        /// Full domain name, like ddns.example.com
        #[arg(short, long)]
        domain: String,

        /// Repeat every N seconds; disabled below 10; suffix R for a random [N, 2N) delay
        #[arg(short, long)]
        redo: Option<String>,

        /// Update the AAAA record
        #[arg(short = '6', long)]
        ipv6: bool,
    },

    /// Print the public IP detected via web APIs
    Getip {
        #[arg(short = '6', long)]
        ipv6: bool,
    },

    /// Print the address public DNS currently returns for a name
    Resolve {
        /// Domain name, like ddns.example.com
        #[arg(short, long)]
        domain: String,

        #[arg(short = '6', long)]
        ipv6: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load_from(&config_path(cli.config.clone()))?;

    let detector = build_detector(&cli, &config);
    let resolver = build_resolver(&config);

    match &cli.command {
        Commands::List { domain } => {
            let provider = build_provider(&cli, &config)?;
            cmd_list(&provider, domain).await?;
        }
        Commands::Delete { domain } => {
            let provider = build_provider(&cli, &config)?;
            cmd_delete(&provider, domain).await?;
        }
        Commands::Update {
            domain,
            ipaddr,
            ipv6,
        } => {
            let provider = build_provider(&cli, &config)?;
            cmd_update(&provider, &resolver, domain, ipaddr, *ipv6).await?;
        }
        Commands::AutoUpdate { domain, redo, ipv6 } => {
            // Reject a bad interval before touching the network.
            let redo = RedoSpec::parse_optional(redo.as_deref())?;
            let provider = build_provider(&cli, &config)?;
            cmd_auto_update(&provider, &detector, &resolver, domain, redo, *ipv6).await?;
        }
        Commands::Getip { ipv6 } => {
            cmd_getip(&detector, *ipv6).await?;
        }
        Commands::Resolve { domain, ipv6 } => {
            cmd_resolve(&resolver, domain, *ipv6).await?;
        }
    }

    Ok(())
}

fn build_provider(cli: &Cli, config: &Config) -> anyhow::Result<AlidnsProvider> {
    let creds = Credentials::resolve(
        cli.access_key_id.as_deref(),
        cli.access_key_secret.as_deref(),
        config,
    )
    .map_err(|e| {
        let _ = Cli::command().print_help();
        e
    })?;

    tracing::debug!("Using {:?}", creds);
    Ok(AlidnsProvider::new(creds.id, creds.secret))
}

fn build_detector(cli: &Cli, config: &Config) -> IpDetector {
    let overrides = if cli.ipapi.is_empty() {
        normalize_ip_apis(&config.ip_apis)
    } else {
        normalize_ip_apis(&cli.ipapi)
    };

    let detector = if overrides.is_empty() {
        IpDetector::new()
    } else {
        IpDetector::with_services(overrides)
    };
    detector.timeout(config.timeout())
}

fn build_resolver(config: &Config) -> DnsResolver {
    let resolver = if config.dns_upstreams.is_empty() {
        DnsResolver::new()
    } else {
        DnsResolver::with_upstreams(config.dns_upstreams.clone())
    };
    resolver.timeout(config.timeout())
}

async fn cmd_list(provider: &AlidnsProvider, domain: &str) -> anyhow::Result<()> {
    let zone = zone_of(domain)?;
    let records = list_records(provider, &zone).await?;

    for record in records {
        println!(
            "{:>20}   {:<8} {}",
            record.full_name(),
            record.record_type,
            record.value
        );
    }

    Ok(())
}

async fn cmd_delete(provider: &AlidnsProvider, domain: &str) -> anyhow::Result<()> {
    let (rr, zone) = split_domain(domain)?;
    let deleted = delete_records(provider, &rr, &zone).await?;

    println!("{} Deleted ({} records)", domain, deleted);
    Ok(())
}

async fn cmd_update(
    provider: &AlidnsProvider,
    resolver: &DnsResolver,
    domain: &str,
    ipaddr: &str,
    ipv6: bool,
) -> anyhow::Result<()> {
    let ip: IpAddr = ipaddr
        .trim()
        .parse()
        .map_err(|_| DdnsError::Config(format!("Invalid IP address: {:?}", ipaddr)))?;
    if ip.is_ipv6() != ipv6 {
        return Err(DdnsError::Config(format!(
            "{} is not an {} address",
            ip,
            if ipv6 { "IPv6" } else { "IPv4" }
        ))
        .into());
    }

    let desired = DesiredRecord::for_ip(domain, ip)?;
    let outcome = Reconciler::new(provider)
        .with_published_lookup(resolver)
        .reconcile(&desired)
        .await?;

    report(domain, ip, &outcome).await;
    Ok(())
}

async fn cmd_auto_update(
    provider: &AlidnsProvider,
    detector: &IpDetector,
    resolver: &DnsResolver,
    domain: &str,
    redo: RedoSpec,
    ipv6: bool,
) -> anyhow::Result<()> {
    let reconciler = Reconciler::new(provider).with_published_lookup(resolver);
    let reconciler = &reconciler;

    Scheduler::new(redo)
        .run(move || async move {
            let ip = detector.detect(ipv6).await.ok_or_else(|| {
                DdnsError::IpDetection("IP is empty, please check network".to_string())
            })?;

            let desired = DesiredRecord::for_ip(domain, ip)?;
            let outcome = reconciler.reconcile(&desired).await?;
            report(domain, ip, &outcome).await;
            Ok::<(), DdnsError>(())
        })
        .await?;

    Ok(())
}

async fn cmd_getip(detector: &IpDetector, ipv6: bool) -> anyhow::Result<()> {
    let ip = detector
        .detect(ipv6)
        .await
        .ok_or_else(|| DdnsError::IpDetection("All IP detection services failed".to_string()))?;

    if ip.is_ipv4() {
        println!("{} {}", ip, GeoLocator::new().label(ip).await);
    } else {
        println!("{}", ip);
    }
    Ok(())
}

async fn cmd_resolve(resolver: &DnsResolver, domain: &str, ipv6: bool) -> anyhow::Result<()> {
    let ip = resolver.resolve(domain, ipv6).await.ok_or_else(|| {
        DdnsError::IpDetection(format!("No DNS upstream answered for {}", domain))
    })?;

    if ip.is_ipv4() {
        println!("{} {}", ip, GeoLocator::new().label(ip).await);
    } else {
        println!("{}", ip);
    }
    Ok(())
}

async fn report(domain: &str, ip: IpAddr, outcome: &Outcome) {
    let label = if ip.is_ipv4() {
        GeoLocator::new().label(ip).await
    } else {
        String::new()
    };

    match outcome {
        Outcome::Skipped => tracing::info!("{} {} {} (already published)", domain, ip, label),
        Outcome::Unchanged => tracing::info!("{} {} {} (unchanged)", domain, ip, label),
        Outcome::Created => tracing::info!("{} {} {} (created)", domain, ip, label),
        Outcome::Updated { id } => {
            tracing::info!("{} {} {} (updated record {})", domain, ip, label, id)
        }
    }
}
