use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use ldap_customer_sync::config::{self, ConfigError};
use ldap_customer_sync::directory::{DirectoryService, LdapDirectory};
use ldap_customer_sync::mapper;
use ldap_customer_sync::odoo::OdooClient;
use ldap_customer_sync::reconcile;

/// Overrides the config file found next to the program.
const CONFIG_ENV: &str = "LDAP_CUSTOMER_SYNC_CONFIG";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Synchronize backend customers from directory persons"
)]
struct Args {
    /// Only print intended actions, don't actually modify backend customers
    #[arg(short, long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let config_path = match std::env::var_os(CONFIG_ENV) {
        Some(path) => PathBuf::from(path),
        None => config::default_path(
            &std::env::current_exe().context("cannot locate the running program")?,
        ),
    };
    let cfg = match config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            report_config_error(&config_path, &err);
            return Ok(ExitCode::from(2));
        }
    };
    info!(config = %config_path.display(), dry_run = args.dry_run, "starting customer sync");

    let directory = LdapDirectory::connect(&cfg.directory).await?;
    let persons = directory.search_persons().await?;
    directory.unbind().await?;
    if persons.is_empty() {
        bail!(
            "directory returned no persons below {}; refusing to deactivate every customer",
            cfg.directory.dn
        );
    }

    let customers = persons
        .iter()
        .map(mapper::person_to_customer)
        .collect::<Result<Vec<_>, _>>()?;

    let backend = OdooClient::login(&cfg.backend).await?;
    let mut out = io::stdout().lock();
    reconcile::reconcile(&backend, customers, args.dry_run, &mut out).await?;
    out.flush()?;

    Ok(ExitCode::SUCCESS)
}

fn report_config_error(path: &Path, err: &ConfigError) {
    match err {
        ConfigError::Schema { issues, .. } => {
            for issue in issues {
                eprintln!("ERROR: {} in {}", issue, path.display());
            }
        }
        ConfigError::Io(io_err) => {
            eprintln!("ERROR: cannot read {}: {}", path.display(), io_err);
        }
        other => eprintln!("ERROR: {} in {}", other, path.display()),
    }
}
