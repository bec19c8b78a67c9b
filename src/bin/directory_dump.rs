use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ldap_customer_sync::config;
use ldap_customer_sync::directory::{DirectoryService, LdapDirectory};
use ldap_customer_sync::mapper;

/// Print directory persons as they would be mapped to customers.
#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(&args.config)?;

    let directory = LdapDirectory::connect(&cfg.directory).await?;
    let persons = directory.search_persons().await?;
    directory.unbind().await?;

    let mut customers = Vec::new();
    for person in &persons {
        match mapper::person_to_customer(person) {
            Ok(customer) => customers.push(customer),
            Err(err) => eprintln!("# {err}"),
        }
    }
    print!("{}", serde_yaml::to_string(&customers)?);
    eprintln!("{} persons, {} mapped", persons.len(), customers.len());
    Ok(())
}
