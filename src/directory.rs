use anyhow::{Context, Result};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, Scope, SearchEntry};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config;
use crate::model::{AttributeValue, PersonRecord};

pub const PERSON_FILTER: &str = "(objectClass=person)";

/// Source of person records.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn search_persons(&self) -> Result<Vec<PersonRecord>>;
}

/// A bound LDAP session searching persons below one base DN.
pub struct LdapDirectory {
    ldap: Ldap,
    url: String,
    base_dn: String,
}

impl fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("url", &self.url)
            .field("base_dn", &self.base_dn)
            .finish_non_exhaustive()
    }
}

impl LdapDirectory {
    /// Connect and simple-bind with the configured credentials.
    pub async fn connect(cfg: &config::Directory) -> Result<Self> {
        debug!(url = %cfg.url, "connecting to directory");
        let (conn, mut ldap) = LdapConnAsync::new(&cfg.url)
            .await
            .with_context(|| format!("failed to connect to directory at {}", cfg.url))?;

        tokio::spawn(async move {
            if let Err(err) = conn.drive().await {
                warn!(%err, "directory connection driver error");
            }
        });

        ldap.simple_bind(&cfg.username, &cfg.password)
            .await
            .with_context(|| format!("directory bind failed for {}", cfg.username))?
            .success()
            .with_context(|| format!("directory rejected bind for {}", cfg.username))?;
        info!(url = %cfg.url, "bound to directory");

        Ok(Self {
            ldap,
            url: cfg.url.clone(),
            base_dn: cfg.dn.clone(),
        })
    }

    pub async fn unbind(mut self) -> Result<()> {
        self.ldap
            .unbind()
            .await
            .context("failed to unbind from directory")
    }
}

#[async_trait]
impl DirectoryService for LdapDirectory {
    async fn search_persons(&self) -> Result<Vec<PersonRecord>> {
        let mut ldap = self.ldap.clone();
        let (entries, _) = ldap
            .search(&self.base_dn, Scope::Subtree, PERSON_FILTER, vec!["*"])
            .await
            .with_context(|| format!("directory search below {} failed", self.base_dn))?
            .success()
            .with_context(|| format!("directory search below {} was rejected", self.base_dn))?;

        let persons: Vec<PersonRecord> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(entry_to_person)
            .collect();
        info!(count = persons.len(), base_dn = %self.base_dn, "fetched directory persons");
        Ok(persons)
    }
}

/// Text and binary attributes both land in the same bag.
pub fn entry_to_person(entry: SearchEntry) -> PersonRecord {
    let mut person = PersonRecord::new(entry.dn);
    for (name, values) in entry.attrs {
        person
            .attrs
            .entry(name)
            .or_default()
            .extend(values.into_iter().map(AttributeValue::Text));
    }
    for (name, values) in entry.bin_attrs {
        person
            .attrs
            .entry(name)
            .or_default()
            .extend(values.into_iter().map(AttributeValue::Bytes));
    }
    person
}
