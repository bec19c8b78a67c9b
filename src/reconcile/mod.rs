//! Backend customer reconciliation against directory-derived customers.
//!
//! `plan` is pure: given the backend snapshot and the desired customers it
//! lists the actions to take. `apply` prints each action and, unless in
//! dry-run mode, issues the matching backend call. `reconcile` fetches the
//! snapshot once and runs both.

mod actions;
mod index;

pub use actions::{Action, SyncSummary};
pub use index::{CustomerIndex, Keyed};

use anyhow::{ensure, Context, Result};
use serde_json::{Map, Value};
use std::io::Write;
use tracing::{info, instrument};

use crate::model::{BackendCustomer, CustomerField, CustomerRecord};
use crate::odoo::{CustomerBackend, Domain, PARTNER_MODEL};

/// Bring backend customers in line with `new_customers`.
#[instrument(skip_all, fields(dry_run = dry_run))]
pub async fn reconcile<W: Write>(
    backend: &dyn CustomerBackend,
    new_customers: Vec<CustomerRecord>,
    dry_run: bool,
    out: &mut W,
) -> Result<SyncSummary> {
    let fields = CustomerRecord::field_names();
    let old = CustomerIndex::build(fetch_customers(backend, &fields).await?);
    let new = CustomerIndex::build(new_customers);
    info!(old = old.len(), new = new.len(), "reconciling customers");

    let actions = plan(&old, &new);
    let summary = apply(backend, &actions, dry_run, out).await?;
    info!(
        created = summary.created,
        updated = summary.updated,
        deactivated = summary.deactivated,
        without_barcode = summary.without_barcode,
        dry_run,
        "reconciliation finished"
    );
    Ok(summary)
}

/// Every non-company customer, inactive ones included.
pub async fn fetch_customers(
    backend: &dyn CustomerBackend,
    fields: &[&str],
) -> Result<Vec<BackendCustomer>> {
    let customers = Domain::new().field_eq("is_company", false).field_eq("customer", true);
    // inactive records are hidden unless the domain asks for them
    let inactive = customers.clone().field_eq("active", false);

    let mut ids = backend
        .search(PARTNER_MODEL, &customers)
        .await
        .context("failed to search active customers")?;
    ids.extend(
        backend
            .search(PARTNER_MODEL, &inactive)
            .await
            .context("failed to search inactive customers")?,
    );
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    backend
        .read(PARTNER_MODEL, &ids, fields)
        .await
        .context("failed to read customers")?
        .into_iter()
        .map(|raw| serde_json::from_value(raw).context("malformed customer record"))
        .collect()
}

/// Create-or-update pass over `new`, then deactivation pass over `old`.
pub fn plan(
    old: &CustomerIndex<BackendCustomer>,
    new: &CustomerIndex<CustomerRecord>,
) -> Vec<Action> {
    let mut actions = Vec::new();

    for person in new.unkeyed() {
        actions.push(Action::PersonWithoutBarcode {
            name: person.name.clone(),
            email: person.email.clone(),
        });
    }
    for (barcode, wanted) in new.iter() {
        match old.get(barcode) {
            None => actions.push(Action::Create {
                record: wanted.clone(),
            }),
            Some(existing) => {
                let changes = wanted.changes_from(&existing.record);
                if !changes.is_empty() {
                    actions.push(Action::Update {
                        id: existing.id,
                        name: existing.record.name.clone(),
                        changes,
                    });
                }
            }
        }
    }

    for customer in old.unkeyed() {
        actions.push(Action::CustomerWithoutBarcode {
            id: customer.id,
            name: customer.record.name.clone(),
            email: customer.record.email.clone(),
        });
    }
    for (barcode, existing) in old.iter() {
        if !new.contains(barcode) && existing.record.active {
            actions.push(Action::Deactivate {
                id: existing.id,
                name: existing.record.name.clone(),
                email: existing.record.email.clone(),
            });
        }
    }

    actions
}

/// Print every action; issue backend calls unless `dry_run`. The first
/// failing call aborts, leaving earlier calls applied.
pub async fn apply<W: Write>(
    backend: &dyn CustomerBackend,
    actions: &[Action],
    dry_run: bool,
    out: &mut W,
) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();
    for action in actions {
        writeln!(out, "{action}")?;
        summary.record(action);
        if dry_run {
            continue;
        }

        match action {
            Action::Create { record } => {
                let id = backend
                    .create(PARTNER_MODEL, record.to_values())
                    .await
                    .with_context(|| format!("failed to create customer {}", record.name))?;
                writeln!(out, "    => id {id}")?;
            }
            Action::Update { id, changes, .. } => {
                write_customer(backend, *id, changes.to_values()).await?;
            }
            Action::Deactivate { id, .. } => {
                let mut values = Map::new();
                values.insert(CustomerField::Active.as_str().into(), Value::Bool(false));
                write_customer(backend, *id, values).await?;
            }
            Action::PersonWithoutBarcode { .. } | Action::CustomerWithoutBarcode { .. } => {}
        }
    }
    Ok(summary)
}

async fn write_customer(
    backend: &dyn CustomerBackend,
    id: i64,
    values: Map<String, Value>,
) -> Result<()> {
    let written = backend
        .write(PARTNER_MODEL, &[id], values)
        .await
        .with_context(|| format!("failed to update customer {id}"))?;
    ensure!(written, "backend refused to update customer {id}");
    Ok(())
}
