//! Synchronize backend customers from directory persons, matched by barcode.

pub mod config;
pub mod directory;
pub mod mapper;
pub mod model;
pub mod odoo;
pub mod reconcile;
