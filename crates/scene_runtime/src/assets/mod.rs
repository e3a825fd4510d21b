//! Asset references

pub mod resource_catalog;

pub use resource_catalog::{ResourceCatalog, ResourceHandle, ResourceKind};
