//! `monodeploy` deploys the backend services of a project to a remote platform.
//!
//! # Overview
//!
//! A deployment takes the services and storages a project declares, reconciles them with the
//! manifest the platform last accepted, and drives every service that needs it through a
//! build → verify → publish pipeline before submitting the new manifest. It handles:
//! - Descriptor discovery and validation
//! - Dependency-aware reconciliation with the remote manifest
//! - Image builds and local health verification
//! - Content-addressed upload dedup
//! - Manifest submission
//!
//! # Architecture
//!
//! - **Descriptors**: the declared services and storages, cached in a registry
//! - **Reconciliation**: merges local intent and remote state into an ordered plan
//! - **Deployment**: the per-service pipeline and the orchestrator driving it
//! - **Platform**: the platform API, the container engine and the health endpoints
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use monodeploy::{
//!     config::DeployConfig,
//!     deploy::Orchestrator,
//!     descriptor::{
//!         DescriptorRegistry, ServiceDescriptor, StaticDiscovery, StorageDescriptor,
//!         TracingHintSink,
//!     },
//!     manifest::ManifestModel,
//!     platform::{DockerEngine, HttpHealthProbe, HttpPlatformClient, PlatformApi},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = StaticDiscovery::new()
//!         .service(
//!             ServiceDescriptor::builder()
//!                 .name("inventory")
//!                 .dependencies(["inventory-db".to_string()])
//!                 .build_context("services/inventory")
//!                 .build(),
//!         )
//!         .storage(StorageDescriptor::builder().name("inventory-db").build());
//!     let registry = DescriptorRegistry::discover(&source, &TracingHintSink).await?;
//!
//!     let config = DeployConfig::default();
//!     let platform = Arc::new(HttpPlatformClient::new(config.get_platform()));
//!     let remote = platform.fetch_remote_manifest().await?;
//!     let model = ManifestModel::compose(&registry, &remote);
//!
//!     let mut orchestrator = Orchestrator::new(
//!         registry,
//!         platform,
//!         Arc::new(DockerEngine::new(&config)),
//!         Arc::new(HttpHealthProbe::new(&config)?),
//!         config,
//!     );
//!
//!     let report = orchestrator
//!         .deploy(&model, CancellationToken::new(), |_| {}, |msg| println!("{msg}"))
//!         .await?;
//!     println!("published {:?}", report.get_published());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Deployment settings and the project file
//! - [`deploy`] - Pipeline, publish stage and orchestrator
//! - [`descriptor`] - Service and storage descriptors and their registry
//! - [`management`] - Project-level operations used by the binary
//! - [`manifest`] - Local model and wire entities
//! - [`platform`] - External collaborators
//! - [`reconcile`] - Reconciliation into a deployment plan
//! - [`utils`] - Common utilities and helpers

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod cli;
pub mod config;
pub mod deploy;
pub mod descriptor;
pub mod management;
pub mod manifest;
pub mod platform;
pub mod reconcile;
pub mod utils;

pub use error::*;
