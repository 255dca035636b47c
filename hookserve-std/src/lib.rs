//! # hookserve-std
//!
//! Registration, API surface assembly and dispatch for hookserve.
//!
//! This crate provides:
//! - **Registration**: [`HookRegistration`], [`RegistryBuilder`], [`HookRegistry`]
//! - **Routing**: [`RouteTable`], failing fast on duplicate routes
//! - **Assembly**: [`ApiGroupDescriptor`], the [`ApiServer`] seam and [`install`]
//! - **Lifecycle**: named post-start hooks and their [`PostStartStatus`]
//! - **Dispatch**: [`Dispatcher`], per-request decode, invoke and timeout
//!
//! [`HookRegistration`]: registry::HookRegistration
//! [`RegistryBuilder`]: registry::RegistryBuilder
//! [`HookRegistry`]: registry::HookRegistry
//! [`RouteTable`]: routing::RouteTable
//! [`ApiGroupDescriptor`]: assembler::ApiGroupDescriptor
//! [`ApiServer`]: assembler::ApiServer
//! [`install`]: assembler::install
//! [`PostStartStatus`]: lifecycle::PostStartStatus
//! [`Dispatcher`]: dispatch::Dispatcher

#![deny(clippy::pub_use, clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use hookserve_core;

// Modules
pub mod assembler;
pub mod dispatch;
pub mod lifecycle;
pub mod registry;
pub mod routing;
pub mod testing;
