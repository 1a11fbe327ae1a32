//! Per-chain secondary structure and solvent accessibility datasets from PDB
//! structures annotated with DSSP.

pub mod archive;
pub mod batch;
pub mod config;
pub mod domain;
pub mod dssp;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod manifest;
pub mod output;
pub mod pdb;
pub mod rcsb;
pub mod store;
