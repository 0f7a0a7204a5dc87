// Library exports for chromstitch
pub mod alignment;
pub mod anchor;
pub mod assemble;
pub mod builder;
pub mod error;
pub mod fasta;
pub mod map;
pub mod simulator;
pub mod transfer;
