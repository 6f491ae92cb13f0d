pub mod classify;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod fasta;
pub mod fs_util;
pub mod maxquant;
pub mod output;
pub mod report;
pub mod saint;
