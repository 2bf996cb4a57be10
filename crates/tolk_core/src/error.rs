use thiserror::Error;

use std::io;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("opcode {opcode:#x} is out of range for the {table} table")]
    OpcodeOutOfRange {
        table: &'static str,
        opcode: u32,
    },

    #[error("{table} opcode {opcode:#x} is already assigned to '{existing}'")]
    DuplicateInstruction {
        table: &'static str,
        opcode: u32,
        existing: &'static str,
    },
}
