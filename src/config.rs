/// Runtime configuration.
///
/// CLI arguments with environment variable fallbacks, using clap. A `.env`
/// file is loaded by the binary before parsing.
use std::path::PathBuf;

use clap::Args;

use crate::crypto::hash::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use crate::crypto::kdf::{Kek, KekDerivation};
use crate::crypto::vault::PrivateKeyVault;
use crate::error::{IntegrityError, Result};
use crate::pipeline::PipelineConfig;

/// Settings for the private-key vault.
#[derive(Args, Debug, Clone)]
pub struct VaultArgs {
    /// Long-lived server secret the KEK is derived from.
    ///
    /// Changing it makes every stored private key undecryptable.
    #[arg(long, env = "DOCSEAL_SERVER_SECRET", hide_env_values = true)]
    pub server_secret: Option<String>,

    /// KEK derivation function
    #[arg(long, env = "DOCSEAL_KEK_DERIVATION", value_enum, default_value_t = KekDerivation::Sha256)]
    pub kek_derivation: KekDerivation,
}

impl VaultArgs {
    pub fn kek(&self) -> Result<Kek> {
        let secret = self.server_secret.as_deref().ok_or_else(|| {
            IntegrityError::Config("DOCSEAL_SERVER_SECRET (or --server-secret) is required".into())
        })?;
        Kek::derive(secret.as_bytes(), self.kek_derivation)
    }

    pub fn vault(&self) -> Result<PrivateKeyVault> {
        Ok(PrivateKeyVault::new(self.kek()?))
    }
}

/// Settings shared by every command.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[command(flatten)]
    pub vault: VaultArgs,

    /// JSON snapshot file backing the record store
    #[arg(long, env = "DOCSEAL_STORE", default_value = "docseal-store.json")]
    pub store: PathBuf,

    /// Read size when hashing documents
    #[arg(long, env = "DOCSEAL_HASH_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub hash_chunk_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DOCSEAL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl CommonArgs {
    pub fn validate(&self) -> Result<()> {
        if self.hash_chunk_size == 0 || self.hash_chunk_size > MAX_CHUNK_SIZE {
            return Err(IntegrityError::Config(format!(
                "hash chunk size must be between 1 and {MAX_CHUNK_SIZE} bytes, got {}",
                self.hash_chunk_size
            )));
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            hash_chunk_size: self.hash_chunk_size,
        }
    }
}
