use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use docseal::config::CommonArgs;
use docseal::crypto::hash;
use docseal::{IntegrityPipeline, MemoryStore, Result, SignOutcome, VerifyOutcome};

#[derive(Parser)]
#[command(name = "docseal")]
#[command(about = "Document integrity: content hashing, key custody and RSA-PSS attestation")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and store a signing key pair for an identity
    Enroll { identity: String },
    /// Print the SHA-256 digest of a file
    Hash { file: PathBuf },
    /// Register an uploaded document
    Upload {
        #[arg(long)]
        owner: String,
        file: PathBuf,
    },
    /// Hash and sign the stamped version of an uploaded document
    Sign { document_id: Uuid, signed_file: PathBuf },
    /// Check a file against the signed records
    Verify { file: PathBuf },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("docseal={},warn", cli.common.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let common = cli.common;
    common.validate()?;

    // Hashing needs neither the store nor the server secret.
    if let Commands::Hash { file } = &cli.command {
        let digest = hash::hash_reader_with_chunk_size(&mut File::open(file)?, common.hash_chunk_size)?;
        println!("{}  {}", digest, file.display());
        return Ok(ExitCode::SUCCESS);
    }

    let store = MemoryStore::load_snapshot(&common.store)?;
    let pipeline = IntegrityPipeline::new(store, common.vault.vault()?, common.pipeline_config());

    let code = match cli.command {
        Commands::Hash { .. } => ExitCode::SUCCESS,
        Commands::Enroll { identity } => {
            let record = pipeline.enroll(&identity)?;
            pipeline.store().save_snapshot(&common.store)?;
            println!("{}", record.public_key);
            ExitCode::SUCCESS
        }
        Commands::Upload { owner, file } => {
            let record = pipeline.upload(&owner, &file.to_string_lossy())?;
            pipeline.store().save_snapshot(&common.store)?;
            println!("{}", record.id);
            ExitCode::SUCCESS
        }
        Commands::Sign {
            document_id,
            signed_file,
        } => {
            let mut reader = File::open(&signed_file)?;
            let outcome =
                pipeline.sign_document(document_id, &signed_file.to_string_lossy(), &mut reader)?;
            pipeline.store().save_snapshot(&common.store)?;

            let digest = outcome
                .record()
                .digest()
                .map(|d| d.to_hex())
                .unwrap_or_default();
            match outcome {
                SignOutcome::Attested(_) => println!("signed {digest}"),
                SignOutcome::Unattested(_) => println!("recorded {digest} (owner has no key pair, unattested)"),
            }
            ExitCode::SUCCESS
        }
        Commands::Verify { file } => {
            let outcome = pipeline.verify_document(&mut File::open(&file)?)?;
            report(&outcome);
            if outcome.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    };

    info!(store = %common.store.display(), "Done");
    Ok(code)
}

fn report(outcome: &VerifyOutcome) {
    match outcome {
        VerifyOutcome::NoRecord { digest } => println!("no record: {digest}"),
        VerifyOutcome::Unattested { record } => {
            println!("unattested: document {} has no signature", record.id)
        }
        VerifyOutcome::SignerKeyMissing { record } => {
            println!("unverifiable: no public key on file for {}", record.owner)
        }
        VerifyOutcome::Valid { record } => {
            println!("valid: document {} signed by {}", record.id, record.owner)
        }
        VerifyOutcome::SignatureMismatch { record } => {
            println!("invalid: signature on document {} does not verify", record.id)
        }
        VerifyOutcome::Malformed { record, reason } => {
            println!("invalid: document {} has malformed signature data ({reason})", record.id)
        }
    }
}
