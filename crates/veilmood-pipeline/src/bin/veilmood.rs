use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use veilmood_core::{CkksContext, REQUIRED_DEPTH};
use veilmood_pipeline::{
    build_pipeline, logging, CancellationToken, CommandProofVerifier, PipelineConfig, ProofVerifier,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Emotion analysis of posts over encrypted embeddings")]
struct Cli {
    /// JSON config file. Defaults apply when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate encryption keys and save them for reuse across restarts.
    Keygen {
        /// Key directory. Falls back to `keys_path` from the config.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Overwrite an existing key store.
        #[arg(long)]
        force: bool,
    },
    /// Analyze posts (one per line) and print the result as JSON.
    Analyze {
        #[arg(long)]
        posts: PathBuf,
        /// Question-derived keywords to echo into the result (comma-separated).
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
        /// Write the JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Hand the model artifact to the configured zero-knowledge verifier.
    VerifyProof {
        /// Artifact to verify. Defaults to the configured encoder.
        #[arg(long)]
        artifact: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_file(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn keygen(config: &PipelineConfig, out: Option<PathBuf>, force: bool) -> Result<()> {
    let Some(path) = out.or_else(|| config.keys_path.clone()) else {
        bail!("no output path: pass --out or set keys_path in the config");
    };
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path.display());
    }
    let ctx = CkksContext::new(config.encryption.clone(), REQUIRED_DEPTH)
        .context("generating encryption keys")?;
    ctx.save_keys(&path).context("saving encryption keys")?;
    println!("wrote keys to {}", path.display());
    Ok(())
}

fn analyze(config: &PipelineConfig, posts: &Path, keywords: &[String], out: Option<&Path>) -> Result<()> {
    let text = fs::read_to_string(posts).with_context(|| format!("reading posts {}", posts.display()))?;
    let posts: Vec<&str> = text.lines().collect();

    let pipeline = build_pipeline(config).context("building pipeline")?;
    let result = pipeline
        .analyze_with(&posts, keywords, &CancellationToken::new())
        .context("analyzing posts")?;

    let json = serde_json::to_string_pretty(&result)?;
    match out {
        Some(path) => fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn verify_proof(config: &PipelineConfig, artifact: Option<PathBuf>) -> Result<bool> {
    let Some(proof) = &config.proof else {
        bail!("no proof verifier configured (set \"proof\" in the config)");
    };
    let artifact = artifact.unwrap_or_else(|| config.encoder.encoder_path.clone());
    let verifier = CommandProofVerifier::new(proof.program.clone(), proof.args.clone());
    let verdict = verifier.verify(&artifact).context("running proof verifier")?;
    println!("{}", serde_json::to_string(&verdict)?);
    Ok(verdict.is_verified())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { "info" });
    let config = load_config(cli.config.as_deref())?;

    match cli.cmd {
        Cmd::Keygen { out, force } => keygen(&config, out, force),
        Cmd::Analyze { posts, keywords, out } => analyze(&config, &posts, &keywords, out.as_deref()),
        Cmd::VerifyProof { artifact } => {
            if !verify_proof(&config, artifact)? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
