//! pathtrie CLI - Command line interface for pathtrie
//!
//! Keeps a path trie in a single store file. File contents are stored as
//! content blobs and the trie maps each path to the blob's reference; the trie
//! itself is found again through a named root.

use clap::{Parser, Subcommand};
use pathtrie::{Context, Error, Metadata, Node, ObjectStore, Reference};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pathtrie")]
#[command(about = "A prefix-compressed path trie over a content-addressed store")]
#[command(version)]
struct Cli {
    /// Path to the store file
    #[arg(short, long, default_value = "site.ptrie")]
    store: PathBuf,

    /// Name of the root the trie is kept under
    #[arg(short, long, default_value = "main")]
    root: String,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a store with an empty trie
    Init {
        /// Key (hex) that entries below the root are obfuscated with
        #[arg(short, long)]
        key: Option<String>,
    },

    // === Entry Commands ===
    /// Add a file, or an empty directory when no file is given
    Add {
        /// Path in the trie; directories end in '/'
        path: String,
        /// File whose contents to store
        file: Option<PathBuf>,
        /// Metadata as key=value, may be repeated
        #[arg(short, long = "meta", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
    },

    /// Show the entry stored at a path
    Get {
        /// The path
        path: String,
    },

    /// Print the contents of the file stored at a path
    Cat {
        /// The path
        path: String,
    },

    /// Remove a file, or a directory with everything below it
    Rm {
        /// The path
        path: String,
    },

    /// Move a file or directory
    Mv {
        /// Source path
        from: String,
        /// Destination path; a trailing '/' moves into a directory
        to: String,
        /// Create the destination directory if it does not exist
        #[arg(short, long)]
        create: bool,
    },

    /// Copy a file or directory
    Cp {
        /// Source path
        from: String,
        /// Destination path; a trailing '/' copies into a directory
        to: String,
        /// Create the destination directory if it does not exist
        #[arg(short, long)]
        create: bool,
    },

    // === Listing Commands ===
    /// List stored paths
    Ls {
        /// Only list paths starting with this prefix
        prefix: Option<String>,
    },

    /// Check whether any stored path starts with a prefix
    HasPrefix {
        /// The prefix
        prefix: String,
    },

    /// List the named roots in the store
    Roots,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PATHTRIE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::new();

    match cli.command {
        Commands::Init { ref key } => {
            let store = ObjectStore::open_or_create(&cli.store)?;
            if store.get_root(&cli.root).is_some() {
                anyhow::bail!("Root '{}' already exists in {}", cli.root, cli.store.display());
            }
            let mut root = match key {
                Some(key) => Node::with_obfuscation_key(&hex::decode(key)?),
                None => Node::new(),
            };
            let reference = commit(&store, &cli.root, &mut root, &ctx)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "root": cli.root,
                    "reference": reference.to_hex(),
                    "message": format!("Created trie in {}", cli.store.display())
                }),
            )?;
        }

        Commands::Add {
            ref path,
            ref file,
            ref meta,
        } => {
            let (store, mut root) = open_trie(&cli)?;
            let entry = match file {
                Some(file) => {
                    let content = std::fs::read(file)?;
                    store.put_content(&content)?.as_bytes().to_vec()
                }
                None => vec![0u8; pathtrie::model::REFERENCE_SIZE],
            };
            let metadata: Metadata = meta.iter().cloned().collect();
            root.add(&ctx, path.as_bytes(), &entry, Some(&metadata), &store)?;
            let reference = commit(&store, &cli.root, &mut root, &ctx)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "path": path,
                    "entry": hex::encode(&entry),
                    "root": reference.to_hex()
                }),
            )?;
        }

        Commands::Get { ref path } => {
            let (store, mut root) = open_trie(&cli)?;
            let found = match root.lookup_node(&ctx, path.as_bytes(), &store) {
                Ok(found) if found.node.is_value() || found.node.is_empty_directory() => found,
                Ok(_) => return not_found(&cli.format, path),
                Err(err) if err.is_not_found() => return not_found(&cli.format, path),
                Err(err) => return Err(err.into()),
            };
            output(
                &cli.format,
                &serde_json::json!({
                    "path": path,
                    "entry": hex::encode(found.node.entry()),
                    "directory": found.node.is_empty_directory(),
                    "metadata": found.node.metadata(),
                    "index": found.index
                }),
            )?;
        }

        Commands::Cat { ref path } => {
            let (store, mut root) = open_trie(&cli)?;
            let entry = match root.lookup(&ctx, path.as_bytes(), &store) {
                Ok(entry) => entry,
                Err(err) if err.is_not_found() => return not_found(&cli.format, path),
                Err(err) => return Err(err.into()),
            };
            let reference = Reference::from_slice(&entry)
                .ok_or_else(|| anyhow::anyhow!("Entry at '{}' is not a content reference", path))?;
            let content = store.get_content(&reference)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }

        Commands::Rm { ref path } => {
            let (store, mut root) = open_trie(&cli)?;
            match root.remove(&ctx, path.as_bytes(), &store) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => return not_found(&cli.format, path),
                Err(err) => return Err(err.into()),
            }
            let reference = commit(&store, &cli.root, &mut root, &ctx)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "path": path,
                    "root": reference.to_hex()
                }),
            )?;
        }

        Commands::Mv {
            ref from,
            ref to,
            create,
        }
        | Commands::Cp {
            ref from,
            ref to,
            create,
        } => {
            let keep_origin = matches!(cli.command, Commands::Cp { .. });
            let (store, mut root) = open_trie(&cli)?;
            let (from_bytes, to_bytes) = (from.as_bytes(), to.as_bytes());
            if keep_origin {
                root.copy_entry(&ctx, from_bytes, to_bytes, create, &store)?;
            } else {
                root.move_entry(&ctx, from_bytes, to_bytes, create, &store)?;
            }
            let reference = commit(&store, &cli.root, &mut root, &ctx)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "from": from,
                    "to": to,
                    "copied": keep_origin,
                    "root": reference.to_hex()
                }),
            )?;
        }

        Commands::Ls { ref prefix } => {
            let (store, mut root) = open_trie(&cli)?;
            let prefix = prefix.as_deref().unwrap_or("").as_bytes();
            let items: Vec<_> = root
                .entries(&ctx, &store)?
                .into_iter()
                .filter(|(path, _)| path.starts_with(prefix))
                .map(|(path, entry)| {
                    serde_json::json!({
                        "path": String::from_utf8_lossy(&path),
                        "entry": hex::encode(&entry)
                    })
                })
                .collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "count": items.len(),
                    "entries": items
                }),
            )?;
        }

        Commands::HasPrefix { ref prefix } => {
            let (store, mut root) = open_trie(&cli)?;
            let exists = root.has_prefix(&ctx, prefix.as_bytes(), &store)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "prefix": prefix,
                    "exists": exists
                }),
            )?;
        }

        Commands::Roots => {
            let store = ObjectStore::open(&cli.store)?;
            let items: Vec<_> = store
                .list_roots()
                .iter()
                .map(|(name, reference)| {
                    serde_json::json!({
                        "name": name,
                        "reference": reference.to_hex(),
                        "current": name == &cli.root
                    })
                })
                .collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "objects": store.object_count(),
                    "roots": items
                }),
            )?;
        }
    }

    Ok(())
}

/// Open the store and the trie kept under the selected root
fn open_trie(cli: &Cli) -> anyhow::Result<(ObjectStore, Node)> {
    let store = ObjectStore::open(&cli.store)?;
    let root = store
        .get_root(&cli.root)
        .map(Node::from_reference)
        .ok_or_else(|| Error::NotFound(format!("root '{}'", cli.root)))?;
    Ok((store, root))
}

/// Save the trie, point the root at it and flush the store
fn commit(store: &ObjectStore, name: &str, root: &mut Node, ctx: &Context) -> anyhow::Result<Reference> {
    let reference = root.save(ctx, store)?;
    store.set_root(name, reference);
    store.sync()?;
    tracing::debug!(root = name, reference = %reference.short(), "committed trie");
    Ok(reference)
}

fn parse_meta(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn not_found(format: &OutputFormat, path: &str) -> anyhow::Result<()> {
    output(
        format,
        &serde_json::json!({
            "status": "error",
            "message": format!("Path not found: {}", path)
        }),
    )?;
    std::process::exit(1);
}

fn output(format: &OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value)?);
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}
