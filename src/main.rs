use clap::{ArgAction, Parser, Subcommand};
use sealfile::cli::{
    decrypt_path, encrypt_path, generate_key_file, show_details, show_info, DecryptOptions,
    EncryptOptions, KeygenOptions,
};
use sealfile::keystore::DEFAULT_KEY_FILE;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Version info from build.rs
const VERSION: &str = env!("CARGO_PKG_VERSION");
const PROFILE: &str = env!("SEALFILE_PROFILE");
const GIT_HASH: &str = env!("SEALFILE_GIT_HASH");

fn get_version() -> &'static str {
    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} {} build {}", PROFILE, VERSION, GIT_HASH))
}

#[derive(Parser)]
#[command(name = "sealfile")]
#[command(author, about = "Authenticated symmetric file encryption", long_about = None)]
struct Cli {
    /// Print version
    #[arg(short = 'V', long)]
    version: bool,

    /// Key file location
    #[arg(long, global = true, env = "SEALFILE_KEY_FILE", default_value = DEFAULT_KEY_FILE)]
    key_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key and save it to the key file
    #[command(alias = "k")]
    Keygen {
        /// Replace an existing key file
        #[arg(long)]
        force: bool,
    },

    /// Encrypt a file in place
    #[command(alias = "e")]
    Encrypt {
        /// File to encrypt
        file: PathBuf,

        /// Write the sealed token here instead of replacing FILE
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a sealed file in place
    #[command(alias = "d")]
    Decrypt {
        /// Sealed file to decrypt
        file: PathBuf,

        /// Write the plaintext here instead of replacing FILE
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reject tokens older than this many seconds
        #[arg(long, env = "SEALFILE_TTL")]
        ttl: Option<u64>,
    },

    /// Show the structure of a sealed file (no key needed)
    #[command(alias = "i")]
    Inspect {
        /// Sealed file to inspect
        file: PathBuf,
    },

    /// Report file name, content type and size as JSON
    Details {
        /// File to describe
        file: PathBuf,

        /// Declared content type
        #[arg(long)]
        content_type: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        println!("sealfile {}", get_version());
        return ExitCode::SUCCESS;
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            use clap::CommandFactory;
            if let Err(e) = Cli::command().print_help() {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
            println!();
            return ExitCode::SUCCESS;
        }
    };

    init_logging(cli.verbose);
    let key_file = cli.key_file;

    let result = match command {
        Commands::Keygen { force } => {
            let options = KeygenOptions {
                key_file: key_file.clone(),
                force,
            };
            generate_key_file(&options).map(|()| {
                println!("Key generated and saved as {}", key_file.display());
            })
        }

        Commands::Encrypt { file, output } => {
            let options = EncryptOptions { key_file, output };
            encrypt_path(&file, &options).map(|_| {
                let target = options.output.as_ref().unwrap_or(&file);
                println!("Encrypted {}", target.display());
            })
        }

        Commands::Decrypt { file, output, ttl } => {
            let options = DecryptOptions {
                key_file,
                output,
                ttl: ttl.map(Duration::from_secs),
            };
            decrypt_path(&file, &options).map(|_| {
                let target = options.output.as_ref().unwrap_or(&file);
                println!("Decrypted {}", target.display());
            })
        }

        Commands::Inspect { file } => show_info(&file).map(|info| print!("{}", info)),

        Commands::Details { file, content_type } => {
            show_details(&file, content_type.as_deref()).map(|json| println!("{}", json))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
