//! relay-credential - provisions one credential record for speech-relay.
//!
//! Prints `{"<identity>": {"salt": ..., "password_hash": ...}}`. The output
//! can be saved directly as the relay's credential table.

use std::env;
use std::process::ExitCode;

use speech_relay::auth::provision_entry;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = "relay-credential";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    email: Option<String>,
    password: Option<String>,
    help: bool,
    version: bool,
}

/// Parse the command line. Values are consumed before flags are matched,
/// so a secret such as `-h` is never mistaken for a flag.
fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "-V" | "--version" => parsed.version = true,
            "-e" | "--email" => {
                parsed.email = Some(iter.next().ok_or("--email requires a value")?.clone());
            }
            "-p" | "--password" => {
                parsed.password = Some(iter.next().ok_or("--password requires a value")?.clone());
            }
            other => {
                if let Some(value) = other.strip_prefix("--email=") {
                    parsed.email = Some(value.to_string());
                } else if let Some(value) = other.strip_prefix("--password=") {
                    parsed.password = Some(value.to_string());
                } else {
                    return Err(format!("unexpected argument '{}'", other));
                }
            }
        }
    }

    Ok(parsed)
}

fn print_help() {
    println!(
        r#"{} {}
Generate a salted credential record for speech-relay.

USAGE:
    {} --email <IDENTITY> --password <SECRET>

OPTIONS:
    -e, --email <IDENTITY>     Identity the record is stored under
    -p, --password <SECRET>    Secret to hash
    -h, --help                 Print help information
    -V, --version              Print version information
"#,
        NAME, VERSION, NAME
    );
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if parsed.help {
        print_help();
        return ExitCode::SUCCESS;
    }

    if parsed.version {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let (Some(email), Some(password)) = (parsed.email, parsed.password) else {
        eprintln!("Error: both --email and --password are required");
        print_help();
        return ExitCode::FAILURE;
    };

    let record = match provision_entry(&email, &password) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&record) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
