/// Command-line front end for D64 disk images
///
/// `cbmdisk dir disk.d64`, `cbmdisk load disk.d64 NAME`,
/// `cbmdisk save disk.d64 path/to/file`, plus a few maintenance commands
/// and an interactive shell. Failures are printed, never propagated: the
/// process exits 0 so callers can parse stdout.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cbmdisk::commands::{self, report, INVALID_COMMAND, USAGE};
use cbmdisk::FileType;

/// Commodore D64 disk image tool
#[derive(Parser, Debug)]
#[command(name = "cbmdisk")]
#[command(about = "List, load and save files on D64 disk images")]
struct Cli {
    /// Log library activity to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the directory
    Dir {
        /// Disk image
        disk: PathBuf,
        /// Also write the directory as a BASIC program
        #[arg(long, value_name = "PATH")]
        prg: Option<PathBuf>,
        /// Ignored
        #[arg(trailing_var_arg = true, hide = true)]
        _rest: Vec<String>,
    },
    /// Extract a file to <filename>.prg
    Load {
        /// Disk image
        disk: PathBuf,
        /// Name on disk (`*` and `?` wildcards allowed)
        #[arg(allow_hyphen_values = true)]
        filename: String,
        /// Write to this path instead
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Store a host file on the image
    Save {
        /// Disk image
        disk: PathBuf,
        /// File to store; its basename becomes the name on disk
        #[arg(allow_hyphen_values = true)]
        filepath: PathBuf,
        /// File type
        #[arg(short = 't', long = "type", default_value = "PRG", value_parser = parse_file_type)]
        file_type: FileType,
        /// Replace a file of the same name
        #[arg(short, long)]
        replace: bool,
    },
    /// Create a blank formatted image
    Format {
        /// Disk image to create
        disk: PathBuf,
        /// Disk name
        name: String,
        /// Two-character disk ID
        #[arg(long, default_value = "01")]
        id: String,
        /// Number of tracks (35 or 40)
        #[arg(long, default_value_t = 35)]
        tracks: u8,
    },
    /// Scratch a file
    Delete {
        /// Disk image
        disk: PathBuf,
        /// Name on disk
        filename: String,
    },
    /// Show image geometry and free space
    Info {
        /// Disk image
        disk: PathBuf,
    },
    /// Draw the block allocation map
    Map {
        /// Disk image
        disk: PathBuf,
    },
    /// Interactive console
    Shell {
        /// Disk image to open
        disk: Option<PathBuf>,
    },
}

fn parse_file_type(s: &str) -> Result<FileType, String> {
    s.parse::<FileType>().map_err(|e| e.to_string())
}

/// Lowercase the command word so `DIR` and `dir` both work
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();
    if let Some(command) = args
        .iter_mut()
        .skip(1)
        .find(|a| !a.to_string_lossy().starts_with('-'))
    {
        if let Some(s) = command.to_str() {
            *command = OsString::from(s.to_lowercase());
        }
    }
    args
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(command: Command, out: &mut dyn Write, err: &mut dyn Write) {
    match command {
        Command::Dir { disk, prg, .. } => report(
            "Error listing directory",
            commands::list_dir(&disk, prg.as_deref(), out),
            out,
            err,
        ),
        Command::Load {
            disk,
            filename,
            output,
        } => report(
            "Error loading file",
            commands::load_file(&disk, &filename, output.as_deref(), out),
            out,
            err,
        ),
        Command::Save {
            disk,
            filepath,
            file_type,
            replace,
        } => report(
            "Error saving file",
            commands::save_file(&disk, &filepath, file_type, replace, out),
            out,
            err,
        ),
        Command::Format {
            disk,
            name,
            id,
            tracks,
        } => report(
            "Error formatting disk",
            commands::format_disk(&disk, &name, &id, tracks, out),
            out,
            err,
        ),
        Command::Delete { disk, filename } => report(
            "Error deleting file",
            commands::delete_file(&disk, &filename, out),
            out,
            err,
        ),
        Command::Info { disk } => {
            report("Error reading disk", commands::show_info(&disk, out), out, err)
        }
        Command::Map { disk } => {
            report("Error reading disk", commands::show_map(&disk, out), out, err)
        }
        Command::Shell { disk } => shell(disk),
    }
}

fn main() {
    let args = normalize_args(std::env::args_os());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut err = std::io::stderr();

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = write!(out, "{}", e);
                }
                _ if args.len() < 3 => {
                    let _ = writeln!(out, "{}", USAGE);
                }
                _ => {
                    let _ = writeln!(out, "{}", INVALID_COMMAND);
                    let _ = write!(err, "{}", e);
                }
            }
            return;
        }
    };

    init_logging(cli.verbose);
    debug!(command = ?cli.command, "dispatching");
    run(cli.command, &mut out, &mut err);
}

/// Command completer for the shell
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "delete", "dir", "exit", "format", "help", "info", "load", "map", "open",
                "quit", "save",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the first word (command name)
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Get the path to the history file
fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".cbmdisk_history");
        p
    })
}

/// Parse command line input, respecting quoted strings
fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  open <path>                     - Select a disk image (quote paths with spaces)");
    println!("  format <path> <name> [id] [40]  - Create a blank image and select it");
    println!("  dir [prg_path]                  - List the directory, optionally as BASIC");
    println!("  load <name> [output_path]       - Extract a file (defaults to <name>.prg)");
    println!("  save <path> [type] [replace]    - Store a host file (type defaults to PRG)");
    println!("  delete <name>                   - Scratch a file");
    println!("  info                            - Show disk information");
    println!("  map                             - Visual block map");
    println!("  help                            - Show this help");
    println!("  quit, exit                      - Exit");
}

/// Show an image's info, returning its path only if it could be read
fn open_disk(path: PathBuf, out: &mut dyn Write, err: &mut dyn Write) -> Option<PathBuf> {
    match commands::show_info(&path, out) {
        Ok(()) => {
            let _ = writeln!(out, "Opened: {}", path.display());
            Some(path)
        }
        Err(e) => {
            report("Error opening disk", Err(e), out, err);
            None
        }
    }
}

fn shell(initial: Option<PathBuf>) {
    println!("=== cbmdisk ===");
    println!("Interactive console for D64 disk images.");
    println!("Type 'help' for available commands\n");

    let mut rl = match Editor::new() {
        Ok(rl) => rl,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut disk: Option<PathBuf> = initial;
    if let Some(path) = &disk {
        println!("Opened: {}", path.display());
    }

    loop {
        let input = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        let Some(first) = parts.first() else {
            continue;
        };
        let command = first.to_lowercase();
        let arg = |i: usize| parts.get(i).map(String::as_str);

        let mut out = std::io::stdout();
        let mut err = std::io::stderr();

        let selected: Option<&Path> = disk.as_deref();
        let requires_disk = matches!(
            command.as_str(),
            "dir" | "load" | "save" | "delete" | "info" | "map"
        );
        if requires_disk && selected.is_none() {
            println!("No image selected. Use 'open <path>' or 'format' first.");
            continue;
        }
        let current = selected.map(Path::to_path_buf).unwrap_or_default();

        let next = match command.as_str() {
            "help" => {
                print_help();
                None
            }
            "quit" | "exit" => break,
            "open" => match arg(1) {
                Some(path) => {
                    if let Some(opened) = open_disk(PathBuf::from(path), &mut out, &mut err) {
                        disk = Some(opened);
                    }
                    None
                }
                None => {
                    println!("Usage: open <path>");
                    None
                }
            },
            "format" => match (arg(1), arg(2)) {
                (Some(path), Some(name)) => {
                    let path = PathBuf::from(path);
                    let id = arg(3).unwrap_or("01");
                    let tracks = arg(4).and_then(|t| t.parse().ok()).unwrap_or(35);
                    match commands::format_disk(&path, name, id, tracks, &mut out) {
                        Ok(()) => disk = Some(path),
                        Err(e) => report("Error formatting disk", Err(e), &mut out, &mut err),
                    }
                    None
                }
                _ => {
                    println!("Usage: format <path> <name> [id] [tracks]");
                    None
                }
            },
            "dir" | "ls" | "cat" => Some(Command::Dir {
                disk: current,
                prg: arg(1).map(PathBuf::from),
                _rest: Vec::new(),
            }),
            "load" => match arg(1) {
                Some(name) => Some(Command::Load {
                    disk: current,
                    filename: name.to_string(),
                    output: arg(2).map(PathBuf::from),
                }),
                None => {
                    println!("Usage: load <name> [output_path]");
                    None
                }
            },
            "save" => match arg(1) {
                Some(path) => {
                    let mut file_type = FileType::Prg;
                    let mut replace = false;
                    for option in parts.iter().skip(2) {
                        if option.eq_ignore_ascii_case("replace") {
                            replace = true;
                        } else if let Ok(t) = option.parse::<FileType>() {
                            file_type = t;
                        }
                    }
                    Some(Command::Save {
                        disk: current,
                        filepath: PathBuf::from(path),
                        file_type,
                        replace,
                    })
                }
                None => {
                    println!("Usage: save <path> [type] [replace]");
                    None
                }
            },
            "delete" | "scratch" => match arg(1) {
                Some(name) => Some(Command::Delete {
                    disk: current,
                    filename: name.to_string(),
                }),
                None => {
                    println!("Usage: delete <name>");
                    None
                }
            },
            "info" => Some(Command::Info { disk: current }),
            "map" => Some(Command::Map { disk: current }),
            _ => {
                println!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    command
                );
                None
            }
        };

        if let Some(next) = next {
            run(next, &mut out, &mut err);
        }
    }

    if let Some(history_path) = history_path() {
        let _ = rl.save_history(&history_path);
    }
    println!("Goodbye!");
}
