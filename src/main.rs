use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;
use xtempl::{CompileError, CompileSummary, Options};

#[derive(Parser)]
#[command(name = "xtempl")]
#[command(about = "xtempl - compile x- component tags into template blocks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile component templates
    Compile {
        /// Path to a template file or directory
        #[arg(required_unless_present = "stdin")]
        path: Option<PathBuf>,

        /// Read from stdin and write to stdout
        #[arg(long)]
        stdin: bool,

        /// Directory to write compiled templates into (required for directories)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Comma-separated extensions to pick up in directory mode
        #[arg(long, default_value = "html,tmpl")]
        ext: String,

        /// Tag prefix that marks component elements
        #[arg(long, default_value = "x-")]
        prefix: String,

        /// Report each file as one JSON line instead of progress output
        #[arg(long)]
        json: bool,
    },
    /// Check templates without writing output
    Check {
        /// Path to a template file or directory
        #[arg(required_unless_present = "stdin")]
        path: Option<PathBuf>,

        /// Read from stdin
        #[arg(long)]
        stdin: bool,

        /// Comma-separated extensions to pick up in directory mode
        #[arg(long, default_value = "html,tmpl")]
        ext: String,

        /// Tag prefix that marks component elements
        #[arg(long, default_value = "x-")]
        prefix: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { path, stdin, out, ext, prefix, json } => {
            let options = Options { component_prefix: prefix };
            if stdin {
                compile_stdin(&options, json);
            } else if let Some(path) = path {
                compile_path(&path, out.as_deref(), &extensions(&ext), &options, json);
            } else {
                eprintln!("Error: provide a file/directory or use --stdin");
                std::process::exit(1);
            }
        }
        Commands::Check { path, stdin, ext, prefix } => {
            let options = Options { component_prefix: prefix };
            if stdin {
                check_stdin(&options);
            } else if let Some(path) = path {
                check_path(&path, &extensions(&ext), &options);
            } else {
                eprintln!("Error: provide a file/directory or use --stdin");
                std::process::exit(1);
            }
        }
    }
}

/// One line of `--json` output. `output` is carried inline only when the
/// compiled text is not written anywhere else.
#[derive(Serialize)]
struct FileReport<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<CompileSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn compile_stdin(options: &Options, json_output: bool) {
    let mut source = String::new();
    io::stdin().read_to_string(&mut source).expect("Failed to read stdin");

    let mut compiled = Vec::new();
    match xtempl::compile_with(&source, options, &mut compiled) {
        Ok(summary) => {
            let output = String::from_utf8(compiled).expect("compiled output is valid UTF-8");
            if json_output {
                let result = FileReport {
                    path: "<stdin>",
                    output: Some(&output),
                    summary: Some(summary),
                    error: None,
                };
                println!("{}", serde_json::to_string(&result).unwrap());
            } else {
                print!("{}", output);
            }
        }
        Err(err) => {
            if json_output {
                let result = FileReport {
                    path: "<stdin>",
                    output: None,
                    summary: None,
                    error: Some(err.to_string()),
                };
                println!("{}", serde_json::to_string(&result).unwrap());
            } else {
                report(&err, &source, "<stdin>");
            }
            std::process::exit(1);
        }
    }
}

fn compile_path(path: &Path, out_dir: Option<&Path>, exts: &[String], options: &Options, json_output: bool) {
    if path.is_file() {
        if !matches_extension(path, exts) {
            eprintln!("Error: {} does not match --ext {}", path.display(), exts.join(","));
            std::process::exit(1);
        }
        let start = Instant::now();
        let out_path = out_dir.map(|dir| dir.join(path.file_name().expect("file path has a file name")));
        if !compile_file(path, out_path.as_deref(), options, json_output) {
            std::process::exit(1);
        }
        if out_path.is_some() && !json_output {
            print_summary("Compiled", 1, start.elapsed());
        }
    } else if path.is_dir() {
        compile_directory(path, out_dir, exts, options, json_output);
    } else {
        eprintln!("Error: {} does not exist", path.display());
        std::process::exit(1);
    }
}

fn compile_directory(dir: &Path, out_dir: Option<&Path>, exts: &[String], options: &Options, json_output: bool) {
    let Some(out_dir) = out_dir else {
        eprintln!("Error: --out is required when compiling a directory");
        std::process::exit(1);
    };

    let start = Instant::now();
    let mut file_count = 0;
    let mut failed = 0;

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| matches_extension(e.path(), exts))
    {
        let path = entry.path();
        let relative = path.strip_prefix(dir).expect("walked path is under the walk root");
        if compile_file(path, Some(&out_dir.join(relative)), options, json_output) {
            file_count += 1;
        } else {
            failed += 1;
        }
    }

    if file_count == 0 && failed == 0 {
        eprintln!("No template files found in {}", dir.display());
        std::process::exit(1);
    }
    if failed > 0 {
        let word = if failed == 1 { "template" } else { "templates" };
        eprintln!("{} {} failed to compile", failed, word);
        std::process::exit(1);
    }

    if !json_output {
        print_summary("Compiled", file_count, start.elapsed());
    }
}

fn compile_file(path: &Path, out_path: Option<&Path>, options: &Options, json_output: bool) -> bool {
    let source = fs::read_to_string(path).expect("Failed to read file");
    let display = path.display().to_string();

    let mut compiled = Vec::new();
    match xtempl::compile_with(&source, options, &mut compiled) {
        Ok(summary) => {
            let output = String::from_utf8(compiled).expect("compiled output is valid UTF-8");
            if let Some(out_path) = out_path {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent).expect("Failed to create output directory");
                }
                fs::write(out_path, &output).expect("Failed to write file");
            }
            if json_output {
                let result = FileReport {
                    path: &display,
                    output: if out_path.is_none() { Some(&output) } else { None },
                    summary: Some(summary),
                    error: None,
                };
                println!("{}", serde_json::to_string(&result).unwrap());
            } else if let Some(out_path) = out_path {
                print_generated(&out_path.display().to_string());
            } else {
                io::stdout().write_all(output.as_bytes()).expect("Failed to write stdout");
            }
            true
        }
        Err(err) => {
            if json_output {
                let result = FileReport {
                    path: &display,
                    output: None,
                    summary: None,
                    error: Some(err.to_string()),
                };
                println!("{}", serde_json::to_string(&result).unwrap());
            } else {
                report(&err, &source, &display);
            }
            false
        }
    }
}

fn check_stdin(options: &Options) {
    let mut source = String::new();
    io::stdin().read_to_string(&mut source).expect("Failed to read stdin");

    if let Err(err) = xtempl::compile_with(&source, options, &mut io::sink()) {
        report(&err, &source, "<stdin>");
        std::process::exit(1);
    }
}

fn check_path(path: &Path, exts: &[String], options: &Options) {
    let start = Instant::now();
    let mut checked = 0;
    let mut failed = 0;

    if path.is_file() {
        if !matches_extension(path, exts) {
            eprintln!("Error: {} does not match --ext {}", path.display(), exts.join(","));
            std::process::exit(1);
        }
        checked = 1;
        if !check_file(path, options) {
            failed = 1;
        }
    } else if path.is_dir() {
        for entry in WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| matches_extension(e.path(), exts))
        {
            checked += 1;
            if !check_file(entry.path(), options) {
                failed += 1;
            }
        }
        if checked == 0 {
            eprintln!("No template files found in {}", path.display());
            std::process::exit(1);
        }
    } else {
        eprintln!("Error: {} does not exist", path.display());
        std::process::exit(1);
    }

    if failed > 0 {
        let word = if failed == 1 { "template" } else { "templates" };
        eprintln!("{} {} failed to check", failed, word);
        std::process::exit(1);
    }
    print_summary("Checked", checked, start.elapsed());
}

fn check_file(path: &Path, options: &Options) -> bool {
    let source = fs::read_to_string(path).expect("Failed to read file");

    match xtempl::compile_with(&source, options, &mut io::sink()) {
        Ok(_) => {
            print_generated(&path.display().to_string());
            true
        }
        Err(err) => {
            report(&err, &source, &path.display().to_string());
            false
        }
    }
}

fn report(err: &CompileError, source: &str, filename: &str) {
    if io::stderr().is_terminal() {
        eprint!("{}", err.render_color(source, filename));
    } else {
        eprint!("{}", err.render(source, filename));
    }
}

fn extensions(ext: &str) -> Vec<String> {
    ext.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

fn matches_extension(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| exts.iter().any(|want| want.as_str() == e))
}

fn print_generated(path: &str) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("  \x1b[32m✓\x1b[0m {}", path);
    } else {
        eprintln!("  ✓ {}", path);
    }
}

fn print_summary(verb: &str, count: usize, elapsed: std::time::Duration) {
    let is_tty = io::stderr().is_terminal();
    let time_str = format_duration(elapsed);
    let files_word = if count == 1 { "file" } else { "files" };

    if is_tty {
        eprintln!("\n\x1b[1m✨ {} {} {} in {}\x1b[0m", verb, count, files_word, time_str);
    } else {
        eprintln!("\n✨ {} {} {} in {}", verb, count, files_word, time_str);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
