use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Once;

use gomini::{compact, parse_file, verify_round_trip, walk, CompactOptions};
use walkdir::WalkDir;

const USAGE: &str = "usage: gomini [--omit-import-path] [--check] [--dump] <path>...";

// ----------------- arg parsing -----------------

#[derive(Debug, Default)]
struct Args {
    options: CompactOptions,
    check: bool,
    dump: bool,
    paths: Vec<PathBuf>,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut out = Args::default();
    for a in args {
        match a.as_str() {
            "--omit-import-path" => out.options.omit_import_path = true,
            "--check" => out.check = true,
            "--dump" => out.dump = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => return Err(format!("unknown flag {flag}\n{USAGE}")),
            _ => out.paths.push(PathBuf::from(a)),
        }
    }
    if out.paths.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(out)
}

fn init_tracing() {
    static INIT: Once = Once::new();
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .try_init();
    });
}

// ----------------- per-file work -----------------

/// Every `*.go` file under `root`, `testdata` directories excluded.
fn go_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == "testdata"))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("go"))
}

fn run_file(path: &Path, args: &Args, stdout: &mut impl Write) -> Result<(usize, usize), String> {
    let src = std::fs::read_to_string(path).map_err(|e| e.to_string())?;

    if args.dump {
        let tree = parse_file(&src).map_err(|e| format!("parse: {e}"))?;
        writeln!(stdout, "{}", walk::dump(&tree)).map_err(|e| e.to_string())?;
        return Ok((src.len(), src.len()));
    }
    if args.check {
        return verify_round_trip(&src, args.options)
            .map(|out| (src.len(), out.len()))
            .map_err(|e| e.to_string());
    }

    let n = compact(src.as_bytes(), args.options, &mut *stdout).map_err(|e| e.to_string())?;
    writeln!(stdout).map_err(|e| e.to_string())?;
    Ok((src.len(), n))
}

fn main() -> ExitCode {
    init_tracing();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    let (mut files, mut failed) = (0usize, 0usize);
    let (mut bytes_in, mut bytes_out) = (0usize, 0usize);
    let mut walked_dir = false;

    for root in &args.paths {
        let files_here: Vec<PathBuf> = if root.is_dir() {
            walked_dir = true;
            go_files(root).collect()
        } else {
            vec![root.clone()]
        };

        for path in files_here {
            files += 1;
            match run_file(&path, &args, &mut stdout) {
                Ok((i, o)) => {
                    bytes_in += i;
                    bytes_out += o;
                }
                Err(msg) => {
                    failed += 1;
                    eprintln!("{}: {msg}", path.display());
                }
            }
        }
    }

    if walked_dir || args.check {
        let ratio = if bytes_in == 0 {
            0.0
        } else {
            100.0 * bytes_out as f64 / bytes_in as f64
        };
        eprintln!(
            "{files} files, {failed} failed, {bytes_in} -> {bytes_out} bytes ({ratio:.1}%)"
        );
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
