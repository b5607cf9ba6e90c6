use gomini::{verify_round_trip, CompactOptions};
use walkdir::WalkDir;

#[test]
fn round_trips_go_corpus_if_configured() {
    let Some(root) = std::env::var_os("GOMINI_CORPUS") else {
        eprintln!("GOMINI_CORPUS not set; skipping corpus test");
        return;
    };

    let root = root.to_string_lossy().to_string();
    let mut total = 0usize;

    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("go") {
            continue;
        }
        // testdata holds deliberately broken sources.
        if path.to_string_lossy().contains("testdata") {
            continue;
        }

        let src = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(_) => continue,
        };
        total += 1;

        if let Err(e) = verify_round_trip(&src, CompactOptions::default()) {
            panic!("{}: {e} (after {total} files)", path.display());
        }
    }

    eprintln!("Round-tripped {total} Go files successfully.");
}
