//! Replays fixture files through the converter.
//!
//! `ok_*.json` must decode and survive an encode/decode round trip;
//! `err_*.json` must be rejected.
use std::path::{Path, PathBuf};

use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;
use repo_shape::Convert;

static FIXTURE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<expect>ok|err)_(?P<name>[A-Za-z0-9_]+)\.json$").expect("valid fixture regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect { Ok, Err }

fn default_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures/repos")
}

fn round_trip(src: &str) -> Result<(), Box<dyn std::error::Error>> {
    let is_listing = serde_json::from_str::<serde_json::Value>(src)?.is_array();
    if is_listing {
        let repos = Convert::to_repos(src)?;
        let again = Convert::to_repos(&Convert::repos_to_json(&repos)?)?;
        if again != repos {
            return Err("listing changed across round trip".into());
        }
    } else {
        let repo = Convert::to_repo(src)?;
        let again = Convert::to_repo(&Convert::repo_to_json(&repo)?)?;
        if again != repo {
            return Err("record changed across round trip".into());
        }
    }
    Ok(())
}

fn main() {
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(default_dir);
    let entries = match std::fs::read_dir(&dir) {
        Ok(xs) => xs,
        Err(error) => {
            eprintln!("failed to read fixture directory {}: {error}", dir.display());
            std::process::exit(2);
        }
    };

    let mut paths = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    paths.sort();

    let mut failures = 0usize;
    let mut total = 0usize;
    for path in paths {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(caps) = FIXTURE_NAME.captures(file_name) else { continue };
        let expect = if &caps["expect"] == "ok" { Expect::Ok } else { Expect::Err };
        total += 1;

        let src = match std::fs::read_to_string(&path) {
            Ok(x) => x,
            Err(error) => {
                failures += 1;
                eprintln!("{} {}: {error}", "❌".red(), &caps["name"]);
                continue;
            }
        };
        match (expect, round_trip(&src)) {
            (Expect::Ok, Ok(())) => eprintln!("{} {}", "✅".green(), &caps["name"]),
            (Expect::Err, Err(error)) => eprintln!("{} {} rejected: {error}", "✅".green(), &caps["name"]),
            (Expect::Ok, Err(error)) => {
                failures += 1;
                eprintln!("{} {}: {error}", "❌".red(), &caps["name"]);
            }
            (Expect::Err, Ok(())) => {
                failures += 1;
                eprintln!("{} {}: accepted but should fail", "❌".red(), &caps["name"]);
            }
        }
    }

    eprintln!("{} fixtures, {} failed", total, failures);
    if failures > 0 {
        std::process::exit(1);
    }
}
