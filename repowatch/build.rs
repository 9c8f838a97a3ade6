//! Embeds the source revision and build time reported by `repowatch --version`.
//!
//! Release tarballs carry no `.git`, so `REPOWATCH_GIT_HASH` may supply the
//! revision instead.

use std::env;
use std::process::Command;

use chrono::{SecondsFormat, Utc};

const HASH_OVERRIDE: &str = "REPOWATCH_GIT_HASH";

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn source_revision() -> String {
    if let Ok(hash) = env::var(HASH_OVERRIDE) {
        if !hash.trim().is_empty() {
            return hash.trim().to_string();
        }
    }

    let Some(hash) = git(&["rev-parse", "--short=12", "HEAD"]) else {
        return "unknown".to_string();
    };
    match git(&["status", "--porcelain", "--untracked-files=no"]) {
        Some(changes) if !changes.is_empty() => format!("{}-dirty", hash),
        _ => hash,
    }
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", source_revision());
    println!(
        "cargo:rustc-env=BUILD_TIME={}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    println!("cargo:rerun-if-env-changed={}", HASH_OVERRIDE);
    // The repository root is one level above this crate.
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");
}
