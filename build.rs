// Stamp the short git hash into `--version` output when building from a checkout.
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let version = match git_short_hash() {
        Some(hash) => format!("{pkg_version} ({hash})"),
        None => pkg_version,
    };
    println!("cargo:rustc-env=ASCII_MATRIX_VERSION={version}");
}

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_owned())
}
