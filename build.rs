// Stamps `txgrid --version` with the short commit when built inside a git
// checkout. Outside one, the version is the bare package version.
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");

    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok());

    let version = match commit.as_deref().map(str::trim) {
        Some(hash) if !hash.is_empty() => format!("{} ({hash})", env!("CARGO_PKG_VERSION")),
        _ => env!("CARGO_PKG_VERSION").to_owned(),
    };
    println!("cargo:rustc-env=TXGRID_VERSION={version}");
}
