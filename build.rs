//! Build script: embeds the git short hash for the version string and
//! generates the `Animate` client from `proto/audio2face2d.proto`.
//!
//! Code generation needs `protoc` on `PATH` (or `PROTOC` set).

use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(hash) = git_short_hash() {
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");
    println!("cargo:rerun-if-changed=proto/audio2face2d.proto");

    // Client only; byte fields as `Bytes` so chunks move without copying.
    tonic_build::configure()
        .build_server(false)
        .bytes(["."])
        .compile_protos(&["proto/audio2face2d.proto"], &["proto"])?;
    Ok(())
}

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_hash(&String::from_utf8_lossy(&output.stdout))
}

/// Accept only a 7-char hex hash; anything else means no usable repo.
fn parse_hash(text: &str) -> Option<String> {
    let hash = text.trim();
    if hash.len() == 7 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(hash.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hash_accepts_short_hash() {
        assert_eq!(parse_hash("abc1234\n"), Some("abc1234".to_string()));
    }

    #[test]
    fn parse_hash_rejects_garbage() {
        assert_eq!(parse_hash("fatal: not a git repository"), None);
        assert_eq!(parse_hash(""), None);
    }
}
