use std::{env, path::PathBuf};

const WATCHED_VARS: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn warn(message: impl AsRef<str>) {
    println!("cargo:warning={}", message.as_ref());
}

/// FFmpeg prefix inside a vcpkg tree, for the configured triplet.
fn vcpkg_prefix(root: &str) -> PathBuf {
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    PathBuf::from(root).join("installed").join(triplet)
}

fn windows_hints() {
    let Ok(root) = env::var("VCPKG_ROOT") else {
        warn("scenesplit links FFmpeg through ffmpeg-sys-next; set FFMPEG_DIR (or VCPKG_ROOT with an ffmpeg install) on Windows.");
        return;
    };

    let prefix = vcpkg_prefix(&root);
    if !prefix.exists() {
        warn(format!("no FFmpeg found under {}", prefix.display()));
        return;
    }

    warn(format!("using vcpkg FFmpeg candidate {}; export FFMPEG_DIR to pin it", prefix.display()));
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        warn("dynamic vcpkg FFmpeg builds also need VCPKGRS_DYNAMIC=1");
    }
}

fn main() {
    for var in WATCHED_VARS {
        println!("cargo:rerun-if-env-changed={var}");
    }

    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        windows_hints();
    }
}
