use std::{env, path::PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

/// Point Windows builds at a vcpkg FFmpeg install when `FFMPEG_DIR` is unset.
/// Other targets rely on pkg-config discovery in `ffmpeg-sys-next`.
fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=seekframe: set FFMPEG_DIR (or VCPKG_ROOT with an FFmpeg install) to build on Windows."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| String::from("x64-windows"));
    let install = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if !install.is_dir() {
        println!(
            "cargo:warning=seekframe: no vcpkg FFmpeg found under {}.",
            install.display()
        );
        return;
    }

    println!(
        "cargo:warning=seekframe: using vcpkg FFmpeg at {0}; export FFMPEG_DIR={0} to silence this.",
        install.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=seekframe: set VCPKGRS_DYNAMIC=1 for dynamic vcpkg FFmpeg builds.");
    }
}
