#![forbid(rust_2018_idioms, future_incompatible, elided_lifetimes_in_paths)]
#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    variant_size_differences
)]

use anyhow::{bail, Context, Result};
use log::info;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use wasibox::{
    abort::AbortSignal,
    handle::Preopen,
    string_representation::Utf8,
    volume::MemVolume,
    wasi_snapshot_preview1::{StdioDevices, WasiHost},
};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "wasibox-demo",
    about = "Runs a WASI binary against an in-memory file system."
)]
struct Options {
    /// Directory mapping GUEST=HOSTDIR; the host directory is copied into
    /// the in-memory volume and preopened for the guest. May be repeated.
    #[structopt(long = "dir", number_of_values = 1)]
    dirs: Vec<String>,

    /// Environment entry KEY=VALUE for the guest. May be repeated.
    #[structopt(long = "env", number_of_values = 1)]
    envs: Vec<String>,

    /// The WASI program to run.
    #[structopt(parse(from_os_str))]
    program: PathBuf,

    /// Arguments passed to the guest.
    args: Vec<String>,
}

/// Copies a host directory tree into the volume below `guest`. Regular
/// files and directories only; everything else is skipped.
fn seed_directory(volume: &MemVolume, guest: &str, host: &Path) -> Result<()> {
    for entry in std::fs::read_dir(host)
        .with_context(|| format!("cannot read host directory {}", host.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(name) => name,
            None => bail!("non-UTF-8 file name under {}", host.display()),
        };
        let guest_path = if guest == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", guest, name)
        };

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            volume
                .mkdir(guest_path.as_bytes(), true)
                .with_context(|| format!("cannot create {}", guest_path))?;
            seed_directory(volume, &guest_path, &entry.path())?;
        } else if file_type.is_file() {
            let bytes = std::fs::read(entry.path())
                .with_context(|| format!("cannot read {}", entry.path().display()))?;
            volume
                .write_file(guest_path.as_bytes(), bytes, true)
                .with_context(|| format!("cannot write {}", guest_path))?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let options = Options::from_args();

    let volume = MemVolume::new();
    let mut preopens = Vec::new();

    for mapping in &options.dirs {
        let mut parts = mapping.splitn(2, '=');
        let (guest, host) = match (parts.next(), parts.next()) {
            (Some(guest), Some(host)) if guest.starts_with('/') => (guest, host),
            _ => bail!("--dir expects an absolute GUEST=HOSTDIR mapping, got {:?}", mapping),
        };

        volume
            .mkdir(guest.as_bytes(), true)
            .with_context(|| format!("cannot create guest directory {}", guest))?;
        seed_directory(&volume, guest, Path::new(host))?;

        preopens.push(
            Preopen::new(guest.as_bytes().to_vec(), &volume, guest.as_bytes())
                .with_context(|| format!("cannot preopen {}", guest))?,
        );
    }

    if preopens.is_empty() {
        preopens.push(Preopen::new(&b"/"[..], &volume, b"/").context("cannot preopen /")?);
    }

    let mut arguments = vec![options.program.display().to_string()];
    arguments.extend(options.args.iter().cloned());

    for env in &options.envs {
        if !env.contains('=') {
            bail!("--env expects KEY=VALUE, got {:?}", env);
        }
    }

    let abort = AbortSignal::new();
    let wasi_host = WasiHost::<Utf8>::new(
        arguments,
        options.envs.clone(),
        StdioDevices::host(),
        preopens,
        abort,
    );

    let code = wasi_host
        .run_file(&options.program)
        .context("unable to run WASM binary")?;

    info!("WASI program exited with exit code {}", code);
    std::process::exit(code as i32);
}
