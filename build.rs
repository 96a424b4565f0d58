// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("aptsnap")
        .version(env!("CARGO_PKG_VERSION"))
        .author("aptsnap Contributors")
        .about("Bracket APT transactions with linked snapper pre/post snapshots")
        .long_about(
            "Run from APT as DPkg::Pre-Install-Pkgs (pre) and DPkg::Post-Invoke (post). \
             The pre hook reads staged package files on stdin, creates a snapper pre \
             snapshot and records its number; the post hook creates the matching post \
             snapshot. Exit status: 0 success or duplicate hook call, 1 invalid phase, \
             2 snapper or dpkg-query missing, 3 no pending record, 4 unreadable record, \
             5 snapper printed no snapshot number, 6 other I/O failure.",
        )
        .arg(
            Arg::new("phase")
                .required(true)
                .value_parser(["pre", "post"])
                .help("Hook phase"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)
        .expect("Failed to render man page");

    let man_path = man_dir.join("aptsnap.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
