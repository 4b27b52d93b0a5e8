//! Android Signing Tooling
//!
//! This is the entry-point of `android-signing`, a command-line tool invoked
//! by the Gradle build of an Android application to bind build variants to
//! their signing identities. Its inputs are the `android-signing.toml`
//! manifest and the optional `key.properties` credentials file.
//!
//! This CLI is mainly a dispatcher of all the operations available in
//! `android_signing::op::*`. It is a simple clap-based CLI that forwards the
//! arguments to `android_signing` and visualizes the results.

use clap;
use android_signing;
use tracing_subscriber::prelude::*;

struct Cli {
    cmd: clap::Command,
}

fn arg_variant(
    s: &str,
) -> Result<android_signing::signing::BuildVariant, clap::error::Error> {
    s.parse().map_err(
        |_| {
            clap::error::Error::raw(
                clap::error::ErrorKind::ValueValidation,
                "Invalid build variant, expected 'debug' or 'release'",
            )
        }
    )
}

fn arg_variant_flag() -> clap::Arg {
    clap::Arg::new("variant")
        .long("variant")
        .value_name("NAME")
        .help("Build variant to resolve the signing identity for")
        .required(true)
        .value_parser(arg_variant)
}

fn arg_credentials_flag() -> clap::Arg {
    clap::Arg::new("credentials")
        .long("credentials")
        .value_name("PATH")
        .help("Path to the credentials file, overriding the manifest")
        .value_parser(clap::builder::ValueParser::path_buf())
}

// Initialize logging
//
// Logging goes to STDERR, so it never mixes with output on STDOUT. The
// filter is taken from `ANDROID_SIGNING_LOG`, or derived from `--verbose`.
fn init_logging(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_env("ANDROID_SIGNING_LOG")
        .unwrap_or_else(|_| {
            if verbose {
                tracing_subscriber::EnvFilter::new("android_signing=debug")
            } else {
                tracing_subscriber::EnvFilter::new("android_signing=warn")
            }
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
        )
        .init();
}

impl Cli {
    fn new() -> Self {
        let mut cmd;

        cmd = clap::Command::new("android-signing")
            .propagate_version(true)
            .subcommand_required(true)
            .about("Android Signing Tooling")
            .long_about("Bind Android build variants to their signing identities")
            .version(clap::crate_version!());

        cmd = cmd.arg(
            clap::Arg::new("manifest")
                .long("manifest")
                .value_name("PATH")
                .help("Path to the signing manifest relative to the working directory")
                .default_value("./android-signing.toml")
                .value_parser(clap::builder::ValueParser::path_buf())
        );

        cmd = cmd.arg(
            clap::Arg::new("verbose")
                .long("verbose")
                .help("Log resolution details to STDERR")
                .action(clap::ArgAction::SetTrue)
        );

        cmd = cmd.subcommand(
            clap::Command::new("resolve")
                .about("Print the injected signing properties of a build variant")
                .arg(arg_variant_flag())
                .arg(arg_credentials_flag())
        );

        cmd = cmd.subcommand(
            clap::Command::new("evaluate")
                .about("Print the evaluated build configuration of all variants as JSON")
        );

        cmd = cmd.subcommand(
            clap::Command::new("emit")
                .about("Write the injected signing properties of a build variant")
                .arg(arg_variant_flag())
                .arg(arg_credentials_flag())
                .arg(
                    clap::Arg::new("output")
                        .long("output")
                        .value_name("PATH")
                        .help("Path of the properties file to write or remove")
                        .required(true)
                        .value_parser(clap::builder::ValueParser::path_buf())
                )
        );

        Self {
            cmd: cmd,
        }
    }

    fn manifest_path<'a>(
        &self,
        m: &'a clap::ArgMatches,
    ) -> &'a std::path::Path {
        m.get_one::<std::path::PathBuf>("manifest")
            .expect("Manifest-flag lacks a value")
            .as_path()
    }

    fn manifest(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<android_signing::manifest::Manifest, u8> {
        let manifest_path = self.manifest_path(m);

        android_signing::manifest::Manifest::parse_path(manifest_path).map_err(
            |e| {
                eprintln!("Cannot parse signing manifest {:?}: {}", manifest_path, e);
                1
            }
        )
    }

    // Directory of the manifest, which relative manifest paths are based on.
    fn manifest_dir<'a>(
        &self,
        m: &'a clap::ArgMatches,
    ) -> &'a std::path::Path {
        self.manifest_path(m)
            .parent()
            .unwrap_or(std::path::Path::new("."))
    }

    // Credentials path from `--credentials`, or from the manifest.
    fn credentials(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<std::path::PathBuf, u8> {
        if let Some(v) = m_op.get_one::<std::path::PathBuf>("credentials") {
            return Ok(v.clone());
        }

        let manifest = self.manifest(m)?;
        Ok(self.manifest_dir(m).join(manifest.raw.credentials()))
    }

    fn resolve(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<android_signing::op::resolve::Resolved, u8> {
        let variant = *m_op.get_one("variant").expect("Variant-flag lacks a value");
        let credentials = self.credentials(m, m_op)?;

        android_signing::op::resolve::resolve(variant, &credentials).map_err(
            |e| {
                eprintln!("Cannot resolve signing identity: {}", e);
                1
            }
        )
    }

    fn op_resolve(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let resolved = self.resolve(m, m_op)?;

        if let Some(v) = android_signing::op::emit::render(
            &resolved.resolution,
            resolved.base.as_deref(),
        ) {
            print!("{}", v);
        }

        Ok(())
    }

    fn op_evaluate(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let manifest = self.manifest(m)?;

        let evaluation = match android_signing::op::evaluate::evaluate(
            &manifest,
            self.manifest_dir(m),
        ) {
            Err(e) => {
                eprintln!("Cannot evaluate build configuration: {}", e);
                return Err(1);
            },
            Ok(v) => v,
        };

        match serde_json::to_string_pretty(&evaluation) {
            Err(e) => {
                eprintln!("Cannot serialize build configuration: {}", e);
                Err(1)
            },
            Ok(v) => {
                println!("{}", v);
                Ok(())
            },
        }
    }

    fn op_emit(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let resolved = self.resolve(m, m_op)?;
        let output = m_op.get_one::<std::path::PathBuf>("output")
            .expect("Output-flag lacks a value");

        match android_signing::op::emit::emit(
            &resolved.resolution,
            resolved.base.as_deref(),
            output,
        ) {
            Err(e) => {
                eprintln!("Cannot emit signing properties: {}", e);
                Err(1)
            },
            Ok(_) => {
                Ok(())
            },
        }
    }

    fn run(mut self) -> Result<(), u8> {
        let (m, r);

        r = self.cmd.try_get_matches_from_mut(
            std::env::args_os(),
        );

        match r {
            Ok(v) => m = v,
            Err(e) => {
                return match e.kind() {
                    clap::error::ErrorKind::DisplayHelp |
                    clap::error::ErrorKind::DisplayVersion => {
                        let _ = e.print();
                        Ok(())
                    },
                    _ => {
                        let _ = e.print();
                        Err(2)
                    }
                }
            }
        }

        init_logging(m.get_flag("verbose"));

        match m.subcommand() {
            Some(("resolve", m_op)) => self.op_resolve(&m, m_op),
            Some(("evaluate", _)) => self.op_evaluate(&m),
            Some(("emit", m_op)) => self.op_emit(&m, m_op),
            _ => std::unreachable!(),
        }
    }
}

fn main() -> std::process::ExitCode {
    match Cli::new().run() {
        Ok(()) => 0.into(),
        Err(v) => v.into(),
    }
}
