// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod error;

use {
    crate::error::CliError,
    clap::{Arg, ArgMatches, Command},
    log::{debug, warn, LevelFilter},
    std::path::PathBuf,
    x509_crosssign::{
        cross_sign_files, generate_chain_files, ChainConfig, X509Certificate,
        DEFAULT_EXCLUDED_DOMAIN, DEFAULT_INTERMEDIATE_COMMON_NAME_PREFIX,
        DEFAULT_ROOT_COMMON_NAME_PREFIX,
    },
};

const NAME_CONSTRAINT_ABOUT: &str = "\
Apply a DNS name constraint to an existing root CA.

A new root CA and an intermediate CA are generated. The intermediate carries
a critical NameConstraints extension excluding the given DNS subtree. The
original root CA is then cross-signed by the intermediate.

Trusting the new root instead of the original yields the trust of the original
root minus the excluded domain. The private keys of the generated CAs are
never written to disk.

The following files are written, readable only by the current user:

  <output-prefix>root.crt
  <output-prefix>intermediate.crt
  <output-prefix>cross-signed.crt
";

const CROSS_SIGN_ABOUT: &str = "\
Re-sign a certificate by another certificate and its private key.

Every field of the certificate to sign is preserved except its serial number,
issuer and signature. The signer key must be an ECDSA P-256 or RSA key and may
be PKCS#8, SEC1 or PKCS#1 encoded, as DER or PEM.

The result is written to <output-prefix>cross-signed.crt.
";

fn required_value<'a>(args: &'a ArgMatches, name: &'static str) -> Result<&'a str, CliError> {
    args.value_of(name).ok_or(CliError::BadArgument(name))
}

/// Build the chain configuration from `name-constraint` arguments.
fn chain_config(args: &ArgMatches) -> Result<ChainConfig, CliError> {
    let defaults = ChainConfig::default();

    Ok(ChainConfig {
        root_common_name_prefix: args
            .value_of("root_cn_prefix")
            .map(|s| s.to_string())
            .unwrap_or(defaults.root_common_name_prefix),
        intermediate_common_name_prefix: args
            .value_of("intermediate_cn_prefix")
            .map(|s| s.to_string())
            .unwrap_or(defaults.intermediate_common_name_prefix),
        excluded_domain: args
            .value_of("excluded_domain")
            .map(|s| s.to_string())
            .unwrap_or(defaults.excluded_domain),
        input_path: PathBuf::from(required_value(args, "input_root_ca_path")?),
        output_prefix: args
            .value_of("output_prefix")
            .map(|s| s.to_string())
            .unwrap_or(defaults.output_prefix),
    })
}

fn command_name_constraint(args: &ArgMatches) -> Result<(), CliError> {
    let config = chain_config(args)?;

    debug!("{:?}", config);

    let paths = generate_chain_files(&config)?;

    println!("{}", paths.root.display());
    println!("{}", paths.intermediate.display());
    println!("{}", paths.cross_signed.display());

    Ok(())
}

fn command_cross_sign(args: &ArgMatches) -> Result<(), CliError> {
    let path = cross_sign_files(
        required_value(args, "to_sign")?,
        required_value(args, "signer_cert")?,
        required_value(args, "signer_key")?,
        args.value_of("output_prefix").unwrap_or_default(),
    )?;

    println!("{}", path.display());

    Ok(())
}

fn command_fingerprint(args: &ArgMatches) -> Result<(), CliError> {
    let path = required_value(args, "path")?;

    let cert = X509Certificate::from_der_or_pem(std::fs::read(path)?)?;

    println!("SHA-256 fingerprint: {}", cert.sha256_fingerprint_hex());

    match cert.subject_common_name() {
        Ok(Some(cn)) => println!("Common Name:         {}", cn),
        Ok(None) => println!("Common Name:         (none)"),
        Err(e) => warn!("unable to decode subject common name: {}", e),
    }

    Ok(())
}

fn app() -> Command<'static> {
    let app = Command::new("crosssign")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Cross-sign X.509 certificate authorities to apply name constraints")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(
        Command::new("name-constraint")
            .about("Apply a DNS name constraint to an existing root CA")
            .long_about(NAME_CONSTRAINT_ABOUT)
            .arg(
                Arg::new("input_root_ca_path")
                    .long("input-root-ca-path")
                    .takes_value(true)
                    .required(true)
                    .help("Path to the root CA certificate to constrain (DER or PEM)"),
            )
            .arg(
                Arg::new("root_cn_prefix")
                    .long("root-cn-prefix")
                    .takes_value(true)
                    .default_value(DEFAULT_ROOT_COMMON_NAME_PREFIX)
                    .help("Prefix for the common name of the generated root CA"),
            )
            .arg(
                Arg::new("intermediate_cn_prefix")
                    .long("intermediate-cn-prefix")
                    .takes_value(true)
                    .default_value(DEFAULT_INTERMEDIATE_COMMON_NAME_PREFIX)
                    .help("Prefix for the common name of the generated intermediate CA"),
            )
            .arg(
                Arg::new("excluded_domain")
                    .long("excluded-domain")
                    .takes_value(true)
                    .default_value(DEFAULT_EXCLUDED_DOMAIN)
                    .help("DNS domain the constrained chain must not be valid for"),
            )
            .arg(
                Arg::new("output_prefix")
                    .long("output-prefix")
                    .takes_value(true)
                    .help("Prefix of the written certificate paths"),
            ),
    );

    let app = app.subcommand(
        Command::new("cross-sign")
            .about("Re-sign a certificate by another certificate and key")
            .long_about(CROSS_SIGN_ABOUT)
            .arg(
                Arg::new("signer_key")
                    .long("signer-key")
                    .takes_value(true)
                    .required(true)
                    .help("Path to the private key of the signing certificate"),
            )
            .arg(
                Arg::new("signer_cert")
                    .long("signer-cert")
                    .takes_value(true)
                    .required(true)
                    .help("Path to the signing certificate"),
            )
            .arg(
                Arg::new("to_sign")
                    .long("to-sign")
                    .takes_value(true)
                    .required(true)
                    .help("Path to the certificate to re-sign"),
            )
            .arg(
                Arg::new("output_prefix")
                    .long("output-prefix")
                    .takes_value(true)
                    .help("Prefix of the written certificate path"),
            ),
    );

    app.subcommand(
        Command::new("fingerprint")
            .about("Print the SHA-256 fingerprint and common name of a certificate")
            .arg(
                Arg::new("path")
                    .required(true)
                    .help("Path to a DER or PEM certificate"),
            ),
    )
}

fn main_impl() -> Result<(), CliError> {
    let matches = app().get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("cross-sign", args)) => command_cross_sign(args),
        Some(("fingerprint", args)) => command_fingerprint(args),
        Some(("name-constraint", args)) => command_name_constraint(args),
        _ => Err(CliError::UnknownCommand),
    }
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };

    std::process::exit(exit_code)
}
