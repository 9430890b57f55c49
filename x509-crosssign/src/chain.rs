// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Name constraint chain orchestration.

use {
    crate::{
        cross_sign::cross_sign, generate_intermediate_ca, generate_root_ca,
        signing::InMemorySigningKeyPair, CrossSignError as Error, GeneratedCa, Stage,
    },
    log::{debug, info, warn},
    std::{
        fs::Permissions,
        io::Write,
        path::{Path, PathBuf},
    },
};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[cfg(unix)]
fn set_permissions_private(p: &mut Permissions) {
    p.set_mode(0o600);
}

#[cfg(not(unix))]
fn set_permissions_private(_: &mut Permissions) {}

/// Default common name prefix of generated root CAs.
pub const DEFAULT_ROOT_COMMON_NAME_PREFIX: &str = "Namecoin Restricted CKBI Root CA for ";

/// Default common name prefix of generated intermediate CAs.
pub const DEFAULT_INTERMEDIATE_COMMON_NAME_PREFIX: &str =
    "Namecoin Restricted CKBI Intermediate CA for ";

/// Default DNS subtree excluded by the intermediate CA.
pub const DEFAULT_EXCLUDED_DOMAIN: &str = ".bit";

/// The DER encoded certificates of a name constraint chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrossSignedChain {
    /// Generated self-signed root CA.
    pub root: Vec<u8>,
    /// Name constrained intermediate CA, issued by `root`.
    pub intermediate: Vec<u8>,
    /// The original root CA re-signed by `intermediate`.
    pub cross_signed: Vec<u8>,
}

/// Retrofit a DNS name exclusion onto the root CA `original_der`.
///
/// Runs the root CA, intermediate CA and cross-signing stages in order.
/// Failures are wrapped in [CrossSignError::Stage](crate::CrossSignError::Stage)
/// naming the stage that failed.
///
/// The private keys of the generated root and intermediate are dropped before
/// this function returns.
pub fn get_cross_signed_der(
    root_common_name_prefix: &str,
    intermediate_common_name_prefix: &str,
    excluded_domain: &str,
    original_der: &[u8],
) -> Result<CrossSignedChain, Error> {
    let GeneratedCa {
        certificate_der: root,
        key_pair: root_key,
    } = generate_root_ca(root_common_name_prefix, original_der)
        .map_err(|e| e.in_stage(Stage::RootCa))?;

    let GeneratedCa {
        certificate_der: intermediate,
        key_pair: intermediate_key,
    } = generate_intermediate_ca(
        intermediate_common_name_prefix,
        excluded_domain,
        original_der,
        &root,
        &root_key,
    )
    .map_err(|e| e.in_stage(Stage::IntermediateCa))?;
    drop(root_key);

    let cross_signed = cross_sign(original_der, &intermediate, &intermediate_key)
        .map_err(|e| e.in_stage(Stage::CrossSignedCa))?;
    drop(intermediate_key);

    debug!("name constraint chain for {} complete", excluded_domain);

    Ok(CrossSignedChain {
        root,
        intermediate,
        cross_signed,
    })
}

/// Settings for producing a name constraint chain from files.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainConfig {
    /// Prepended to the original common name to form the root CA's.
    pub root_common_name_prefix: String,
    /// Prepended to the original common name to form the intermediate CA's.
    pub intermediate_common_name_prefix: String,
    /// DNS subtree the chain must not validate, e.g. `.bit`.
    pub excluded_domain: String,
    /// Path of the original root CA certificate (DER or PEM).
    pub input_path: PathBuf,
    /// Prefix of the written certificate paths.
    pub output_prefix: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            root_common_name_prefix: DEFAULT_ROOT_COMMON_NAME_PREFIX.to_string(),
            intermediate_common_name_prefix: DEFAULT_INTERMEDIATE_COMMON_NAME_PREFIX.to_string(),
            excluded_domain: DEFAULT_EXCLUDED_DOMAIN.to_string(),
            input_path: PathBuf::new(),
            output_prefix: String::new(),
        }
    }
}

/// Paths written by [generate_chain_files()].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainOutputPaths {
    pub root: PathBuf,
    pub intermediate: PathBuf,
    pub cross_signed: PathBuf,
}

impl ChainOutputPaths {
    /// Resolve output paths by appending file names to `prefix`.
    ///
    /// The prefix is used as a string, so `out/` and `out/ca-` are both valid.
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            root: PathBuf::from(format!("{}root.crt", prefix)),
            intermediate: PathBuf::from(format!("{}intermediate.crt", prefix)),
            cross_signed: cross_signed_path(prefix),
        }
    }
}

fn cross_signed_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}cross-signed.crt", prefix))
}

/// Read a certificate file, removing PEM armor if present.
pub fn read_certificate_der(path: impl AsRef<Path>) -> Result<Vec<u8>, Error> {
    let data = std::fs::read(path.as_ref())?;

    if data.starts_with(b"-----BEGIN") {
        Ok(pem::parse(&data).map_err(Error::PemDecode)?.contents)
    } else {
        Ok(data)
    }
}

/// Write data to a file only readable by its owner.
fn write_private_file(path: &Path, data: &[u8]) -> Result<(), Error> {
    let mut fh = std::fs::File::create(path)?;
    let mut permissions = fh.metadata()?.permissions();
    set_permissions_private(&mut permissions);
    fh.set_permissions(permissions)?;
    fh.write_all(data)?;

    Ok(())
}

/// Produce a name constraint chain for the certificate at `config.input_path`.
///
/// Nothing is written unless every stage succeeded.
pub fn generate_chain_files(config: &ChainConfig) -> Result<ChainOutputPaths, Error> {
    let original_der = read_certificate_der(&config.input_path)?;

    let chain = get_cross_signed_der(
        &config.root_common_name_prefix,
        &config.intermediate_common_name_prefix,
        &config.excluded_domain,
        &original_der,
    )?;

    let paths = ChainOutputPaths::from_prefix(&config.output_prefix);

    write_private_files(&[
        (paths.root.as_path(), chain.root.as_slice()),
        (paths.intermediate.as_path(), chain.intermediate.as_slice()),
        (paths.cross_signed.as_path(), chain.cross_signed.as_slice()),
    ])?;

    Ok(paths)
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".tmp");
    PathBuf::from(s)
}

/// Write several private files, leaving none of them behind on failure.
///
/// Each file is first written to a `.tmp` sibling. The temporaries are
/// renamed into place once all of them were written.
fn write_private_files(files: &[(&Path, &[u8])]) -> Result<(), Error> {
    let mut written = vec![];

    for (path, data) in files {
        let temp = temporary_path(path);

        if let Err(e) = write_private_file(&temp, data) {
            let _ = std::fs::remove_file(&temp);
            for p in &written {
                let _ = std::fs::remove_file(p);
            }
            return Err(e);
        }

        written.push(temp);
    }

    for (i, (path, _)) in files.iter().enumerate() {
        if let Err(e) = std::fs::rename(&written[i], path) {
            warn!("unable to move {} into place: {}", path.display(), e);
            for (done, _) in &files[..i] {
                let _ = std::fs::remove_file(done);
            }
            for p in &written[i..] {
                let _ = std::fs::remove_file(p);
            }
            return Err(e.into());
        }

        info!("wrote {}", path.display());
    }

    Ok(())
}

/// Re-sign the certificate at `to_sign_path` by the certificate and key of a signer.
///
/// The key may be PKCS#8, SEC1 or PKCS#1, as DER or PEM. The result is
/// written to `<output_prefix>cross-signed.crt`, whose path is returned.
pub fn cross_sign_files(
    to_sign_path: impl AsRef<Path>,
    signer_cert_path: impl AsRef<Path>,
    signer_key_path: impl AsRef<Path>,
    output_prefix: &str,
) -> Result<PathBuf, Error> {
    let to_sign = read_certificate_der(to_sign_path)?;
    let signer = read_certificate_der(signer_cert_path)?;
    let signer_key =
        InMemorySigningKeyPair::from_der_or_pem(std::fs::read(signer_key_path.as_ref())?)?;

    let cross_signed = cross_sign(&to_sign, &signer, &signer_key)?;

    let path = cross_signed_path(output_prefix);
    write_private_file(&path, &cross_signed)?;
    info!("wrote {}", path.display());

    Ok(path)
}
