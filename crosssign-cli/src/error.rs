// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {thiserror::Error, x509_crosssign::CrossSignError};

/// Error type for the `crosssign` command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown command")]
    UnknownCommand,

    #[error("bad argument: {0}")]
    BadArgument(&'static str),

    #[error("{0}")]
    CrossSign(#[from] CrossSignError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
