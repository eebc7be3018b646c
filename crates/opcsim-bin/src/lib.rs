// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Process plumbing for the `opcsim-server` and `opcsim-client` binaries.
//!
//! - [`logging`]: subscriber setup from `OPCSIM_LOG_LEVEL` / `OPCSIM_LOG_FORMAT`
//! - [`runtime`]: signal handling around the update and poll loops
//! - [`error`]: process errors and exit codes

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod logging;
pub mod runtime;

pub use error::{report_error, report_error_and_exit, BinError, BinResult};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use runtime::{ClientRuntime, ServerRuntime};
