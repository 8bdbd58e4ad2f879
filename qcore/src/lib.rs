// Copyright © 2021 HQS Quantum Simulations GmbH. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the
// License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either
// express or implied. See the License for the specific language governing permissions and
// limitations under the License.

#![deny(missing_docs)]
#![warn(private_intra_doc_links)]
#![deny(missing_debug_implementations)]

//! # qcore
//!
//! Client-side quantum circuit intermediate representation and transformation
//! core: builds, simplifies, decomposes and serializes quantum circuits.
//!
//! The operation algebra (elementary gates, parametric gates, composite
//! wrappers, reusable blocks, conditional execution, measurements, Kraus
//! noise channels) lives in [`operations`]; [`circuit`] provides the ordered
//! instruction container; [`swap_elimination`] and [`decompose`] implement
//! the two transformation passes; [`serialization`] is the binary wire
//! format; [`job_layout`] emits the external job-input directory layout.
pub use qoqo_calculator::Calculator;
use qoqo_calculator::CalculatorError;
pub use qoqo_calculator::CalculatorFloat;
use thiserror::Error;

/// qcore version information, used for import/export checks.
pub const QCORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors that can occur while building, transforming or serializing
/// circuits.
///
/// The variants mirror the error taxonomy used throughout the core: `Arity`
/// and `Domain` are raised eagerly at construction (the partially built
/// circuit is unaffected), `Unsupported` by the offending algebraic method,
/// `Symbolic` by a numeric consumer, and `NotFound` / `Format` by the
/// serializer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QcoreError {
    /// Instruction target count does not match operation arity, a target
    /// tuple contains a duplicate index, or an index is negative.
    #[error("Arity mismatch for operation {operation}: {message}")]
    Arity {
        /// Name of the offending operation.
        operation: String,
        /// Description of the mismatch.
        message: String,
    },
    /// A value lies outside its required domain: probability outside
    /// `[0, 1]`, probabilities not summing to one, a non-unitary `Custom`
    /// matrix, a non-square matrix, or a qubit count that is not a power of
    /// two.
    #[error("Domain error in operation {operation}: {message}")]
    Domain {
        /// Name of the offending operation.
        operation: String,
        /// Description of the violated domain constraint.
        message: String,
    },
    /// Inverse, power, control or parallel was requested of an operation
    /// that does not support it (measurement, reset, barrier, Kraus
    /// channel, ...).
    #[error("Operation {operation} does not support {action}")]
    Unsupported {
        /// Name of the offending operation.
        operation: String,
        /// Name of the unsupported action (inverse, power, control, ...).
        action: String,
    },
    /// A numeric value was required but one or more parameters are still
    /// symbolic. `evaluate()` is the recovery path.
    #[error("Cannot evaluate {operation} numerically: unbound symbol(s) {symbols:?}")]
    Symbolic {
        /// Name of the offending operation.
        operation: String,
        /// Names of the unbound symbols.
        symbols: Vec<String>,
    },
    /// A referenced parameter name, serialized field, or remote result file
    /// is missing.
    #[error("Not found: {what}")]
    NotFound {
        /// Description of what was being looked up.
        what: String,
    },
    /// Malformed serialized input: wrong magic, unsupported version, or
    /// truncated payload.
    #[error("Format error: {message}")]
    Format {
        /// Description of the format violation.
        message: String,
    },
    /// Transparent propagation of a qoqo_calculator error (failed symbolic
    /// evaluation, parser error, ...).
    #[error(transparent)]
    CalculatorError(#[from] CalculatorError),
}

/// Convenience alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, QcoreError>;

pub mod bit_string;
pub mod circuit;
pub mod decompose;
pub mod job_layout;
mod matrix_utils;
pub mod operations;
pub mod serialization;
pub mod swap_elimination;

pub use bit_string::BitString;
pub use circuit::{Circuit, Instruction};
pub use operations::Operation;
