// Copyright © 2021-2022 HQS Quantum Simulations GmbH. All Rights Reserved.
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

//! The operation algebra: a single closed [`Operation`] enum covering
//! elementary gates, composite wrappers (`Inverse`, `Power`, `Control`,
//! `Parallel`, `Repeat`, `IfStatement`), reusable `Block`/`GateCall`
//! definitions, measurement-like operations and Kraus noise channels.
//!
//! Wrapper variants are built through the `*_of` constructors rather than
//! directly, so that the canonical rewrite laws are applied eagerly at
//! construction time: `Inverse(Inverse(x)) = x`, `Power` exponents compose,
//! `Control`/`Parallel` counts flatten, and the rational-exponent root
//! identities (`sqrt(X) = SX`, ...) collapse immediately. `Repeat` is
//! deliberately never folded into `Power` -- the two carry different
//! operational meaning even when the underlying gate is unitary.

use crate::matrix_utils::{controlled_block, dagger, diag_power, kron_all};
use crate::{QcoreError, Result};
use ndarray::Array2;
use num_complex::Complex64;
use qoqo_calculator::CalculatorFloat;
use std::collections::HashSet;
use std::sync::Arc;

mod block;
mod gate;
mod kraus;
mod measurement;

pub use block::{Block, GateDecl};
pub use gate::{Gate, Pauli};
pub use kraus::{KrausChannel, MixedUnitary};
pub use measurement::templates as measurement_templates;
pub use measurement::{Barrier, Measurement, Reset};

/// The qubits an operation acts on, as seen from a containing circuit.
#[derive(Debug, PartialEq, Clone, Eq)]
pub enum InvolvedQubits {
    /// Operation affects all qubits in the circuit, however many there are
    /// (e.g. a `Barrier` with no explicit targets).
    All,
    /// Operation affects no qubits.
    None,
    /// Operation affects exactly this set of qubit indices.
    Set(HashSet<usize>),
}

/// The classical bits/z-variables an operation reads or writes, as seen
/// from a containing circuit.
#[derive(Debug, PartialEq, Clone, Eq)]
pub enum InvolvedClassical {
    /// Operation affects no classical storage.
    None,
    /// Operation affects exactly this set of bit indices.
    Bits(HashSet<usize>),
    /// Operation affects exactly this set of z-variable indices.
    ZVars(HashSet<usize>),
}

/// A closed quantum/classical operation.
///
/// `Operation` is what an [`crate::circuit::Instruction`] carries; targets
/// (qubits, bits, z-vars) live on the instruction, not on the operation
/// itself, so the same `Operation` value is reusable across instructions.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// An elementary or standard gate.
    Gate(Gate),
    /// Projective measurement of one qubit into one classical bit.
    Measurement(Measurement),
    /// Resets one qubit to `|0>`.
    Reset(Reset),
    /// A scheduling barrier; never optimized across.
    Barrier(Barrier),
    /// A non-unitary Kraus channel.
    KrausChannel(KrausChannel),
    /// A probabilistic mixture of unitaries.
    MixedUnitary(MixedUnitary),
    /// Hermitian conjugate of the wrapped operation.
    Inverse(Box<Operation>),
    /// Wrapped operation raised to a (possibly symbolic) real exponent.
    Power(Box<Operation>, CalculatorFloat),
    /// Wrapped operation with `num_controls` leading control qubits.
    Control(Box<Operation>, usize),
    /// `num_blocks` independent, simultaneous copies of the wrapped
    /// operation, each acting on its own disjoint set of targets.
    Parallel(usize, Box<Operation>),
    /// Wrapped operation applied `count` times in sequence.
    Repeat(Box<Operation>, usize),
    /// Applies the wrapped operation only if the classical bits at the
    /// instruction's bit targets equal `condition`.
    IfStatement(Box<Operation>, crate::BitString),
    /// A reusable, named sub-circuit with its own local qubit/bit
    /// numbering.
    Block(Arc<Block>),
    /// An invocation of a [`GateDecl`] with bound parameters.
    GateCall(Arc<GateDecl>, Vec<CalculatorFloat>),
}

impl Operation {
    /// A short, human-readable name for the operation kind.
    pub fn name(&self) -> String {
        match self {
            Operation::Gate(g) => g.name().to_string(),
            Operation::Measurement(_) => "Measurement".to_string(),
            Operation::Reset(_) => "Reset".to_string(),
            Operation::Barrier(_) => "Barrier".to_string(),
            Operation::KrausChannel(_) => "KrausChannel".to_string(),
            Operation::MixedUnitary(_) => "MixedUnitary".to_string(),
            Operation::Inverse(inner) => format!("Inverse({})", inner.name()),
            Operation::Power(inner, p) => format!("Power({}, {p})", inner.name()),
            Operation::Control(inner, n) => format!("Control({n}, {})", inner.name()),
            Operation::Parallel(n, inner) => format!("Parallel({n}, {})", inner.name()),
            Operation::Repeat(inner, n) => format!("Repeat({}, {n})", inner.name()),
            Operation::IfStatement(inner, _) => format!("IfStatement({})", inner.name()),
            Operation::Block(b) => format!("Block({})", b.name()),
            Operation::GateCall(decl, _) => format!("GateCall({})", decl.name()),
        }
    }

    /// Number of qubits this operation acts on when placed in an
    /// instruction (the `Instruction` validates that the target tuple
    /// matches this arity).
    pub fn num_qubits(&self) -> usize {
        match self {
            Operation::Gate(g) => g.num_qubits(),
            Operation::Measurement(_) | Operation::Reset(_) => 1,
            Operation::Barrier(b) => b.num_qubits(),
            Operation::KrausChannel(k) => k.num_qubits(),
            Operation::MixedUnitary(m) => m.num_qubits(),
            Operation::Inverse(inner) => inner.num_qubits(),
            Operation::Power(inner, _) => inner.num_qubits(),
            Operation::Control(inner, n) => inner.num_qubits() + n,
            Operation::Parallel(n, inner) => inner.num_qubits() * n,
            Operation::Repeat(inner, _) => inner.num_qubits(),
            Operation::IfStatement(inner, _) => inner.num_qubits(),
            Operation::Block(b) => b.num_qubits(),
            Operation::GateCall(decl, _) => decl.num_qubits(),
        }
    }

    /// Number of classical bits this operation reads or writes.
    pub fn num_bits(&self) -> usize {
        match self {
            Operation::Measurement(_) => 1,
            Operation::IfStatement(inner, condition) => inner.num_bits() + condition.len(),
            Operation::Control(inner, _) | Operation::Power(inner, _) | Operation::Inverse(inner) => {
                inner.num_bits()
            }
            Operation::Parallel(n, inner) => inner.num_bits() * n,
            Operation::Repeat(inner, _) => inner.num_bits(),
            Operation::Block(b) => b.num_bits(),
            Operation::GateCall(decl, _) => decl.num_bits(),
            _ => 0,
        }
    }

    /// Whether any numeric parameter anywhere in the operation tree is
    /// still symbolic.
    pub fn is_symbolic(&self) -> bool {
        match self {
            Operation::Gate(g) => g.is_symbolic(),
            Operation::Power(inner, p) => inner.is_symbolic() || f64::try_from(p.clone()).is_err(),
            Operation::Inverse(inner)
            | Operation::Control(inner, _)
            | Operation::Parallel(_, inner)
            | Operation::Repeat(inner, _)
            | Operation::IfStatement(inner, _) => inner.is_symbolic(),
            Operation::KrausChannel(k) => k.is_symbolic(),
            Operation::MixedUnitary(m) => m.is_symbolic(),
            Operation::Block(b) => b.is_symbolic(),
            Operation::GateCall(_, params) => {
                params.iter().any(|p| f64::try_from(p.clone()).is_err())
            }
            Operation::Measurement(_) | Operation::Reset(_) | Operation::Barrier(_) => false,
        }
    }

    /// The dense unitary matrix, where defined. Non-unitary operations
    /// (`Measurement`, `Reset`, `Barrier`, `KrausChannel`) fail with
    /// [`QcoreError::Unsupported`].
    pub fn matrix(&self) -> Result<Array2<Complex64>> {
        match self {
            Operation::Gate(g) => g.matrix(),
            Operation::Inverse(inner) => Ok(dagger(&inner.matrix()?)),
            Operation::Control(inner, n) => Ok(controlled_block(&inner.matrix()?, *n as u32)),
            Operation::Parallel(n, inner) => {
                let m = inner.matrix()?;
                Ok(kron_all(&vec![m; *n]))
            }
            Operation::Power(inner, exponent) => power_matrix(inner, exponent),
            Operation::Repeat(inner, count) => {
                let m = inner.matrix()?;
                let mut acc = m.clone();
                for _ in 1..*count {
                    acc = acc.dot(&m);
                }
                Ok(acc)
            }
            Operation::MixedUnitary(_) => Err(QcoreError::Unsupported {
                operation: "MixedUnitary".to_string(),
                action: "matrix (non-unitary; use krausmatrices/unitarymatrices)".to_string(),
            }),
            Operation::GateCall(decl, params) => decl.matrix(params),
            Operation::Block(b) => Err(QcoreError::Unsupported {
                operation: format!("Block({})", b.name()),
                action: "matrix (expand via decompose() first)".to_string(),
            }),
            other => Err(QcoreError::Unsupported {
                operation: other.name(),
                action: "matrix".to_string(),
            }),
        }
    }

    /// Builds `Inverse(self)`, collapsing `Inverse(Inverse(x))` to `x`.
    pub fn inverse(self) -> Result<Operation> {
        Ok(match self {
            Operation::Gate(g) => Operation::Gate(g.inverse()?),
            Operation::Inverse(inner) => *inner,
            Operation::Control(inner, n) => Operation::Control(Box::new(inner.inverse()?), n),
            Operation::Parallel(n, inner) => Operation::Parallel(n, Box::new(inner.inverse()?)),
            Operation::Power(inner, p) => Operation::Power(inner, -p),
            unsupported @ (Operation::Measurement(_)
            | Operation::Reset(_)
            | Operation::Barrier(_)
            | Operation::KrausChannel(_)
            | Operation::MixedUnitary(_)
            | Operation::Repeat(..)
            | Operation::IfStatement(..)) => {
                return Err(QcoreError::Unsupported {
                    operation: unsupported.name(),
                    action: "inverse".to_string(),
                })
            }
            other => Operation::Inverse(Box::new(other)),
        })
    }

    /// Builds `Power(self, exponent)`, composing nested powers and applying
    /// the closed-form root identities of the underlying gate, if any.
    /// `exponent == 1` always collapses to `self` and `exponent == 0` to the
    /// identity on `self`'s arity, even when no gate-specific closed form
    /// applies (e.g. `Gate::T.power(1)`) and for non-gate wrappers.
    pub fn power(self, exponent: CalculatorFloat) -> Result<Operation> {
        if let Operation::Gate(g) = &self {
            if let Some(closed_form) = gate::gate_power(g, &exponent) {
                return Ok(closed_form);
            }
        }
        if let Ok(p) = f64::try_from(exponent.clone()) {
            if (p - 1.0).abs() < 1e-9 {
                return Ok(self);
            }
            if p.abs() < 1e-9 {
                return Ok(identity_on_arity(self.num_qubits()));
            }
        }
        Ok(match self {
            Operation::Power(inner, p) => Operation::Power(inner, p * exponent),
            unsupported @ (Operation::Measurement(_)
            | Operation::Reset(_)
            | Operation::Barrier(_)
            | Operation::KrausChannel(_)
            | Operation::MixedUnitary(_)
            | Operation::Repeat(..)
            | Operation::IfStatement(..)) => {
                return Err(QcoreError::Unsupported {
                    operation: unsupported.name(),
                    action: "power".to_string(),
                })
            }
            other => Operation::Power(Box::new(other), exponent),
        })
    }

    /// Builds `Control(self, num_controls)`, flattening nested controls
    /// into a single wrapper with the summed control count.
    pub fn control(self, num_controls: usize) -> Result<Operation> {
        if num_controls == 0 {
            return Ok(self);
        }
        Ok(match self {
            Operation::Control(inner, n) => Operation::Control(inner, n + num_controls),
            unsupported @ (Operation::Measurement(_)
            | Operation::Reset(_)
            | Operation::Barrier(_)
            | Operation::KrausChannel(_)
            | Operation::MixedUnitary(_)
            | Operation::IfStatement(..)) => {
                return Err(QcoreError::Unsupported {
                    operation: unsupported.name(),
                    action: "control".to_string(),
                })
            }
            other => Operation::Control(Box::new(other), num_controls),
        })
    }

    /// Builds `Parallel(self, num_blocks)`, flattening nested parallel
    /// wrappers into a single wrapper with the multiplied block count.
    pub fn parallel(self, num_blocks: usize) -> Result<Operation> {
        if num_blocks == 1 {
            return Ok(self);
        }
        Ok(match self {
            Operation::Parallel(n, inner) => Operation::Parallel(n * num_blocks, inner),
            unsupported @ (Operation::Measurement(_)
            | Operation::Reset(_)
            | Operation::Barrier(_)
            | Operation::IfStatement(..)) => {
                return Err(QcoreError::Unsupported {
                    operation: unsupported.name(),
                    action: "parallel".to_string(),
                })
            }
            other => Operation::Parallel(num_blocks, Box::new(other)),
        })
    }

    /// Builds `Repeat(self, count)`. Never collapses to `Power`, even for
    /// unitary gates: `Repeat` means "apply this instruction `count` times
    /// in sequence", `Power` means "raise this gate's matrix to an
    /// exponent" -- the two stay distinct node kinds. `count == 0` collapses
    /// to the identity on `self`'s arity and `count == 1` to `self`, before
    /// either is ever wrapped.
    pub fn repeat(self, count: usize) -> Result<Operation> {
        if count == 0 {
            return Ok(identity_on_arity(self.num_qubits()));
        }
        if count == 1 {
            return Ok(self);
        }
        match &self {
            Operation::KrausChannel(_) | Operation::MixedUnitary(_) => {
                return Err(QcoreError::Unsupported {
                    operation: self.name(),
                    action: "repeat".to_string(),
                })
            }
            _ => {}
        }
        Ok(Operation::Repeat(Box::new(self), count))
    }

    /// Builds `IfStatement(self, condition)`.
    pub fn if_statement(self, condition: crate::BitString) -> Result<Operation> {
        match &self {
            Operation::IfStatement(..) => {}
            Operation::KrausChannel(_) | Operation::MixedUnitary(_) => {
                return Err(QcoreError::Unsupported {
                    operation: self.name(),
                    action: "if_statement".to_string(),
                })
            }
            _ => {}
        }
        Ok(Operation::IfStatement(Box::new(self), condition))
    }
}

/// The identity operation on `num_qubits` qubits: plain `Gate::Id` for one
/// qubit, an `n`-fold parallel product of `Gate::Id` otherwise, mirroring
/// `gate::identity_like` for the non-gate wrappers (`Power`, `Repeat`) whose
/// arity comes from an arbitrary inner `Operation` rather than a `Gate`.
fn identity_on_arity(num_qubits: usize) -> Operation {
    match num_qubits {
        1 => Operation::Gate(Gate::Id),
        n => Operation::Parallel(n, Box::new(Operation::Gate(Gate::Id))),
    }
}

fn power_matrix(inner: &Operation, exponent: &CalculatorFloat) -> Result<Array2<Complex64>> {
    let p = f64::try_from(exponent.clone()).map_err(|_| QcoreError::Symbolic {
        operation: inner.name(),
        symbols: vec![exponent.to_string()],
    })?;
    let m = inner.matrix()?;
    let (dim, _) = m.dim();
    let is_diagonal = (0..dim)
        .flat_map(|i| (0..dim).map(move |j| (i, j)))
        .filter(|(i, j)| i != j)
        .all(|(i, j)| m[(i, j)].norm() < 1e-12);
    if is_diagonal {
        let diag: Vec<Complex64> = (0..dim).map(|i| m[(i, i)]).collect();
        return Ok(diag_power(&diag, p));
    }
    Err(QcoreError::Unsupported {
        operation: format!("Power({})", inner.name()),
        action: "matrix (no eigensolver available for a non-diagonal base; \
                 express the exponent through the closed-form gate registry instead)"
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_inverse_cancels() {
        let op = Operation::Gate(Gate::Rz {
            theta: CalculatorFloat::from("theta"),
        });
        let once = op.clone().inverse().unwrap();
        assert!(matches!(once, Operation::Inverse(_)));
        let twice = once.inverse().unwrap();
        assert_eq!(twice, op);
    }

    #[test]
    fn nested_controls_flatten() {
        let op = Operation::Gate(Gate::X).control(1).unwrap().control(2).unwrap();
        assert_eq!(op, Operation::Control(Box::new(Operation::Gate(Gate::X)), 3));
    }

    #[test]
    fn nested_parallel_flattens() {
        let op = Operation::Gate(Gate::H).parallel(2).unwrap().parallel(3).unwrap();
        assert_eq!(op, Operation::Parallel(6, Box::new(Operation::Gate(Gate::H))));
    }

    #[test]
    fn sqrt_x_is_sx_not_power_node() {
        let half = CalculatorFloat::from(0.5);
        let op = Operation::Gate(Gate::X).power(half).unwrap();
        assert_eq!(op, Operation::Gate(Gate::Sx));
    }

    #[test]
    fn repeat_stays_distinct_from_power() {
        let op = Operation::Gate(Gate::X).repeat(3).unwrap();
        assert!(matches!(op, Operation::Repeat(_, 3)));
        assert_ne!(
            op,
            Operation::Gate(Gate::X)
                .power(CalculatorFloat::from(3.0))
                .unwrap()
        );
    }

    #[test]
    fn measurement_rejects_inverse() {
        let op = Operation::Measurement(Measurement::new(0));
        assert!(matches!(op.inverse(), Err(QcoreError::Unsupported { .. })));
    }
}
