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

//! Reusable sub-circuits ([`Block`]) and parametric gate declarations
//! ([`GateDecl`], invoked via `Operation::GateCall`).
//!
//! A `Block` is a fixed list of instructions with its own local qubit/bit
//! numbering; `decompose` remaps that local numbering onto the global
//! targets supplied by the containing instruction. A `GateDecl` is a named
//! family of instructions generated from bound parameters -- it is a
//! closure rather than a fixed instruction list so that binding parameters
//! needs no symbolic-substitution machinery: `instantiate` just calls the
//! closure with the caller's numeric/symbolic arguments.

use crate::circuit::Instruction;
use crate::matrix_utils::identity;
use crate::{QcoreError, Result};
use ndarray::Array2;
use num_complex::Complex64;
use qoqo_calculator::CalculatorFloat;
use std::sync::Arc;

/// A reusable, named sub-circuit with its own local qubit/bit numbering.
///
/// Two `Block`s with identical contents compare equal; process-stable
/// identity (used by the SWAP-elimination memoization cache) is tracked
/// separately via the enclosing `Arc`'s pointer address, not by this
/// struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    name: String,
    num_qubits: usize,
    num_bits: usize,
    instructions: Vec<Instruction>,
}

impl Block {
    /// Builds a block, inferring its qubit/bit arity from the maximum
    /// target index used by `instructions` (zero if there are none).
    pub fn new(name: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        let num_qubits = instructions
            .iter()
            .flat_map(|i| i.qubits().iter().copied())
            .map(|q| q + 1)
            .max()
            .unwrap_or(0);
        let num_bits = instructions
            .iter()
            .flat_map(|i| i.bits().iter().copied())
            .map(|b| b + 1)
            .max()
            .unwrap_or(0);
        Block {
            name: name.into(),
            num_qubits,
            num_bits,
            instructions,
        }
    }

    /// Builds a block with an explicit arity, wider than what the
    /// instructions alone would need (e.g. trailing idle qubits). Fails
    /// with [`QcoreError::Arity`] if any instruction targets an index
    /// outside `[0, num_qubits)` or `[0, num_bits)`.
    pub fn new_with_arity(
        name: impl Into<String>,
        num_qubits: usize,
        num_bits: usize,
        instructions: Vec<Instruction>,
    ) -> Result<Self> {
        for instr in &instructions {
            if let Some(&bad) = instr.qubits().iter().find(|&&q| q >= num_qubits) {
                return Err(QcoreError::Arity {
                    operation: "Block".to_string(),
                    message: format!("qubit target {bad} outside declared width {num_qubits}"),
                });
            }
            if let Some(&bad) = instr.bits().iter().find(|&&b| b >= num_bits) {
                return Err(QcoreError::Arity {
                    operation: "Block".to_string(),
                    message: format!("bit target {bad} outside declared width {num_bits}"),
                });
            }
        }
        Ok(Block {
            name: name.into(),
            num_qubits,
            num_bits,
            instructions,
        })
    }

    /// The block's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of (local) qubits the block is declared over.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of (local) classical bits the block is declared over.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// The block's instructions, in local numbering.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Whether any instruction in the block has a symbolic parameter.
    pub fn is_symbolic(&self) -> bool {
        self.instructions.iter().any(|i| i.operation().is_symbolic())
    }

    /// Remaps the block's local instructions onto global targets.
    /// `qubit_targets[i]`/`bit_targets[i]` is the global index bound to
    /// local index `i`. Fails with [`QcoreError::Arity`] if the binding
    /// arrays don't match the block's declared width.
    pub fn decompose(&self, qubit_targets: &[usize], bit_targets: &[usize]) -> Result<Vec<Instruction>> {
        if qubit_targets.len() != self.num_qubits {
            return Err(QcoreError::Arity {
                operation: format!("Block({})", self.name),
                message: format!(
                    "expected {} qubit targets, got {}",
                    self.num_qubits,
                    qubit_targets.len()
                ),
            });
        }
        if bit_targets.len() != self.num_bits {
            return Err(QcoreError::Arity {
                operation: format!("Block({})", self.name),
                message: format!(
                    "expected {} bit targets, got {}",
                    self.num_bits,
                    bit_targets.len()
                ),
            });
        }
        self.instructions
            .iter()
            .map(|instr| {
                let remapped_qubits = instr.qubits().iter().map(|&q| qubit_targets[q]).collect();
                let remapped_bits = instr.bits().iter().map(|&b| bit_targets[b]).collect();
                Instruction::new(
                    instr.operation().clone(),
                    remapped_qubits,
                    remapped_bits,
                    instr.zvars().to_vec(),
                )
            })
            .collect()
    }
}

/// A named, parametric family of instructions, invoked through
/// `Operation::GateCall`.
///
/// The body is a closure rather than a fixed instruction list: binding the
/// declaration's formal parameters to concrete [`CalculatorFloat`]
/// arguments is just a function call, so no symbolic-substitution engine
/// is needed for `GateCall` to materialize a body.
#[derive(Clone)]
pub struct GateDecl {
    name: String,
    num_qubits: usize,
    num_bits: usize,
    parnames: Vec<String>,
    body: Arc<dyn Fn(&[CalculatorFloat]) -> Result<Vec<Instruction>> + Send + Sync>,
}

impl GateDecl {
    /// Declares a parametric gate family. `body` is called with the bound
    /// parameter values, in the order of `parnames`, and must return the
    /// instruction list of the gate's definition for those values.
    pub fn new(
        name: impl Into<String>,
        num_qubits: usize,
        num_bits: usize,
        parnames: Vec<String>,
        body: impl Fn(&[CalculatorFloat]) -> Result<Vec<Instruction>> + Send + Sync + 'static,
    ) -> Self {
        GateDecl {
            name: name.into(),
            num_qubits,
            num_bits,
            parnames,
            body: Arc::new(body),
        }
    }

    /// The declaration's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of qubits a call to this declaration must target.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of classical bits a call to this declaration must target.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Names of the formal parameters, in binding order.
    pub fn parnames(&self) -> &[String] {
        &self.parnames
    }

    /// Materializes the declaration's body for the given bound parameters.
    /// Fails with [`QcoreError::Arity`] if `params.len() != parnames.len()`.
    pub fn instantiate(&self, params: &[CalculatorFloat]) -> Result<Vec<Instruction>> {
        if params.len() != self.parnames.len() {
            return Err(QcoreError::Arity {
                operation: format!("GateCall({})", self.name),
                message: format!(
                    "expected {} parameters, got {}",
                    self.parnames.len(),
                    params.len()
                ),
            });
        }
        (self.body)(params)
    }

    /// The dense unitary matrix of a call with the given bound parameters,
    /// obtained by composing the instantiated body's operations in order.
    /// Fails with [`QcoreError::Unsupported`] if the body contains an
    /// instruction with classical (bit/z-var) targets.
    pub fn matrix(&self, params: &[CalculatorFloat]) -> Result<Array2<Complex64>> {
        let instructions = self.instantiate(params)?;
        let mut total = identity(1usize << self.num_qubits);
        for instr in &instructions {
            if !instr.bits().is_empty() || !instr.zvars().is_empty() {
                return Err(QcoreError::Unsupported {
                    operation: format!("GateCall({})", self.name),
                    action: "matrix (body has classical targets)".to_string(),
                });
            }
            let op_matrix = instr.operation().matrix()?;
            let embedded = embed_matrix(&op_matrix, instr.qubits(), self.num_qubits);
            total = embedded.dot(&total);
        }
        Ok(total)
    }
}

impl std::fmt::Debug for GateDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateDecl")
            .field("name", &self.name)
            .field("num_qubits", &self.num_qubits)
            .field("num_bits", &self.num_bits)
            .field("parnames", &self.parnames)
            .finish()
    }
}

impl PartialEq for GateDecl {
    /// Two declarations are equal iff they share the same body closure
    /// (i.e. one was cloned from the other), matching the reference
    /// implementation's `id(self)`-based identity for gate declarations.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

/// Embeds an operation's matrix, acting on `targets` within an `n`-qubit
/// register, into the full `2^n x 2^n` unitary (identity on all other
/// qubits). Qubit `0` is the most significant bit, consistent with
/// [`crate::bit_string::BitString`]'s big-endian convention.
pub(crate) fn embed_matrix(
    op: &Array2<Complex64>,
    targets: &[usize],
    n: usize,
) -> Array2<Complex64> {
    let dim = 1usize << n;
    let others: Vec<usize> = (0..n).filter(|q| !targets.contains(q)).collect();
    let bit = |x: usize, q: usize| (x >> (n - 1 - q)) & 1 == 1;
    let sub_index = |x: usize| -> usize {
        targets
            .iter()
            .fold(0usize, |acc, &q| (acc << 1) | (bit(x, q) as usize))
    };
    Array2::from_shape_fn((dim, dim), |(i, j)| {
        let others_match = others.iter().all(|&q| bit(i, q) == bit(j, q));
        if others_match {
            op[(sub_index(i), sub_index(j))]
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{Gate, Operation};

    fn cx_instruction() -> Instruction {
        Instruction::new(Operation::Gate(Gate::X), vec![0], vec![], vec![]).unwrap()
    }

    #[test]
    fn block_infers_arity() {
        let block = Block::new("flip", vec![cx_instruction()]);
        assert_eq!(block.num_qubits(), 1);
        assert_eq!(block.num_bits(), 0);
    }

    #[test]
    fn block_decompose_remaps_targets() {
        let block = Block::new("flip", vec![cx_instruction()]);
        let remapped = block.decompose(&[5], &[]).unwrap();
        assert_eq!(remapped[0].qubits(), &[5]);
    }

    #[test]
    fn gate_decl_instantiate_checks_arity() {
        let decl = GateDecl::new("rot2", 1, 0, vec!["theta".to_string()], |params| {
            Ok(vec![Instruction::new(
                Operation::Gate(Gate::Rz {
                    theta: params[0].clone(),
                }),
                vec![0],
                vec![],
                vec![],
            )?])
        });
        assert!(decl.instantiate(&[]).is_err());
        let instantiated = decl
            .instantiate(&[CalculatorFloat::from(1.0)])
            .unwrap();
        assert_eq!(instantiated.len(), 1);
    }

    #[test]
    fn gate_decl_matrix_matches_gate() {
        let decl = GateDecl::new("flip", 1, 0, vec![], |_| {
            Ok(vec![Instruction::new(
                Operation::Gate(Gate::X),
                vec![0],
                vec![],
                vec![],
            )?])
        });
        let m = decl.matrix(&[]).unwrap();
        assert_eq!(m, Gate::X.matrix().unwrap());
    }
}
