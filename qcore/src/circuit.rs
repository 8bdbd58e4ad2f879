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

//! The ordered instruction container.
//!
//! An [`Instruction`] pairs an [`Operation`] with the qubit, bit and
//! z-variable indices it acts on; a [`Circuit`] is simply an ordered list
//! of instructions. Target validation happens eagerly in
//! [`Instruction::new`]: arity must match the operation, and no target
//! tuple may contain a duplicate index. Negative indices cannot occur
//! (`usize`), so the "non-negative" requirement is enforced by the type
//! itself.

use crate::operations::Operation;
use crate::{QcoreError, Result};

/// A single operation together with the concrete targets it acts on.
///
/// `Instruction` and `Circuit` are not `serde`-derived: `Operation` can
/// carry a `GateCall` closure body, which has no data representation.
/// [`crate::serialization`] implements the binary wire format by walking
/// the operation tree explicitly instead, failing on the handful of
/// variants that cannot round-trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    operation: Operation,
    qubits: Vec<usize>,
    bits: Vec<usize>,
    zvars: Vec<usize>,
}

fn check_targets(operation: &Operation, kind: &str, targets: &[usize], expected: usize) -> Result<()> {
    if targets.len() != expected {
        return Err(QcoreError::Arity {
            operation: operation.name(),
            message: format!(
                "expected {expected} {kind} target(s), got {}",
                targets.len()
            ),
        });
    }
    let mut seen = std::collections::HashSet::new();
    for &t in targets {
        if !seen.insert(t) {
            return Err(QcoreError::Arity {
                operation: operation.name(),
                message: format!("duplicate {kind} target {t}"),
            });
        }
    }
    Ok(())
}

impl Instruction {
    /// Builds an instruction, validating that the target tuples match the
    /// operation's declared arity and contain no duplicates.
    pub fn new(
        operation: Operation,
        qubits: Vec<usize>,
        bits: Vec<usize>,
        zvars: Vec<usize>,
    ) -> Result<Self> {
        check_targets(&operation, "qubit", &qubits, operation.num_qubits())?;
        check_targets(&operation, "bit", &bits, operation.num_bits())?;
        // z-variables are free-form indices into the z-register rather
        // than a fixed-arity operation target, so only uniqueness is
        // enforced here.
        let mut seen = std::collections::HashSet::new();
        for &z in &zvars {
            if !seen.insert(z) {
                return Err(QcoreError::Arity {
                    operation: operation.name(),
                    message: format!("duplicate z-variable target {z}"),
                });
            }
        }
        Ok(Instruction {
            operation,
            qubits,
            bits,
            zvars,
        })
    }

    /// The wrapped operation.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Qubit targets, in the operation's expected order.
    pub fn qubits(&self) -> &[usize] {
        &self.qubits
    }

    /// Classical bit targets, in the operation's expected order.
    pub fn bits(&self) -> &[usize] {
        &self.bits
    }

    /// Z-variable targets.
    pub fn zvars(&self) -> &[usize] {
        &self.zvars
    }

    /// Whether the instruction's operation has any symbolic parameter.
    pub fn is_symbolic(&self) -> bool {
        self.operation.is_symbolic()
    }
}

/// An ordered list of instructions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Circuit {
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// An empty circuit.
    pub fn new() -> Self {
        Circuit::default()
    }

    /// Appends an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the circuit has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The circuit's instructions, in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Iterator over the circuit's instructions.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// One past the highest qubit index targeted by any instruction (`0`
    /// for an empty circuit or a circuit touching no qubits).
    pub fn num_qubits(&self) -> usize {
        self.instructions
            .iter()
            .flat_map(|i| i.qubits().iter().copied())
            .map(|q| q + 1)
            .max()
            .unwrap_or(0)
    }

    /// One past the highest classical bit index targeted by any
    /// instruction.
    pub fn num_bits(&self) -> usize {
        self.instructions
            .iter()
            .flat_map(|i| i.bits().iter().copied())
            .map(|b| b + 1)
            .max()
            .unwrap_or(0)
    }

    /// One past the highest z-variable index targeted by any instruction.
    pub fn num_zvars(&self) -> usize {
        self.instructions
            .iter()
            .flat_map(|i| i.zvars().iter().copied())
            .map(|z| z + 1)
            .max()
            .unwrap_or(0)
    }

    /// Whether any instruction has a symbolic parameter.
    pub fn is_symbolic(&self) -> bool {
        self.instructions.iter().any(|i| i.is_symbolic())
    }
}

impl FromIterator<Instruction> for Circuit {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Circuit {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Circuit {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}

impl std::ops::AddAssign<Instruction> for Circuit {
    fn add_assign(&mut self, rhs: Instruction) {
        self.push(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Gate;

    #[test]
    fn instruction_rejects_arity_mismatch() {
        let result = Instruction::new(Operation::Gate(Gate::Cx), vec![0], vec![], vec![]);
        assert!(matches!(result, Err(QcoreError::Arity { .. })));
    }

    #[test]
    fn instruction_rejects_duplicate_targets() {
        let result = Instruction::new(Operation::Gate(Gate::Cx), vec![0, 0], vec![], vec![]);
        assert!(matches!(result, Err(QcoreError::Arity { .. })));
    }

    #[test]
    fn circuit_tracks_derived_widths() {
        let mut circuit = Circuit::new();
        circuit += Instruction::new(Operation::Gate(Gate::H), vec![0], vec![], vec![]).unwrap();
        circuit += Instruction::new(Operation::Gate(Gate::Cx), vec![0, 2], vec![], vec![]).unwrap();
        circuit += Instruction::new(
            Operation::Measurement(crate::operations::Measurement::new(2)),
            vec![2],
            vec![1],
            vec![],
        )
        .unwrap();
        assert_eq!(circuit.num_qubits(), 3);
        assert_eq!(circuit.num_bits(), 2);
        assert_eq!(circuit.len(), 3);
    }

    #[test]
    fn bell_pair_is_not_symbolic() {
        let mut circuit = Circuit::new();
        circuit += Instruction::new(Operation::Gate(Gate::H), vec![0], vec![], vec![]).unwrap();
        circuit += Instruction::new(Operation::Gate(Gate::Cx), vec![0, 1], vec![], vec![]).unwrap();
        assert!(!circuit.is_symbolic());
    }
}
