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

//! Projective measurement, reset and barrier operations. None of these are
//! unitary, so they never support `inverse`/`power`/`control`/`parallel` --
//! attempting any of those fails with [`crate::QcoreError::Unsupported`] in
//! [`super::Operation`]'s dispatch.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Projective measurement of a single qubit into a single classical bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Measurement {
    qubit_hint: usize,
}

impl Measurement {
    /// Builds a measurement. `qubit_hint` is only used for display; the
    /// actual qubit/bit targets live on the containing instruction.
    pub fn new(qubit_hint: usize) -> Self {
        Measurement { qubit_hint }
    }

    /// The qubit index this measurement was constructed for.
    pub fn qubit_hint(&self) -> usize {
        self.qubit_hint
    }
}

/// Resets a single qubit to `|0>`, discarding its prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Reset;

/// A scheduling barrier spanning `n` qubits. Transformation passes must
/// never reorder or fuse operations across a `Barrier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Barrier {
    n: usize,
}

impl Barrier {
    /// Builds a barrier spanning `n` qubits.
    pub fn new(n: usize) -> Self {
        Barrier { n }
    }

    /// Number of qubits the barrier spans.
    pub fn num_qubits(&self) -> usize {
        self.n
    }
}

/// Named measurement/reset templates built out of a basis change plus a
/// primitive [`Measurement`] or [`Reset`], as fixed by the gate set's
/// basis-change conventions (§4.4, §4.8).
pub mod templates {
    use crate::bit_string::{BitString, Endianness};
    use crate::circuit::{Circuit, Instruction};
    use crate::operations::{Gate, Measurement, Operation};
    use crate::Result;

    fn basis_change(gate: Gate, qubit: usize, bit: usize, circuit: &mut Circuit) -> Result<()> {
        circuit.push(Instruction::new(Operation::Gate(gate), vec![qubit], vec![], vec![])?);
        let _ = bit;
        Ok(())
    }

    /// `MeasureX = H; Measure; H`: measures `qubit` into `bit` in the X basis.
    pub fn measure_x(qubit: usize, bit: usize) -> Result<Circuit> {
        let mut circuit = Circuit::new();
        basis_change(Gate::H, qubit, bit, &mut circuit)?;
        circuit.push(Instruction::new(
            Operation::Measurement(Measurement::new(qubit)),
            vec![qubit],
            vec![bit],
            vec![],
        )?);
        basis_change(Gate::H, qubit, bit, &mut circuit)?;
        Ok(circuit)
    }

    /// `MeasureY = HYZ; Measure; HYZ`: measures `qubit` into `bit` in the Y basis.
    pub fn measure_y(qubit: usize, bit: usize) -> Result<Circuit> {
        let mut circuit = Circuit::new();
        basis_change(Gate::Hyz, qubit, bit, &mut circuit)?;
        circuit.push(Instruction::new(
            Operation::Measurement(Measurement::new(qubit)),
            vec![qubit],
            vec![bit],
            vec![],
        )?);
        basis_change(Gate::Hyz, qubit, bit, &mut circuit)?;
        Ok(circuit)
    }

    /// `MeasureZ` is an alias for the primitive Z-basis [`Measurement`].
    pub fn measure_z(qubit: usize, bit: usize) -> Result<Circuit> {
        let mut circuit = Circuit::new();
        circuit.push(Instruction::new(
            Operation::Measurement(Measurement::new(qubit)),
            vec![qubit],
            vec![bit],
            vec![],
        )?);
        Ok(circuit)
    }

    /// `MeasureReset = Measure; If(bit==1) X`: measures `qubit` into `bit`,
    /// then flips it back to `|0>` if the outcome was `1`.
    pub fn measure_reset(qubit: usize, bit: usize) -> Result<Circuit> {
        let mut circuit = measure_z(qubit, bit)?;
        let condition = BitString::from_int(1, 1, Endianness::Big)?;
        circuit.push(Instruction::new(
            Operation::Gate(Gate::X).if_statement(condition)?,
            vec![qubit],
            vec![bit],
            vec![],
        )?);
        Ok(circuit)
    }

    /// `MeasureResetX = H; MeasureReset; H`.
    pub fn measure_reset_x(qubit: usize, bit: usize) -> Result<Circuit> {
        let mut circuit = Circuit::new();
        basis_change(Gate::H, qubit, bit, &mut circuit)?;
        for instruction in measure_reset(qubit, bit)? {
            circuit.push(instruction);
        }
        basis_change(Gate::H, qubit, bit, &mut circuit)?;
        Ok(circuit)
    }

    /// `MeasureResetY = HYZ; MeasureReset; HYZ`.
    pub fn measure_reset_y(qubit: usize, bit: usize) -> Result<Circuit> {
        let mut circuit = Circuit::new();
        basis_change(Gate::Hyz, qubit, bit, &mut circuit)?;
        for instruction in measure_reset(qubit, bit)? {
            circuit.push(instruction);
        }
        basis_change(Gate::Hyz, qubit, bit, &mut circuit)?;
        Ok(circuit)
    }

    fn measure_parity(
        basis_gate: Option<Gate>,
        qubits: (usize, usize),
        bits: (usize, usize),
    ) -> Result<Circuit> {
        let mut circuit = Circuit::new();
        if let Some(gate) = basis_gate {
            basis_change(gate, qubits.0, bits.0, &mut circuit)?;
            basis_change(gate, qubits.1, bits.1, &mut circuit)?;
        }
        circuit.push(Instruction::new(
            Operation::Measurement(Measurement::new(qubits.0)),
            vec![qubits.0],
            vec![bits.0],
            vec![],
        )?);
        circuit.push(Instruction::new(
            Operation::Measurement(Measurement::new(qubits.1)),
            vec![qubits.1],
            vec![bits.1],
            vec![],
        )?);
        if let Some(gate) = basis_gate {
            basis_change(gate, qubits.0, bits.0, &mut circuit)?;
            basis_change(gate, qubits.1, bits.1, &mut circuit)?;
        }
        Ok(circuit)
    }

    /// `MeasureXX`: basis-change to X on both qubits, measure each, undo.
    pub fn measure_xx(qubits: (usize, usize), bits: (usize, usize)) -> Result<Circuit> {
        measure_parity(Some(Gate::H), qubits, bits)
    }

    /// `MeasureYY`: basis-change to Y on both qubits, measure each, undo.
    pub fn measure_yy(qubits: (usize, usize), bits: (usize, usize)) -> Result<Circuit> {
        measure_parity(Some(Gate::Hyz), qubits, bits)
    }

    /// `MeasureZZ`: measure both qubits directly in the Z basis.
    pub fn measure_zz(qubits: (usize, usize), bits: (usize, usize)) -> Result<Circuit> {
        measure_parity(None, qubits, bits)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn measure_x_sandwiches_measurement_in_hadamards() {
            let circuit = measure_x(0, 0).unwrap();
            assert_eq!(circuit.len(), 3);
            assert_eq!(
                *circuit.instructions()[0].operation(),
                Operation::Gate(Gate::H)
            );
            assert!(matches!(
                circuit.instructions()[1].operation(),
                Operation::Measurement(_)
            ));
            assert_eq!(
                *circuit.instructions()[2].operation(),
                Operation::Gate(Gate::H)
            );
        }

        #[test]
        fn measure_reset_appends_conditional_x() {
            let circuit = measure_reset(0, 0).unwrap();
            assert_eq!(circuit.len(), 2);
            assert!(matches!(
                circuit.instructions()[1].operation(),
                Operation::IfStatement(inner, _) if matches!(**inner, Operation::Gate(Gate::X))
            ));
        }

        #[test]
        fn measure_zz_has_no_basis_change() {
            let circuit = measure_zz((0, 1), (0, 1)).unwrap();
            assert_eq!(circuit.len(), 2);
            assert!(circuit
                .instructions()
                .iter()
                .all(|i| matches!(i.operation(), Operation::Measurement(_))));
        }

        #[test]
        fn measure_yy_sandwiches_both_qubits_in_hyz() {
            let circuit = measure_yy((0, 1), (0, 1)).unwrap();
            assert_eq!(circuit.len(), 6);
            assert_eq!(
                *circuit.instructions()[0].operation(),
                Operation::Gate(Gate::Hyz)
            );
            assert_eq!(
                *circuit.instructions()[1].operation(),
                Operation::Gate(Gate::Hyz)
            );
        }
    }
}
