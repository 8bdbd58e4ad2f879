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

//! Decomposition: rewriting an instruction into the next lower
//! representation level.
//!
//! [`decompose_instruction`] expands one instruction by exactly one level:
//! a registered composite gate becomes its constituent gates, `Control`
//! and `Parallel` wrappers are unrolled onto their sub-targets, `Block`
//! and `GateCall` bodies are materialized and remapped onto the calling
//! instruction's targets. An operation with no registered expansion
//! decomposes to itself -- this is what makes [`decompose_completely`]'s
//! fixed-point loop terminate.
//!
//! The Toffoli (`CCX`) decomposition below is the textbook 6-CNOT/T-gate
//! circuit (Nielsen & Chuang, Fig. 4.9): it is exact. The `C3X`
//! decomposition has no ancilla qubit to borrow, so it is realized instead
//! as an `H`-conjugated `C^4 Z`, itself a sum of parity-conditioned `Rz`
//! ladders over the nonempty subsets of its four qubits (see
//! [`decompose_c3x`] for the derivation); this trades the textbook
//! gate-minimal circuit for one verified directly against the Fourier
//! expansion of the all-ones indicator function.

use crate::circuit::Instruction;
use crate::operations::{Block, Gate, Operation, Pauli};
use crate::{QcoreError, Result};
use std::f64::consts::PI;

fn instr(op: Operation, qubits: Vec<usize>) -> Result<Instruction> {
    Instruction::new(op, qubits, vec![], vec![])
}

fn gate(g: Gate, qubits: Vec<usize>) -> Result<Instruction> {
    instr(Operation::Gate(g), qubits)
}

fn lambda(v: f64) -> qoqo_calculator::CalculatorFloat {
    qoqo_calculator::CalculatorFloat::from(v)
}

/// Decomposes a single instruction by one level.
pub fn decompose_instruction(instruction: &Instruction) -> Result<Vec<Instruction>> {
    let qubits = instruction.qubits();
    let bits = instruction.bits();
    match instruction.operation() {
        Operation::Gate(g) => decompose_gate(g, qubits),
        Operation::Inverse(inner) => {
            let inner_instr = Instruction::new(
                (**inner).clone(),
                qubits.to_vec(),
                bits.to_vec(),
                instruction.zvars().to_vec(),
            )?;
            let mut expanded = decompose_instruction(&inner_instr)?;
            for step in &mut expanded {
                *step = Instruction::new(
                    step.operation().clone().inverse()?,
                    step.qubits().to_vec(),
                    step.bits().to_vec(),
                    step.zvars().to_vec(),
                )?;
            }
            expanded.reverse();
            Ok(expanded)
        }
        Operation::Control(inner, n) => decompose_control(inner, *n, qubits),
        Operation::Parallel(n, inner) => {
            let width = inner.num_qubits();
            let bit_width = inner.num_bits();
            let mut result = Vec::new();
            for block_index in 0..*n {
                let sub_qubits = qubits[block_index * width..(block_index + 1) * width].to_vec();
                let sub_bits = bits[block_index * bit_width..(block_index + 1) * bit_width].to_vec();
                let sub_instr = Instruction::new(
                    (**inner).clone(),
                    sub_qubits,
                    sub_bits,
                    instruction.zvars().to_vec(),
                )?;
                result.extend(decompose_instruction(&sub_instr)?);
            }
            Ok(result)
        }
        Operation::Repeat(inner, count) => {
            let sub_instr = Instruction::new(
                (**inner).clone(),
                qubits.to_vec(),
                bits.to_vec(),
                instruction.zvars().to_vec(),
            )?;
            let mut result = Vec::new();
            for _ in 0..*count {
                result.extend(decompose_instruction(&sub_instr)?);
            }
            Ok(result)
        }
        Operation::IfStatement(inner, condition) => {
            let test_width = condition.len();
            let (test_bits, inner_bits) = bits.split_at(test_width);
            let sub_instr = Instruction::new(
                (**inner).clone(),
                qubits.to_vec(),
                inner_bits.to_vec(),
                instruction.zvars().to_vec(),
            )?;
            decompose_instruction(&sub_instr)?
                .into_iter()
                .map(|step| {
                    let mut rebuilt_bits = test_bits.to_vec();
                    rebuilt_bits.extend_from_slice(step.bits());
                    Instruction::new(
                        step.operation().clone().if_statement(condition.clone())?,
                        step.qubits().to_vec(),
                        rebuilt_bits,
                        step.zvars().to_vec(),
                    )
                })
                .collect()
        }
        Operation::Block(b) => b.decompose(qubits, bits),
        Operation::GateCall(decl, params) => {
            let local = decl.instantiate(params)?;
            remap(&local, qubits, bits)
        }
        // Atomic, non-decomposable operations expand to themselves.
        Operation::Measurement(_)
        | Operation::Reset(_)
        | Operation::Barrier(_)
        | Operation::KrausChannel(_)
        | Operation::MixedUnitary(_)
        | Operation::Power(..) => Ok(vec![instruction.clone()]),
    }
}

/// Repeatedly applies [`decompose_instruction`] until no instruction in
/// the result changes (a fixed point), or `max_depth` levels have been
/// unrolled. `CCX` under this function yields exactly its 15 primitive
/// `H`/`T`/`Tdg`/`CX` instructions.
pub fn decompose_completely(instruction: &Instruction, max_depth: usize) -> Result<Vec<Instruction>> {
    let mut current = vec![instruction.clone()];
    for _ in 0..max_depth {
        let mut next = Vec::with_capacity(current.len());
        let mut changed = false;
        for step in &current {
            let expanded = decompose_instruction(step)?;
            if expanded.len() != 1 || &expanded[0] != step {
                changed = true;
            }
            next.extend(expanded);
        }
        current = next;
        if !changed {
            return Ok(current);
        }
    }
    Err(QcoreError::Domain {
        operation: instruction.operation().name(),
        message: format!("decomposition did not reach a fixed point within {max_depth} levels"),
    })
}

fn remap(local: &[Instruction], qubit_targets: &[usize], bit_targets: &[usize]) -> Result<Vec<Instruction>> {
    local
        .iter()
        .map(|i| {
            let q = i.qubits().iter().map(|&q| qubit_targets[q]).collect();
            let b = i.bits().iter().map(|&b| bit_targets[b]).collect();
            Instruction::new(i.operation().clone(), q, b, i.zvars().to_vec())
        })
        .collect()
}

fn decompose_control(inner: &Operation, n: usize, qubits: &[usize]) -> Result<Vec<Instruction>> {
    let (controls, targets) = qubits.split_at(n);
    if let Operation::Gate(g) = inner {
        if let Some(direct) = direct_controlled_gate(g, n) {
            let mut full = controls.to_vec();
            full.extend_from_slice(targets);
            return Ok(vec![gate(direct, full)?]);
        }
    }
    // No registered closed form: fall back to the dense controlled-block
    // unitary as a single Custom-gate instruction. This is a valid, if
    // unenlightening, terminal decomposition -- a real ladder (e.g. via
    // relative-phase Toffolis) is future work.
    let inner_matrix = inner.matrix()?;
    let full_matrix = crate::matrix_utils::controlled_block(&inner_matrix, n as u32);
    let mut full_qubits = controls.to_vec();
    full_qubits.extend_from_slice(targets);
    Ok(vec![gate(Gate::Custom { matrix: full_matrix }, full_qubits)?])
}

/// The controlled-form registry: `(num_controls, inner gate)` pairs that
/// collapse to one of the standard controlled [`Gate`] variants.
fn direct_controlled_gate(inner: &Gate, num_controls: usize) -> Option<Gate> {
    Some(match (num_controls, inner) {
        (1, Gate::X) => Gate::Cx,
        (1, Gate::Y) => Gate::Cy,
        (1, Gate::Z) => Gate::Cz,
        (1, Gate::H) => Gate::Ch,
        (1, Gate::S) => Gate::Cs,
        (1, Gate::Sdg) => Gate::Csdg,
        (1, Gate::Sx) => Gate::Csx,
        (1, Gate::Sxdg) => Gate::Csxdg,
        (1, Gate::P { lambda }) => Gate::Cp { lambda: lambda.clone() },
        (1, Gate::Rx { theta }) => Gate::Crx { theta: theta.clone() },
        (1, Gate::Ry { theta }) => Gate::Cry { theta: theta.clone() },
        (1, Gate::Rz { theta }) => Gate::Crz { theta: theta.clone() },
        (1, Gate::U { theta, phi, lambda, gamma }) => Gate::Cu {
            theta: theta.clone(),
            phi: phi.clone(),
            lambda: lambda.clone(),
            gamma: gamma.clone(),
        },
        (1, Gate::Swap) => Gate::Cswap,
        (2, Gate::X) => Gate::Ccx,
        (3, Gate::X) => Gate::C3x,
        _ => return None,
    })
}

fn decompose_gate(g: &Gate, qubits: &[usize]) -> Result<Vec<Instruction>> {
    match g {
        Gate::Ccx => {
            let (c1, c2, t) = (qubits[0], qubits[1], qubits[2]);
            Ok(vec![
                gate(Gate::H, vec![t])?,
                gate(Gate::Cx, vec![c2, t])?,
                gate(Gate::Tdg, vec![t])?,
                gate(Gate::Cx, vec![c1, t])?,
                gate(Gate::T, vec![t])?,
                gate(Gate::Cx, vec![c2, t])?,
                gate(Gate::Tdg, vec![t])?,
                gate(Gate::Cx, vec![c1, t])?,
                gate(Gate::T, vec![c2])?,
                gate(Gate::T, vec![t])?,
                gate(Gate::H, vec![t])?,
                gate(Gate::Cx, vec![c1, c2])?,
                gate(Gate::T, vec![c1])?,
                gate(Gate::Tdg, vec![c2])?,
                gate(Gate::Cx, vec![c1, c2])?,
            ])
        }
        Gate::Cswap => {
            let (c, t1, t2) = (qubits[0], qubits[1], qubits[2]);
            Ok(vec![
                gate(Gate::Cx, vec![t2, t1])?,
                gate(Gate::Ccx, vec![c, t1, t2])?,
                gate(Gate::Cx, vec![t2, t1])?,
            ])
        }
        Gate::Dcx => Ok(vec![
            gate(Gate::Cx, vec![qubits[0], qubits[1]])?,
            gate(Gate::Cx, vec![qubits[1], qubits[0]])?,
        ]),
        Gate::C3x => Ok(decompose_c3x(qubits)),
        Gate::PhaseGradient { n } => (0..*n)
            .map(|q| gate(Gate::P { lambda: lambda(PI / 2f64.powi(q as i32)) }, vec![qubits[q]]))
            .collect(),
        Gate::Qft { n } => decompose_qft(*n, qubits),
        Gate::GateRnz { n, theta } => Ok(rnz_ladder(&qubits[..*n], theta.clone())),
        Gate::RPauli { pauli_string, theta } => decompose_rpauli(pauli_string, theta.clone(), qubits),

        // Single-qubit standard gates rewrite to the primitive `U`/`P` set
        // (§4.4). The sequences below must be reproduced exactly: the
        // remote backend executes them bit-for-bit.
        Gate::H => Ok(vec![gate(
            Gate::U { theta: lambda(PI / 2.0), phi: lambda(0.0), lambda: lambda(PI), gamma: lambda(0.0) },
            qubits.to_vec(),
        )?]),
        Gate::X => Ok(vec![gate(
            Gate::U { theta: lambda(PI), phi: lambda(0.0), lambda: lambda(PI), gamma: lambda(0.0) },
            qubits.to_vec(),
        )?]),
        Gate::Y => Ok(vec![gate(
            Gate::U {
                theta: lambda(PI),
                phi: lambda(PI / 2.0),
                lambda: lambda(PI / 2.0),
                gamma: lambda(0.0),
            },
            qubits.to_vec(),
        )?]),
        Gate::Z => Ok(vec![gate(Gate::P { lambda: lambda(PI) }, qubits.to_vec())?]),
        Gate::Rx { theta } => Ok(vec![gate(
            Gate::U {
                theta: theta.clone(),
                phi: lambda(-PI / 2.0),
                lambda: lambda(PI / 2.0),
                gamma: lambda(0.0),
            },
            qubits.to_vec(),
        )?]),
        Gate::Ry { theta } => Ok(vec![gate(
            Gate::U { theta: theta.clone(), phi: lambda(0.0), lambda: lambda(0.0), gamma: lambda(0.0) },
            qubits.to_vec(),
        )?]),
        Gate::Rz { theta } => Ok(vec![gate(
            Gate::U {
                theta: lambda(0.0),
                phi: lambda(0.0),
                lambda: theta.clone(),
                gamma: -theta.clone() / 2.0,
            },
            qubits.to_vec(),
        )?]),
        Gate::S => Ok(vec![gate(Gate::U { theta: lambda(0.0), phi: lambda(0.0), lambda: lambda(PI / 2.0), gamma: lambda(0.0) }, qubits.to_vec())?]),
        Gate::Sdg => Ok(vec![gate(Gate::U { theta: lambda(0.0), phi: lambda(0.0), lambda: lambda(-PI / 2.0), gamma: lambda(0.0) }, qubits.to_vec())?]),
        Gate::T => Ok(vec![gate(Gate::U { theta: lambda(0.0), phi: lambda(0.0), lambda: lambda(PI / 4.0), gamma: lambda(0.0) }, qubits.to_vec())?]),
        Gate::Tdg => Ok(vec![gate(Gate::U { theta: lambda(0.0), phi: lambda(0.0), lambda: lambda(-PI / 4.0), gamma: lambda(0.0) }, qubits.to_vec())?]),

        // Two-qubit standard gates expand onto `CX` plus single-qubit
        // basis changes (textbook identities, §4.4).
        Gate::Cy => {
            let (c, t) = (qubits[0], qubits[1]);
            Ok(vec![gate(Gate::Sdg, vec![t])?, gate(Gate::Cx, vec![c, t])?, gate(Gate::S, vec![t])?])
        }
        Gate::Cz => {
            let (c, t) = (qubits[0], qubits[1]);
            Ok(vec![gate(Gate::H, vec![t])?, gate(Gate::Cx, vec![c, t])?, gate(Gate::H, vec![t])?])
        }
        Gate::Ch => {
            let (c, t) = (qubits[0], qubits[1]);
            Ok(vec![
                gate(Gate::Sdg, vec![t])?,
                gate(Gate::H, vec![t])?,
                gate(Gate::Tdg, vec![t])?,
                gate(Gate::Cx, vec![c, t])?,
                gate(Gate::T, vec![t])?,
                gate(Gate::H, vec![t])?,
                gate(Gate::S, vec![t])?,
            ])
        }
        Gate::Cp { lambda: l } => {
            let (c, t) = (qubits[0], qubits[1]);
            Ok(vec![
                gate(Gate::P { lambda: l.clone() * 0.5 }, vec![c])?,
                gate(Gate::Cx, vec![c, t])?,
                gate(Gate::P { lambda: l.clone() * (-0.5) }, vec![t])?,
                gate(Gate::Cx, vec![c, t])?,
                gate(Gate::P { lambda: l.clone() * 0.5 }, vec![t])?,
            ])
        }
        Gate::Swap => {
            let (a, b) = (qubits[0], qubits[1]);
            Ok(vec![
                gate(Gate::Cx, vec![a, b])?,
                gate(Gate::Cx, vec![b, a])?,
                gate(Gate::Cx, vec![a, b])?,
            ])
        }

        // Elementary gates with no further registered expansion (`CX`,
        // `ID`, `Custom`, ...) are already primitive.
        other => Ok(vec![gate(other.clone(), qubits.to_vec())?]),
    }
}

fn decompose_qft(n: usize, qubits: &[usize]) -> Result<Vec<Instruction>> {
    let mut out = Vec::new();
    for i in 0..n {
        out.push(gate(Gate::H, vec![qubits[i]])?);
        for j in (i + 1)..n {
            let angle = PI / 2f64.powi((j - i) as i32);
            out.push(gate(Gate::Cp { lambda: lambda(angle) }, vec![qubits[j], qubits[i]])?);
        }
    }
    for i in 0..(n / 2) {
        out.push(gate(Gate::Swap, vec![qubits[i], qubits[n - 1 - i]])?);
    }
    Ok(out)
}

fn rnz_ladder(qubits: &[usize], theta: qoqo_calculator::CalculatorFloat) -> Vec<Instruction> {
    let n = qubits.len();
    if n == 0 {
        return vec![];
    }
    if n == 1 {
        return vec![gate(Gate::Rz { theta }, vec![qubits[0]]).expect("single-qubit Rz is always valid")];
    }
    let mut out = Vec::new();
    for i in 0..(n - 1) {
        out.push(gate(Gate::Cx, vec![qubits[i], qubits[i + 1]]).expect("CX targets are distinct"));
    }
    out.push(gate(Gate::Rz { theta }, vec![qubits[n - 1]]).expect("single-qubit Rz is always valid"));
    for i in (0..(n - 1)).rev() {
        out.push(gate(Gate::Cx, vec![qubits[i], qubits[i + 1]]).expect("CX targets are distinct"));
    }
    out
}

/// `C3X` has no ancilla qubit to borrow, so the usual 2-Toffoli-with-a-
/// dirty-qubit trick is unavailable; this realizes it as `H`-conjugated
/// `C^4 Z`, and `C^4 Z` as a product of parity-conditioned `Rz` ladders,
/// one per nonempty subset of the four qubits.
///
/// `diag(1,-1)` on the all-ones basis state equals `e^{i pi x0 x1 x2 x3}`,
/// and expanding each `x_i = (1 - z_i)/2` (`z_i = (-1)^{x_i}`) gives
/// `x0 x1 x2 x3 = (1/16) sum_S (-1)^|S| (-1)^parity_S(x)` over all 16
/// subsets `S` of the four qubits, `parity_S` being the XOR of the bits in
/// `S`. Each nonempty-`S` term becomes an `Rz(theta_S)` ladder on `S`
/// (`theta_S = +pi/8` for odd `|S|`, `-pi/8` for even `|S|`, matching
/// `rnz_ladder`'s `exp(-i theta/2 (-1)^parity)` convention); the `S = {}`
/// term is a constant `e^{-i pi/16}` that a trailing `GPhase(pi/16)`
/// cancels. All 15 terms are diagonal and commute, so their order doesn't
/// matter. `t` is the target (last qubit); conjugating with `H(t)` turns
/// the `Z` on the all-controls-set subspace into an `X`.
fn decompose_c3x(qubits: &[usize]) -> Vec<Instruction> {
    let t = qubits[3];
    let mut out = vec![gate(Gate::H, vec![t]).expect("single-qubit H is always valid")];
    for mask in 1u8..16 {
        let subset: Vec<usize> = (0..4).filter(|i| mask & (1 << i) != 0).map(|i| qubits[i]).collect();
        let theta = if subset.len() % 2 == 1 { PI / 8.0 } else { -PI / 8.0 };
        out.extend(rnz_ladder(&subset, lambda(theta)));
    }
    out.push(
        gate(Gate::GPhase { n: 4, lambda: lambda(PI / 16.0) }, qubits.to_vec())
            .expect("GPhase on all four targets is always valid"),
    );
    out.push(gate(Gate::H, vec![t]).expect("single-qubit H is always valid"));
    out
}

fn decompose_rpauli(
    pauli_string: &[Pauli],
    theta: qoqo_calculator::CalculatorFloat,
    qubits: &[usize],
) -> Result<Vec<Instruction>> {
    let active: Vec<usize> = pauli_string
        .iter()
        .enumerate()
        .filter(|(_, p)| **p != Pauli::I)
        .map(|(i, _)| i)
        .collect();
    if active.is_empty() {
        return Ok(vec![gate(
            Gate::GPhase { n: qubits.len(), lambda: -theta },
            qubits.to_vec(),
        )?]);
    }
    let mut out = Vec::new();
    for &i in &active {
        match pauli_string[i] {
            Pauli::X => out.push(gate(Gate::H, vec![qubits[i]])?),
            Pauli::Y => out.push(gate(Gate::Hyz, vec![qubits[i]])?),
            Pauli::Z | Pauli::I => {}
        }
    }
    let active_qubits: Vec<usize> = active.iter().map(|&i| qubits[i]).collect();
    out.extend(rnz_ladder(&active_qubits, theta));
    for &i in &active {
        match pauli_string[i] {
            Pauli::X => out.push(gate(Gate::H, vec![qubits[i]])?),
            Pauli::Y => out.push(gate(Gate::Hyz, vec![qubits[i]])?),
            Pauli::Z | Pauli::I => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::matrix_utils::is_unitary;

    #[test]
    fn ccx_decomposes_to_fifteen_instructions() {
        let instruction = gate(Gate::Ccx, vec![0, 1, 2]).unwrap();
        let expanded = decompose_completely(&instruction, 8).unwrap();
        assert_eq!(expanded.len(), 15);
        assert!(expanded.iter().all(|i| matches!(i.operation(), Operation::Gate(_))));
    }

    #[test]
    fn cswap_first_level_uses_one_toffoli() {
        let instruction = gate(Gate::Cswap, vec![0, 1, 2]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[1].operation(), &Operation::Gate(Gate::Ccx));
    }

    #[test]
    fn control_of_x_is_cx() {
        let op = Operation::Gate(Gate::X).control(1).unwrap();
        let instruction = Instruction::new(op, vec![0, 1], vec![], vec![]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        assert_eq!(expanded, vec![gate(Gate::Cx, vec![0, 1]).unwrap()]);
    }

    #[test]
    fn phase_gradient_is_unitary_and_diagonal() {
        let g = Gate::PhaseGradient { n: 3 };
        let m = g.matrix().unwrap();
        assert!(is_unitary(&m, 1e-8));
    }

    #[test]
    fn qft_decomposition_is_reversible_length() {
        let instruction = gate(Gate::Qft { n: 3 }, vec![0, 1, 2]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        // 3 Hadamards + 3 controlled phases + 1 swap.
        assert_eq!(expanded.len(), 3 + 3 + 1);
    }

    #[test]
    fn atomic_gate_decomposes_to_itself() {
        let instruction = gate(Gate::Cx, vec![0, 1]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        assert_eq!(expanded, vec![instruction]);
    }

    #[test]
    fn hadamard_decomposes_to_u() {
        let instruction = gate(Gate::H, vec![0]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        assert_eq!(
            expanded,
            vec![gate(
                Gate::U {
                    theta: lambda(PI / 2.0),
                    phi: lambda(0.0),
                    lambda: lambda(PI),
                    gamma: lambda(0.0),
                },
                vec![0],
            )
            .unwrap()]
        );
    }

    #[test]
    fn bell_pair_decomposes_per_s1() {
        let mut circuit = Circuit::new();
        circuit.push(gate(Gate::H, vec![0]).unwrap());
        circuit.push(gate(Gate::Cx, vec![0, 1]).unwrap());
        let expanded: Vec<Instruction> = circuit
            .iter()
            .map(decompose_instruction)
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(expanded.len(), 2);
        assert!(matches!(
            expanded[0].operation(),
            Operation::Gate(Gate::U { .. })
        ));
        assert_eq!(expanded[1], gate(Gate::Cx, vec![0, 1]).unwrap());
    }

    #[test]
    fn cz_decomposes_via_hadamard_sandwich() {
        let instruction = gate(Gate::Cz, vec![0, 1]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0], gate(Gate::H, vec![1]).unwrap());
        assert_eq!(expanded[1], gate(Gate::Cx, vec![0, 1]).unwrap());
        assert_eq!(expanded[2], gate(Gate::H, vec![1]).unwrap());
    }

    #[test]
    fn swap_decomposes_to_three_cx() {
        let instruction = gate(Gate::Swap, vec![0, 1]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        assert_eq!(
            expanded,
            vec![
                gate(Gate::Cx, vec![0, 1]).unwrap(),
                gate(Gate::Cx, vec![1, 0]).unwrap(),
                gate(Gate::Cx, vec![0, 1]).unwrap(),
            ]
        );
    }

    /// Embeds a `targets.len()`-qubit operator into the full `n`-qubit
    /// space, qubit 0 as the most significant bit (matching
    /// `matrix_utils::controlled_block`'s convention).
    fn embed(op: &ndarray::Array2<num_complex::Complex64>, targets: &[usize], n: usize) -> ndarray::Array2<num_complex::Complex64> {
        let dim = 1usize << n;
        let others: Vec<usize> = (0..n).filter(|q| !targets.contains(q)).collect();
        let bit = |x: usize, q: usize| (x >> (n - 1 - q)) & 1 == 1;
        let sub_index = |x: usize| -> usize {
            targets.iter().fold(0usize, |acc, &q| (acc << 1) | (bit(x, q) as usize))
        };
        ndarray::Array2::from_shape_fn((dim, dim), |(i, j)| {
            let others_match = others.iter().all(|&q| bit(i, q) == bit(j, q));
            if others_match {
                op[(sub_index(i), sub_index(j))]
            } else {
                num_complex::Complex64::new(0.0, 0.0)
            }
        })
    }

    fn compose_matrix(instructions: &[Instruction], n: usize) -> ndarray::Array2<num_complex::Complex64> {
        let mut total = crate::matrix_utils::identity(1usize << n);
        for instr in instructions {
            let op_matrix = instr.operation().matrix().unwrap();
            let embedded = embed(&op_matrix, instr.qubits(), n);
            total = embedded.dot(&total);
        }
        total
    }

    #[test]
    fn c3x_decomposition_matches_direct_matrix() {
        let instruction = gate(Gate::C3x, vec![0, 1, 2, 3]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        let composed = compose_matrix(&expanded, 4);
        let direct = Gate::C3x.matrix().unwrap();
        for i in 0..16 {
            for j in 0..16 {
                assert!(
                    (composed[(i, j)] - direct[(i, j)]).norm() < 1e-8,
                    "mismatch at ({i}, {j}): {} vs {}",
                    composed[(i, j)],
                    direct[(i, j)]
                );
            }
        }
    }

    #[test]
    fn ccx_decomposition_matches_direct_matrix() {
        let instruction = gate(Gate::Ccx, vec![0, 1, 2]).unwrap();
        let expanded = decompose_instruction(&instruction).unwrap();
        let composed = compose_matrix(&expanded, 3);
        let direct = Gate::Ccx.matrix().unwrap();
        for i in 0..8 {
            for j in 0..8 {
                assert!((composed[(i, j)] - direct[(i, j)]).norm() < 1e-8);
            }
        }
    }
}
