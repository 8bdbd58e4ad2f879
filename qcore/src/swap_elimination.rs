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

//! SWAP elimination: rewires a circuit so that `SWAP` gates disappear by
//! relabeling the qubit indices of every instruction that follows them,
//! instead of executing the exchange on hardware.
//!
//! Walking the instruction stream left to right, a running permutation
//! `perm` tracks "the wire that now physically carries the data
//! originally on wire `q`". Every instruction's qubit targets are rewired
//! through `perm` before being emitted; a `SWAP(a, b)` updates `perm` by
//! exchanging the two wires it currently maps to `a` and `b` and is then
//! dropped rather than emitted.
//!
//! Composite operations (`Block`, `GateCall`, and `Control`/`Inverse`/
//! `IfStatement` wrapping either) are rewired recursively: the nested
//! operation gets its own local permutation, which is then composed back
//! into the outer `perm` at the instruction's own target slots, so a SWAP
//! buried inside a reusable sub-circuit still cancels against gates that
//! follow the sub-circuit call at the top level. `Block`s and `GateDecl`s
//! are rewired once each and memoized by `Arc` identity, so a definition
//! referenced from several call sites is only processed once and every
//! reference keeps sharing that identity afterwards.
//!
//! The final `perm` this pass returns is the net relabeling left over
//! after all eliminated swaps: any consumer that cares which physical
//! wire now holds which original qubit's data (e.g. a final readout map)
//! must consult it, since the returned circuit does not append
//! compensating swaps to restore the identity labeling on its own.

use crate::circuit::{Circuit, Instruction};
use crate::operations::{Block, Gate, GateDecl, Operation};
use crate::Result;
use qoqo_calculator::CalculatorFloat;
use std::collections::HashMap;
use std::sync::Arc;

/// Memoizes rewired `Block`/`GateDecl` definitions by `Arc` identity, each
/// paired with the local permutation left over from rewiring its body.
#[derive(Default)]
struct SwapCache {
    blocks: HashMap<usize, (Arc<Block>, Vec<usize>)>,
    gate_decls: HashMap<usize, (Arc<GateDecl>, Vec<usize>)>,
}

/// Eliminates all top-level `SWAP` gates from `circuit`, recursing into
/// `Block`/`GateCall` bodies. Returns the rewritten circuit together with
/// the net qubit permutation left over from the eliminated swaps
/// (`perm[q]` is the wire that now carries what was originally on wire
/// `q`).
pub fn eliminate_swaps(circuit: &Circuit) -> Result<(Circuit, Vec<usize>)> {
    let num_qubits = circuit.num_qubits();
    let mut perm: Vec<usize> = (0..num_qubits).collect();
    let mut cache = SwapCache::default();
    let rewritten = rewire(circuit.instructions(), &mut perm, &mut cache)?;
    Ok((rewritten.into_iter().collect(), perm))
}

/// If `op` is a composite that the pass recurses into, rewires it and
/// returns the replacement operation together with its own local
/// permutation (indexed the same way as the instruction's own qubit
/// targets). Returns `None` for anything else, which the caller then
/// remaps through the outer `perm` directly.
fn rewrite_composite(op: &Operation, cache: &mut SwapCache) -> Result<Option<(Operation, Vec<usize>)>> {
    match op {
        Operation::Block(block) => {
            let (rewired, inner_perm) = rewire_block(block, cache)?;
            Ok(Some((Operation::Block(rewired), inner_perm)))
        }
        Operation::GateCall(decl, params) => {
            let (rewired_decl, inner_perm) = rewire_gate_decl(decl, params, cache)?;
            Ok(Some((Operation::GateCall(rewired_decl, params.clone()), inner_perm)))
        }
        Operation::IfStatement(inner, condition) => {
            rewrite_composite(inner, cache).map(|maybe| {
                maybe.map(|(new_inner, inner_perm)| {
                    (
                        Operation::IfStatement(Box::new(new_inner), condition.clone()),
                        inner_perm,
                    )
                })
            })
        }
        Operation::Control(inner, num_controls) => {
            rewrite_composite(inner, cache).map(|maybe| {
                maybe.map(|(new_inner, inner_perm)| {
                    // Control qubits sit in front of the wrapped operation's own
                    // targets and are untouched by its internal rewiring.
                    let mut full_perm: Vec<usize> = (0..*num_controls).collect();
                    full_perm.extend(inner_perm.iter().map(|&i| i + num_controls));
                    (Operation::Control(Box::new(new_inner), *num_controls), full_perm)
                })
            })
        }
        Operation::Inverse(inner) => {
            rewrite_composite(inner, cache).map(|maybe| {
                maybe.map(|(new_inner, inner_perm)| {
                    (Operation::Inverse(Box::new(new_inner)), inner_perm)
                })
            })
        }
        _ => Ok(None),
    }
}

fn rewire(
    instructions: &[Instruction],
    perm: &mut Vec<usize>,
    cache: &mut SwapCache,
) -> Result<Vec<Instruction>> {
    let mut out = Vec::with_capacity(instructions.len());
    for instruction in instructions {
        if matches!(instruction.operation(), Operation::Gate(Gate::Swap)) {
            let (a, b) = (
                perm.get(instruction.qubits()[0])
                    .copied()
                    .unwrap_or(instruction.qubits()[0]),
                perm.get(instruction.qubits()[1])
                    .copied()
                    .unwrap_or(instruction.qubits()[1]),
            );
            for wire in perm.iter_mut() {
                if *wire == a {
                    *wire = b;
                } else if *wire == b {
                    *wire = a;
                }
            }
            continue;
        }

        if let Some((new_op, inner_perm)) = rewrite_composite(instruction.operation(), cache)? {
            let original_qubits = instruction.qubits().to_vec();
            let old_perm = perm.clone();
            let remapped_qubits: Vec<usize> = original_qubits
                .iter()
                .map(|&q| perm.get(q).copied().unwrap_or(q))
                .collect();
            out.push(Instruction::new(
                new_op,
                remapped_qubits,
                instruction.bits().to_vec(),
                instruction.zvars().to_vec(),
            )?);
            for (i, &q) in original_qubits.iter().enumerate() {
                let source = original_qubits[inner_perm[i]];
                perm[q] = old_perm.get(source).copied().unwrap_or(source);
            }
            continue;
        }

        let remapped_qubits: Vec<usize> = instruction
            .qubits()
            .iter()
            .map(|&q| perm.get(q).copied().unwrap_or(q))
            .collect();
        out.push(Instruction::new(
            instruction.operation().clone(),
            remapped_qubits,
            instruction.bits().to_vec(),
            instruction.zvars().to_vec(),
        )?);
    }
    Ok(out)
}

fn rewire_block(block: &Arc<Block>, cache: &mut SwapCache) -> Result<(Arc<Block>, Vec<usize>)> {
    let key = Arc::as_ptr(block) as usize;
    if let Some(cached) = cache.blocks.get(&key) {
        return Ok(cached.clone());
    }
    let mut local_perm: Vec<usize> = (0..block.num_qubits()).collect();
    let rewired_instructions = rewire(block.instructions(), &mut local_perm, cache)?;
    // `new_with_arity` keeps the declared width even if the rewired body no
    // longer touches its highest-index qubit.
    let rewired = Arc::new(Block::new_with_arity(
        block.name().to_string(),
        block.num_qubits(),
        block.num_bits(),
        rewired_instructions,
    )?);
    cache
        .blocks
        .insert(key, (rewired.clone(), local_perm.clone()));
    Ok((rewired, local_perm))
}

/// Rewires a `GateDecl`'s body once, using the caller's bound parameters
/// to discover its structure, and wraps the original closure so every
/// future call re-derives a SWAP-free body for its own parameters. The
/// structure (and thus the permutation composed back into the caller) is
/// assumed to be parameter-independent, which holds for every declaration
/// this crate builds: parameters bind rotation angles, never control
/// flow.
fn rewire_gate_decl(
    decl: &Arc<GateDecl>,
    params: &[CalculatorFloat],
    cache: &mut SwapCache,
) -> Result<(Arc<GateDecl>, Vec<usize>)> {
    let key = Arc::as_ptr(decl) as usize;
    if let Some(cached) = cache.gate_decls.get(&key) {
        return Ok(cached.clone());
    }
    let discovery_body = decl.instantiate(params)?;
    let mut local_perm: Vec<usize> = (0..decl.num_qubits()).collect();
    let mut discovery_cache = SwapCache::default();
    rewire(&discovery_body, &mut local_perm, &mut discovery_cache)?;

    let old_decl = decl.clone();
    let num_qubits = decl.num_qubits();
    let rewired_decl = Arc::new(GateDecl::new(
        decl.name().to_string(),
        num_qubits,
        decl.num_bits(),
        decl.parnames().to_vec(),
        move |call_params: &[CalculatorFloat]| {
            let raw = old_decl.instantiate(call_params)?;
            let mut call_perm: Vec<usize> = (0..num_qubits).collect();
            let mut call_cache = SwapCache::default();
            rewire(&raw, &mut call_perm, &mut call_cache)
        },
    ));
    cache
        .gate_decls
        .insert(key, (rewired_decl.clone(), local_perm.clone()));
    Ok((rewired_decl, local_perm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Gate;

    fn gate_instr(g: Gate, qubits: Vec<usize>) -> Instruction {
        Instruction::new(Operation::Gate(g), qubits, vec![], vec![]).unwrap()
    }

    #[test]
    fn swap_followed_by_gate_rewires_target() {
        let mut circuit = Circuit::new();
        circuit.push(gate_instr(Gate::Swap, vec![0, 1]));
        circuit.push(gate_instr(Gate::X, vec![0]));
        let (rewritten, perm) = eliminate_swaps(&circuit).unwrap();
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten.instructions()[0].qubits(), &[1]);
        assert_eq!(perm, vec![1, 0]);
    }

    #[test]
    fn no_swaps_is_a_no_op() {
        let mut circuit = Circuit::new();
        circuit.push(gate_instr(Gate::H, vec![0]));
        circuit.push(gate_instr(Gate::Cx, vec![0, 1]));
        let (rewritten, perm) = eliminate_swaps(&circuit).unwrap();
        assert_eq!(rewritten, circuit);
        assert_eq!(perm, vec![0, 1]);
    }

    #[test]
    fn nested_swap_chain_composes() {
        let mut circuit = Circuit::new();
        circuit.push(gate_instr(Gate::Swap, vec![0, 1]));
        circuit.push(gate_instr(Gate::Swap, vec![1, 2]));
        circuit.push(gate_instr(Gate::X, vec![2]));
        let (rewritten, perm) = eliminate_swaps(&circuit).unwrap();
        assert_eq!(rewritten.len(), 1);
        // wire originally labeled 0 ends up holding what wire 2 held.
        assert_eq!(perm, vec![1, 2, 0]);
        assert_eq!(rewritten.instructions()[0].qubits(), &[0]);
    }

    #[test]
    fn block_bodies_are_rewired_and_cached() {
        let inner = Arc::new(Block::new(
            "swap_then_x",
            vec![gate_instr(Gate::Swap, vec![0, 1]), gate_instr(Gate::X, vec![0])],
        ));
        let mut circuit = Circuit::new();
        circuit.push(
            Instruction::new(Operation::Block(inner.clone()), vec![0, 1], vec![], vec![]).unwrap(),
        );
        circuit.push(
            Instruction::new(Operation::Block(inner), vec![2, 3], vec![], vec![]).unwrap(),
        );
        let (rewritten, _) = eliminate_swaps(&circuit).unwrap();
        for instr in rewritten.instructions() {
            if let Operation::Block(b) = instr.operation() {
                assert_eq!(b.instructions().len(), 1);
            } else {
                panic!("expected a Block instruction");
            }
        }
    }

    #[test]
    fn block_inner_permutation_composes_into_outer_perm() {
        // The block swaps its own two local wires, then the local index 0
        // (now carrying local wire 1's data) is targeted by an X.
        let inner = Arc::new(Block::new(
            "swap_only",
            vec![gate_instr(Gate::Swap, vec![0, 1])],
        ));
        let mut circuit = Circuit::new();
        circuit.push(Instruction::new(Operation::Block(inner), vec![0, 1], vec![], vec![]).unwrap());
        circuit.push(gate_instr(Gate::X, vec![0]));
        let (rewritten, perm) = eliminate_swaps(&circuit).unwrap();
        // the block's internal swap is eliminated entirely (empty body)
        // and its effect propagates into the outer permutation.
        if let Operation::Block(b) = rewritten.instructions()[0].operation() {
            assert!(b.instructions().is_empty());
        } else {
            panic!("expected a Block instruction");
        }
        assert_eq!(perm, vec![1, 0]);
        // the X that targeted local wire 0 now lands on global wire 1,
        // since the block's own swap already relabeled it.
        assert_eq!(rewritten.instructions()[1].qubits(), &[1]);
    }

    #[test]
    fn gate_call_body_is_rewired_and_cached() {
        let decl = Arc::new(GateDecl::new(
            "swap_then_x",
            2,
            0,
            vec![],
            |_: &[CalculatorFloat]| {
                Ok(vec![
                    Instruction::new(Operation::Gate(Gate::Swap), vec![0, 1], vec![], vec![])?,
                    Instruction::new(Operation::Gate(Gate::X), vec![0], vec![], vec![])?,
                ])
            },
        ));
        let mut circuit = Circuit::new();
        circuit.push(
            Instruction::new(Operation::GateCall(decl.clone(), vec![]), vec![0, 1], vec![], vec![])
                .unwrap(),
        );
        circuit.push(
            Instruction::new(Operation::GateCall(decl, vec![]), vec![2, 3], vec![], vec![])
                .unwrap(),
        );
        let (rewritten, _) = eliminate_swaps(&circuit).unwrap();
        for instr in rewritten.instructions() {
            match instr.operation() {
                Operation::GateCall(rewired_decl, params) => {
                    let body = rewired_decl.instantiate(params).unwrap();
                    assert_eq!(body.len(), 1);
                }
                other => panic!("expected a GateCall instruction, got {other:?}"),
            }
        }
    }
}
