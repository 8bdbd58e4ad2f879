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

//! Binary wire format for circuits, and the JSON result-file format
//! produced by a remote simulator/backend.
//!
//! The wire format walks the [`Operation`] tree explicitly rather than
//! deriving `serde` on it wholesale: most leaves (`Gate`, `Measurement`,
//! ..., `BitString`) already derive `Serialize`/`Deserialize` behind the
//! `serialize` feature and are encoded through `bincode::serde`, but a
//! `GateCall`'s declaration carries a closure body with no data
//! representation, so encoding one fails with [`QcoreError::Format`]
//! rather than silently dropping it.

#![cfg(feature = "serialize")]

use crate::circuit::{Circuit, Instruction};
use crate::operations::{Block, Gate, KrausChannel, MixedUnitary, Operation};
use crate::{BitString, QcoreError, Result};
use qoqo_calculator::CalculatorFloat;

const MAGIC: &[u8; 4] = b"QCOR";
const WIRE_VERSION: u16 = 1;

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard()
}

fn encode_serde<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode_config()).map_err(|e| QcoreError::Format {
        message: format!("failed to encode value: {e}"),
    })
}

fn decode_serde<T: for<'de> serde::Deserialize<'de>>(bytes: &[u8]) -> Result<(T, usize)> {
    bincode::serde::decode_from_slice(bytes, bincode_config()).map_err(|e| QcoreError::Format {
        message: format!("failed to decode value: {e}"),
    })
}

fn push_len_prefixed(out: &mut Vec<u8>, payload: &[u8]) {
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(QcoreError::Format {
                message: "unexpected end of circuit payload".to_string(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn usize_vec(&mut self) -> Result<Vec<usize>> {
        let len = self.u64()? as usize;
        (0..len).map(|_| Ok(self.u64()? as usize)).collect()
    }

    fn len_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.u64()? as usize;
        self.take(len)
    }

    fn decode_leaf<T: for<'de> serde::Deserialize<'de>>(&mut self) -> Result<T> {
        let bytes = self.len_prefixed()?;
        let (value, _) = decode_serde(bytes)?;
        Ok(value)
    }
}

/// Encodes a circuit into the binary wire format: a 4-byte magic, a u16
/// format version, then the instruction list.
pub fn encode_circuit(circuit: &Circuit) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&WIRE_VERSION.to_le_bytes());
    out.extend_from_slice(&(circuit.len() as u64).to_le_bytes());
    for instruction in circuit.instructions() {
        encode_instruction(instruction, &mut out)?;
    }
    Ok(out)
}

/// Decodes a circuit from the binary wire format. Fails with
/// [`QcoreError::Format`] on a bad magic, an unsupported version, or a
/// truncated/malformed payload.
pub fn decode_circuit(bytes: &[u8]) -> Result<Circuit> {
    let mut reader = Reader::new(bytes);
    let magic = reader.take(4)?;
    if magic != MAGIC {
        return Err(QcoreError::Format {
            message: "bad magic bytes for qcore circuit payload".to_string(),
        });
    }
    let version = reader.u16()?;
    if version != WIRE_VERSION {
        return Err(QcoreError::Format {
            message: format!("unsupported wire format version {version}"),
        });
    }
    let count = reader.u64()? as usize;
    let mut circuit = Circuit::new();
    for _ in 0..count {
        circuit.push(decode_instruction(&mut reader)?);
    }
    Ok(circuit)
}

fn encode_instruction(instruction: &Instruction, out: &mut Vec<u8>) -> Result<()> {
    encode_usize_vec(instruction.qubits(), out);
    encode_usize_vec(instruction.bits(), out);
    encode_usize_vec(instruction.zvars(), out);
    encode_operation(instruction.operation(), out)
}

fn decode_instruction(reader: &mut Reader<'_>) -> Result<Instruction> {
    let qubits = reader.usize_vec()?;
    let bits = reader.usize_vec()?;
    let zvars = reader.usize_vec()?;
    let operation = decode_operation(reader)?;
    Instruction::new(operation, qubits, bits, zvars)
}

fn encode_usize_vec(values: &[usize], out: &mut Vec<u8>) {
    out.extend_from_slice(&(values.len() as u64).to_le_bytes());
    for &v in values {
        out.extend_from_slice(&(v as u64).to_le_bytes());
    }
}

const TAG_GATE: u8 = 0;
const TAG_MEASUREMENT: u8 = 1;
const TAG_RESET: u8 = 2;
const TAG_BARRIER: u8 = 3;
const TAG_KRAUS: u8 = 4;
const TAG_MIXED_UNITARY: u8 = 5;
const TAG_INVERSE: u8 = 6;
const TAG_POWER: u8 = 7;
const TAG_CONTROL: u8 = 8;
const TAG_PARALLEL: u8 = 9;
const TAG_REPEAT: u8 = 10;
const TAG_IF_STATEMENT: u8 = 11;
const TAG_BLOCK: u8 = 12;

fn encode_operation(op: &Operation, out: &mut Vec<u8>) -> Result<()> {
    match op {
        Operation::Gate(g) => {
            out.push(TAG_GATE);
            push_len_prefixed(out, &encode_serde(g)?);
        }
        Operation::Measurement(m) => {
            out.push(TAG_MEASUREMENT);
            push_len_prefixed(out, &encode_serde(m)?);
        }
        Operation::Reset(_) => out.push(TAG_RESET),
        Operation::Barrier(b) => {
            out.push(TAG_BARRIER);
            push_len_prefixed(out, &encode_serde(b)?);
        }
        Operation::KrausChannel(k) => {
            out.push(TAG_KRAUS);
            push_len_prefixed(out, &encode_kraus(k)?);
        }
        Operation::MixedUnitary(m) => {
            out.push(TAG_MIXED_UNITARY);
            push_len_prefixed(out, &encode_mixed_unitary(m)?);
        }
        Operation::Inverse(inner) => {
            out.push(TAG_INVERSE);
            encode_operation(inner, out)?;
        }
        Operation::Power(inner, p) => {
            out.push(TAG_POWER);
            push_len_prefixed(out, &encode_serde(p)?);
            encode_operation(inner, out)?;
        }
        Operation::Control(inner, n) => {
            out.push(TAG_CONTROL);
            out.extend_from_slice(&(*n as u64).to_le_bytes());
            encode_operation(inner, out)?;
        }
        Operation::Parallel(n, inner) => {
            out.push(TAG_PARALLEL);
            out.extend_from_slice(&(*n as u64).to_le_bytes());
            encode_operation(inner, out)?;
        }
        Operation::Repeat(inner, n) => {
            out.push(TAG_REPEAT);
            out.extend_from_slice(&(*n as u64).to_le_bytes());
            encode_operation(inner, out)?;
        }
        Operation::IfStatement(inner, condition) => {
            out.push(TAG_IF_STATEMENT);
            push_len_prefixed(out, &encode_serde(condition)?);
            encode_operation(inner, out)?;
        }
        Operation::Block(block) => {
            out.push(TAG_BLOCK);
            encode_block(block, out)?;
        }
        Operation::GateCall(decl, _) => {
            return Err(QcoreError::Format {
                message: format!(
                    "GateCall({}) cannot be serialized: its declaration's body is a closure",
                    decl.name()
                ),
            })
        }
    }
    Ok(())
}

fn decode_operation(reader: &mut Reader<'_>) -> Result<Operation> {
    let tag = reader.u8()?;
    Ok(match tag {
        TAG_GATE => Operation::Gate(reader.decode_leaf::<Gate>()?),
        TAG_MEASUREMENT => Operation::Measurement(reader.decode_leaf()?),
        TAG_RESET => Operation::Reset(crate::operations::Reset),
        TAG_BARRIER => Operation::Barrier(reader.decode_leaf()?),
        TAG_KRAUS => decode_kraus(reader)?,
        TAG_MIXED_UNITARY => decode_mixed_unitary(reader)?,
        TAG_INVERSE => decode_operation(reader)?.inverse()?,
        TAG_POWER => {
            let p: CalculatorFloat = reader.decode_leaf()?;
            decode_operation(reader)?.power(p)?
        }
        TAG_CONTROL => {
            let n = reader.u64()? as usize;
            decode_operation(reader)?.control(n)?
        }
        TAG_PARALLEL => {
            let n = reader.u64()? as usize;
            decode_operation(reader)?.parallel(n)?
        }
        TAG_REPEAT => {
            let n = reader.u64()? as usize;
            decode_operation(reader)?.repeat(n)?
        }
        TAG_IF_STATEMENT => {
            let condition: BitString = reader.decode_leaf()?;
            decode_operation(reader)?.if_statement(condition)?
        }
        TAG_BLOCK => Operation::Block(std::sync::Arc::new(decode_block(reader)?)),
        other => {
            return Err(QcoreError::Format {
                message: format!("unknown operation tag {other}"),
            })
        }
    })
}

fn encode_kraus(k: &KrausChannel) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&(k.num_qubits() as u64).to_le_bytes());
    out.extend_from_slice(&(k.krausmatrices().len() as u64).to_le_bytes());
    for m in k.krausmatrices() {
        push_len_prefixed(&mut out, &encode_serde(m)?);
    }
    Ok(out)
}

fn decode_kraus(reader: &mut Reader<'_>) -> Result<Operation> {
    let payload = reader.len_prefixed()?;
    let mut inner = Reader::new(payload);
    let n = inner.u64()? as usize;
    let count = inner.u64()? as usize;
    let operators = (0..count)
        .map(|_| inner.decode_leaf())
        .collect::<Result<Vec<_>>>()?;
    Ok(Operation::KrausChannel(KrausChannel::new(n, operators)?))
}

fn encode_mixed_unitary(m: &MixedUnitary) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&(m.num_qubits() as u64).to_le_bytes());
    out.extend_from_slice(&(m.unitarymatrices().len() as u64).to_le_bytes());
    for u in m.unitarymatrices() {
        push_len_prefixed(&mut out, &encode_serde(u)?);
    }
    push_len_prefixed(&mut out, &encode_serde(&m.probabilities().to_vec())?);
    Ok(out)
}

fn decode_mixed_unitary(reader: &mut Reader<'_>) -> Result<Operation> {
    let payload = reader.len_prefixed()?;
    let mut inner = Reader::new(payload);
    let n = inner.u64()? as usize;
    let count = inner.u64()? as usize;
    let unitaries = (0..count)
        .map(|_| inner.decode_leaf())
        .collect::<Result<Vec<_>>>()?;
    let probabilities: Vec<CalculatorFloat> = inner.decode_leaf()?;
    Ok(Operation::MixedUnitary(MixedUnitary::new(
        n,
        unitaries,
        probabilities,
    )?))
}

fn encode_block(block: &Block, out: &mut Vec<u8>) -> Result<()> {
    push_len_prefixed(out, block.name().as_bytes());
    out.extend_from_slice(&(block.num_qubits() as u64).to_le_bytes());
    out.extend_from_slice(&(block.num_bits() as u64).to_le_bytes());
    out.extend_from_slice(&(block.instructions().len() as u64).to_le_bytes());
    for instr in block.instructions() {
        encode_instruction(instr, out)?;
    }
    Ok(())
}

fn decode_block(reader: &mut Reader<'_>) -> Result<Block> {
    let name_bytes = reader.len_prefixed()?;
    let name = String::from_utf8(name_bytes.to_vec()).map_err(|e| QcoreError::Format {
        message: format!("invalid UTF-8 in block name: {e}"),
    })?;
    let num_qubits = reader.u64()? as usize;
    let num_bits = reader.u64()? as usize;
    let count = reader.u64()? as usize;
    let instructions = (0..count)
        .map(|_| decode_instruction(reader))
        .collect::<Result<Vec<_>>>()?;
    Block::new_with_arity(name, num_qubits, num_bits, instructions)
}

/// The outcome of running a circuit on a remote simulator/backend --
/// fidelity and gate-error estimates, measurement samples, and timings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResultFile {
    /// Name of the simulator/backend that produced this result.
    pub simulator_name: String,
    /// Version string of the simulator/backend.
    pub simulator_version: String,
    /// Per-execution fidelity estimates, each in `[0, 1]`, if the backend
    /// reports them.
    pub fidelity_estimates: Vec<f64>,
    /// Average error rate per gate, keyed by gate name.
    pub average_gate_errors: std::collections::HashMap<String, f64>,
    /// Sampled classical-register outcomes, as big-endian bitstrings.
    pub classical_register_samples: Vec<BitString>,
    /// Sampled z-register outcomes.
    pub z_register_samples: Vec<Vec<f64>>,
    /// Final-state amplitudes, as `(basis state, (real, imag))` pairs. A
    /// `HashMap<BitString, _>` would read more naturally but `BitString`'s
    /// struct-shaped `Serialize` impl can't be used as a JSON object key, so
    /// the map is carried as an explicit list instead.
    pub amplitudes: Vec<(BitString, (f64, f64))>,
    /// Named wall-clock timings, in seconds.
    pub timings: std::collections::HashMap<String, f64>,
}

impl ResultFile {
    /// Serializes the result file to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| QcoreError::Format {
            message: format!("failed to serialize result file: {e}"),
        })
    }

    /// Parses a result file from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| QcoreError::Format {
            message: format!("failed to parse result file: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Gate;

    #[test]
    fn circuit_round_trips_through_wire_format() {
        let mut circuit = Circuit::new();
        circuit.push(Instruction::new(Operation::Gate(Gate::H), vec![0], vec![], vec![]).unwrap());
        circuit.push(
            Instruction::new(Operation::Gate(Gate::Cx), vec![0, 1], vec![], vec![]).unwrap(),
        );
        let bytes = encode_circuit(&circuit).unwrap();
        let decoded = decode_circuit(&bytes).unwrap();
        assert_eq!(decoded, circuit);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let bytes = vec![0u8; 8];
        assert!(matches!(decode_circuit(&bytes), Err(QcoreError::Format { .. })));
    }

    #[test]
    fn wrapper_operations_round_trip() {
        let mut circuit = Circuit::new();
        let op = Operation::Gate(Gate::X).control(1).unwrap();
        circuit.push(Instruction::new(op, vec![0, 1], vec![], vec![]).unwrap());
        let bytes = encode_circuit(&circuit).unwrap();
        let decoded = decode_circuit(&bytes).unwrap();
        assert_eq!(decoded, circuit);
    }

    #[test]
    fn result_file_round_trips_through_json() {
        let result = ResultFile {
            simulator_name: "qcore-reference-simulator".to_string(),
            simulator_version: "0.1.0".to_string(),
            fidelity_estimates: vec![0.998, 0.991],
            average_gate_errors: std::collections::HashMap::new(),
            classical_register_samples: vec![BitString::from_str01("01").unwrap()],
            z_register_samples: vec![],
            amplitudes: vec![(BitString::from_str01("01").unwrap(), (0.70710678, 0.0))],
            timings: std::collections::HashMap::new(),
        };
        let json = result.to_json().unwrap();
        assert_eq!(ResultFile::from_json(&json).unwrap(), result);
    }
}
