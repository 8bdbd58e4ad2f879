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

//! The job-input directory layout handed to the external execution client
//! (§6): a `request.json` describing the executor and time limit, either a
//! `circuits.json` or an `optimize.json` describing the job parameters, and
//! one artifact file per referenced circuit/experiment.
//!
//! This module only builds the layout in memory and, optionally,
//! materializes it under a directory -- the HTTP transport, authentication
//! and polling that actually submit the job to a remote service are
//! outside the core (§1).

#![cfg(feature = "serialize")]

use crate::circuit::Circuit;
use crate::serialization::encode_circuit;
use crate::{QcoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The wire format a referenced circuit/experiment file is encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// This crate's binary wire format (§6).
    Proto,
    /// OpenQASM text.
    Qasm,
    /// Stim's circuit description format.
    Stim,
}

/// One `{file, type}` entry referenced from `circuits.json`/`optimize.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name, relative to the job-input directory.
    pub file: String,
    /// The format the file is encoded in.
    #[serde(rename = "type")]
    pub file_type: FileType,
}

/// `request.json`: executor type, time limit and client API version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Name of the remote executor/backend to run the job on.
    pub executor: String,
    /// Wall-clock time limit for the job, in minutes.
    pub time_limit_minutes: u32,
    /// Name of the client API language binding (e.g. `"rust"`).
    pub api_language: String,
    /// Version string of the client API.
    pub api_version: String,
}

/// `circuits.json`: a sampling job over one or more circuits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitsJob {
    /// Named numeric parameters substituted into symbolic circuits.
    pub parameters: std::collections::HashMap<String, f64>,
    /// Number of samples to draw per circuit.
    pub samples: u64,
    /// Random seed, if the job should be reproducible.
    pub seed: Option<u64>,
    /// Maximum bond dimension for a tensor-network backend, if applicable.
    pub bond_dimension: Option<u32>,
    /// Maximum entanglement dimension, if applicable.
    pub entanglement_dimension: Option<u32>,
    /// The circuit/experiment files this job references, in order.
    pub files: Vec<FileEntry>,
}

/// `optimize.json`: a variational-optimization job over one or more
/// circuits/experiments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeJob {
    /// Named numeric parameters the optimizer starts from.
    pub parameters: std::collections::HashMap<String, f64>,
    /// Number of samples to draw per evaluation.
    pub samples: u64,
    /// Random seed, if the job should be reproducible.
    pub seed: Option<u64>,
    /// Maximum bond dimension for a tensor-network backend, if applicable.
    pub bond_dimension: Option<u32>,
    /// Maximum entanglement dimension, if applicable.
    pub entanglement_dimension: Option<u32>,
    /// The circuit/experiment files this job references, in order.
    pub files: Vec<FileEntry>,
}

/// Either kind of job description a job-input directory carries.
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    /// A plain sampling job (`circuits.json`).
    Circuits(CircuitsJob),
    /// A variational-optimization job (`optimize.json`).
    Optimize(OptimizeJob),
}

/// A complete job-input directory: `request.json`, a `circuits.json` or
/// `optimize.json`, and the circuit files it references.
#[derive(Debug, Clone, PartialEq)]
pub struct JobLayout {
    /// The `request.json` contents.
    pub request: JobRequest,
    /// The `circuits.json`/`optimize.json` contents.
    pub kind: JobKind,
    /// `(file name, wire bytes)` pairs for every `proto`-typed circuit this
    /// layout was built from. `qasm`/`stim` entries referenced in `kind`
    /// must be supplied by the caller separately -- this core does not
    /// implement those peripheral formats (§1).
    pub circuit_files: Vec<(String, Vec<u8>)>,
}

impl JobLayout {
    /// Builds a sampling job-input layout for `circuits`, encoding each one
    /// through this crate's binary wire format as `circuit_<i>.proto`.
    pub fn for_circuits(
        request: JobRequest,
        circuits: &[Circuit],
        samples: u64,
        seed: Option<u64>,
    ) -> Result<Self> {
        let mut files = Vec::with_capacity(circuits.len());
        let mut circuit_files = Vec::with_capacity(circuits.len());
        for (i, circuit) in circuits.iter().enumerate() {
            let name = format!("circuit_{i}.proto");
            files.push(FileEntry {
                file: name.clone(),
                file_type: FileType::Proto,
            });
            circuit_files.push((name, encode_circuit(circuit)?));
        }
        Ok(JobLayout {
            request,
            kind: JobKind::Circuits(CircuitsJob {
                parameters: std::collections::HashMap::new(),
                samples,
                seed,
                bond_dimension: None,
                entanglement_dimension: None,
                files,
            }),
            circuit_files,
        })
    }

    /// Serializes the job description (`request.json` plus `circuits.json`
    /// or `optimize.json`) to pretty-printed JSON, without writing any
    /// files to disk.
    pub fn descriptor_json(&self) -> Result<(String, String)> {
        let request_json =
            serde_json::to_string_pretty(&self.request).map_err(|e| QcoreError::Format {
                message: format!("failed to serialize request.json: {e}"),
            })?;
        let kind_json = match &self.kind {
            JobKind::Circuits(job) => {
                serde_json::to_string_pretty(job).map_err(|e| QcoreError::Format {
                    message: format!("failed to serialize circuits.json: {e}"),
                })?
            }
            JobKind::Optimize(job) => {
                serde_json::to_string_pretty(job).map_err(|e| QcoreError::Format {
                    message: format!("failed to serialize optimize.json: {e}"),
                })?
            }
        };
        Ok((request_json, kind_json))
    }

    /// The file name the job description's circuit listing should be
    /// written under (`circuits.json` or `optimize.json`).
    pub fn kind_file_name(&self) -> &'static str {
        match &self.kind {
            JobKind::Circuits(_) => "circuits.json",
            JobKind::Optimize(_) => "optimize.json",
        }
    }

    /// Materializes the full job-input directory layout at `dir`, creating
    /// it (and any missing parents) if necessary.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| QcoreError::Format {
            message: format!("failed to create job-input directory {dir:?}: {e}"),
        })?;
        let (request_json, kind_json) = self.descriptor_json()?;
        std::fs::write(dir.join("request.json"), request_json).map_err(|e| QcoreError::Format {
            message: format!("failed to write request.json: {e}"),
        })?;
        std::fs::write(dir.join(self.kind_file_name()), kind_json).map_err(|e| {
            QcoreError::Format {
                message: format!("failed to write {}: {e}", self.kind_file_name()),
            }
        })?;
        for (name, bytes) in &self.circuit_files {
            std::fs::write(dir.join(name), bytes).map_err(|e| QcoreError::Format {
                message: format!("failed to write circuit file {name}: {e}"),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Instruction;
    use crate::operations::{Gate, Operation};

    fn bell_pair() -> Circuit {
        let mut circuit = Circuit::new();
        circuit.push(Instruction::new(Operation::Gate(Gate::H), vec![0], vec![], vec![]).unwrap());
        circuit.push(
            Instruction::new(Operation::Gate(Gate::Cx), vec![0, 1], vec![], vec![]).unwrap(),
        );
        circuit
    }

    #[test]
    fn circuit_job_lists_one_proto_file_per_circuit() {
        let request = JobRequest {
            executor: "statevector".to_string(),
            time_limit_minutes: 10,
            api_language: "rust".to_string(),
            api_version: crate::QCORE_VERSION.to_string(),
        };
        let layout = JobLayout::for_circuits(request, &[bell_pair(), bell_pair()], 1000, Some(42))
            .unwrap();
        match &layout.kind {
            JobKind::Circuits(job) => {
                assert_eq!(job.files.len(), 2);
                assert_eq!(job.files[0].file_type, FileType::Proto);
                assert_eq!(job.samples, 1000);
                assert_eq!(job.seed, Some(42));
            }
            JobKind::Optimize(_) => panic!("expected a circuits job"),
        }
        assert_eq!(layout.circuit_files.len(), 2);
    }

    #[test]
    fn descriptor_json_round_trips_request() {
        let request = JobRequest {
            executor: "statevector".to_string(),
            time_limit_minutes: 5,
            api_language: "rust".to_string(),
            api_version: "0.1.0".to_string(),
        };
        let layout = JobLayout::for_circuits(request.clone(), &[bell_pair()], 10, None).unwrap();
        let (request_json, _) = layout.descriptor_json().unwrap();
        let parsed: JobRequest = serde_json::from_str(&request_json).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn write_to_materializes_directory() {
        let request = JobRequest {
            executor: "statevector".to_string(),
            time_limit_minutes: 5,
            api_language: "rust".to_string(),
            api_version: "0.1.0".to_string(),
        };
        let layout = JobLayout::for_circuits(request, &[bell_pair()], 10, None).unwrap();
        let dir = std::env::temp_dir().join(format!("qcore-job-layout-test-{:p}", &layout));
        layout.write_to(&dir).unwrap();
        assert!(dir.join("request.json").exists());
        assert!(dir.join("circuits.json").exists());
        assert!(dir.join("circuit_0.proto").exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
