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

//! The primitive and standard gate set (§4.4): `matrix()`, `inverse()` and
//! the per-kind algebraic closures for `power()`/`control()`/`parallel()`.
//!
//! Elementary gates are variants of [`Gate`] rather than one struct per
//! gate: the capability trait in [`crate::operations`] dispatches on the
//! same information either way, and a closed enum is what the rewrite laws
//! in §4.3 require (canonical simplification must be able to match on gate
//! *kind*, not just on "some boxed unitary").

use crate::matrix_utils::{controlled_block, dagger, identity, kron, kron_all};
use crate::operations::Operation;
use crate::{QcoreError, Result};
use ndarray::Array2;
use num_complex::Complex64;
use qoqo_calculator::CalculatorFloat;
use std::f64::consts::PI;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

const I: Complex64 = Complex64::new(0.0, 1.0);

fn c(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

fn cis(theta: f64) -> Complex64 {
    Complex64::new(theta.cos(), theta.sin())
}

/// Single-qubit Pauli axis, used by [`Gate::RPauli`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Pauli {
    /// Identity: the qubit is not acted on by this term.
    I,
    /// Pauli-X axis.
    X,
    /// Pauli-Y axis.
    Y,
    /// Pauli-Z axis.
    Z,
}

/// The primitive and standard gate set.
///
/// Parametric gates carry [`CalculatorFloat`] parameters; `matrix()` on a
/// gate with any unbound symbolic parameter fails with
/// [`QcoreError::Symbolic`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Gate {
    /// General single-qubit unitary `U(theta, phi, lambda, gamma)`.
    U {
        /// Polar rotation angle.
        theta: CalculatorFloat,
        /// First phase.
        phi: CalculatorFloat,
        /// Second phase.
        lambda: CalculatorFloat,
        /// Global phase, `0` by default.
        gamma: CalculatorFloat,
    },
    /// Phase shift `diag(1, e^{i lambda})`.
    P {
        /// Phase angle.
        lambda: CalculatorFloat,
    },
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
    /// Hadamard.
    H,
    /// Identity.
    Id,
    /// Rotation about X.
    Rx {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Rotation about Y.
    Ry {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Rotation about Z.
    Rz {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Rotation about an axis in the XY plane at angle `phi`.
    R {
        /// Rotation angle.
        theta: CalculatorFloat,
        /// Axis angle in the XY plane.
        phi: CalculatorFloat,
    },
    /// `sqrt(Z)` phase gate.
    S,
    /// `S^-1`.
    Sdg,
    /// `sqrt(S)` phase gate.
    T,
    /// `T^-1`.
    Tdg,
    /// `sqrt(X)`.
    Sx,
    /// `Sx^-1`.
    Sxdg,
    /// `sqrt(Y)`.
    Sy,
    /// `Sy^-1`.
    Sydg,
    /// Clifford rotation exchanging the X and Y axes.
    Hxy,
    /// Clifford rotation exchanging the Y and Z axes.
    Hyz,
    /// Controlled-X (CNOT).
    Cx,
    /// Controlled-Y.
    Cy,
    /// Controlled-Z.
    Cz,
    /// Controlled-Hadamard.
    Ch,
    /// Controlled phase shift.
    Cp {
        /// Phase angle.
        lambda: CalculatorFloat,
    },
    /// Controlled rotation about X.
    Crx {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Controlled rotation about Y.
    Cry {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Controlled rotation about Z.
    Crz {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Controlled general unitary.
    Cu {
        /// Polar rotation angle.
        theta: CalculatorFloat,
        /// First phase.
        phi: CalculatorFloat,
        /// Second phase.
        lambda: CalculatorFloat,
        /// Global phase.
        gamma: CalculatorFloat,
    },
    /// Controlled `S`.
    Cs,
    /// Controlled `S^-1`.
    Csdg,
    /// Controlled `sqrt(X)`.
    Csx,
    /// Controlled `Csx^-1`.
    Csxdg,
    /// SWAP.
    Swap,
    /// iSWAP.
    Iswap,
    /// Double-CNOT (`CX` followed by the reversed-wire `CX`).
    Dcx,
    /// Echoed cross-resonance.
    Ecr,
    /// `exp(-i theta/2 X⊗X)`.
    Rxx {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// `exp(-i theta/2 Y⊗Y)`.
    Ryy {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// `exp(-i theta/2 Z⊗Z)`.
    Rzz {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// `exp(-i theta/2 Z⊗X)`.
    Rzx {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// `XX+YY` interaction rotation.
    XxPlusYy {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// `XX-YY` interaction rotation.
    XxMinusYy {
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Toffoli (doubly-controlled X).
    Ccx,
    /// Fredkin (controlled SWAP).
    Cswap,
    /// Triply-controlled X.
    C3x,
    /// Phase-gradient operator on `n` qubits: `diag(e^{i pi k / 2^(n-1)})`.
    PhaseGradient {
        /// Number of qubits.
        n: usize,
    },
    /// Quantum Fourier transform on `n` qubits.
    Qft {
        /// Number of qubits.
        n: usize,
    },
    /// Global phase on `n` qubits (acts as identity up to phase `lambda`).
    GPhase {
        /// Number of qubits the phase is attached to.
        n: usize,
        /// Phase angle.
        lambda: CalculatorFloat,
    },
    /// Multi-qubit "rotate-Z" interaction: `exp(-i theta/2 Z^{⊗n})`.
    GateRnz {
        /// Number of qubits.
        n: usize,
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Pauli-string rotation `exp(-i theta/2 P_0⊗P_1⊗...)`.
    RPauli {
        /// The Pauli axis for each qubit, in order.
        pauli_string: Vec<Pauli>,
        /// Rotation angle.
        theta: CalculatorFloat,
    },
    /// Escape hatch for an arbitrary unitary matrix, validated at
    /// construction to be unitary within `1e-8`.
    Custom {
        /// The `2^n x 2^n` unitary matrix.
        matrix: Array2<Complex64>,
    },
}

fn evalf(p: &CalculatorFloat, gate: &str) -> Result<f64> {
    f64::try_from(p.clone()).map_err(|_| QcoreError::Symbolic {
        operation: gate.to_string(),
        symbols: vec![p.to_string()],
    })
}

impl Gate {
    /// `hqslang`-style name of the gate kind.
    pub fn name(&self) -> &'static str {
        use Gate::*;
        match self {
            U { .. } => "U",
            P { .. } => "P",
            X => "X",
            Y => "Y",
            Z => "Z",
            H => "H",
            Id => "ID",
            Rx { .. } => "RX",
            Ry { .. } => "RY",
            Rz { .. } => "RZ",
            R { .. } => "R",
            S => "S",
            Sdg => "SDG",
            T => "T",
            Tdg => "TDG",
            Sx => "SX",
            Sxdg => "SXDG",
            Sy => "SY",
            Sydg => "SYDG",
            Hxy => "HXY",
            Hyz => "HYZ",
            Cx => "CX",
            Cy => "CY",
            Cz => "CZ",
            Ch => "CH",
            Cp { .. } => "CP",
            Crx { .. } => "CRX",
            Cry { .. } => "CRY",
            Crz { .. } => "CRZ",
            Cu { .. } => "CU",
            Cs => "CS",
            Csdg => "CSDG",
            Csx => "CSX",
            Csxdg => "CSXDG",
            Swap => "SWAP",
            Iswap => "ISWAP",
            Dcx => "DCX",
            Ecr => "ECR",
            Rxx { .. } => "RXX",
            Ryy { .. } => "RYY",
            Rzz { .. } => "RZZ",
            Rzx { .. } => "RZX",
            XxPlusYy { .. } => "XXPlusYY",
            XxMinusYy { .. } => "XXMinusYY",
            Ccx => "CCX",
            Cswap => "CSWAP",
            C3x => "C3X",
            PhaseGradient { .. } => "PhaseGradient",
            Qft { .. } => "QFT",
            GPhase { .. } => "GPhase",
            GateRnz { .. } => "GateRNZ",
            RPauli { .. } => "RPauli",
            Custom { .. } => "Custom",
        }
    }

    /// Number of qubits the gate acts on.
    pub fn num_qubits(&self) -> usize {
        use Gate::*;
        match self {
            X | Y | Z | H | Id | U { .. } | P { .. } | Rx { .. } | Ry { .. } | Rz { .. }
            | R { .. } | S | Sdg | T | Tdg | Sx | Sxdg | Sy | Sydg | Hxy | Hyz => 1,
            Cx | Cy | Cz | Ch | Cp { .. } | Crx { .. } | Cry { .. } | Crz { .. } | Cu { .. }
            | Cs | Csdg | Csx | Csxdg | Swap | Iswap | Dcx | Ecr | Rxx { .. } | Ryy { .. }
            | Rzz { .. } | Rzx { .. } | XxPlusYy { .. } | XxMinusYy { .. } => 2,
            Ccx | Cswap => 3,
            C3x => 4,
            PhaseGradient { n } | Qft { n } | GPhase { n, .. } | GateRnz { n, .. } => *n,
            RPauli { pauli_string, .. } => pauli_string.len(),
            Custom { matrix } => {
                let dim = matrix.dim().0 as f64;
                dim.log2().round() as usize
            }
        }
    }

    /// Ordered names of the gate's scalar parameters.
    pub fn parnames(&self) -> Vec<&'static str> {
        use Gate::*;
        match self {
            U { .. } | Cu { .. } => vec!["theta", "phi", "lambda", "gamma"],
            P { .. } | Cp { .. } => vec!["lambda"],
            Rx { .. } | Ry { .. } | Rz { .. } | Crx { .. } | Cry { .. } | Crz { .. }
            | Rxx { .. } | Ryy { .. } | Rzz { .. } | Rzx { .. } | XxPlusYy { .. }
            | XxMinusYy { .. } | GateRnz { .. } | RPauli { .. } => vec!["theta"],
            R { .. } => vec!["theta", "phi"],
            GPhase { .. } => vec!["lambda"],
            _ => vec![],
        }
    }

    /// Whether any parameter is still symbolic (cannot be evaluated to a
    /// number).
    pub fn is_symbolic(&self) -> bool {
        use Gate::*;
        let check = |p: &CalculatorFloat| f64::try_from(p.clone()).is_err();
        match self {
            U { theta, phi, lambda, gamma } | Cu { theta, phi, lambda, gamma } => {
                check(theta) || check(phi) || check(lambda) || check(gamma)
            }
            P { lambda } | Cp { lambda } | GPhase { lambda, .. } => check(lambda),
            Rx { theta } | Ry { theta } | Rz { theta } | Crx { theta } | Cry { theta }
            | Crz { theta } | Rxx { theta } | Ryy { theta } | Rzz { theta } | Rzx { theta }
            | XxPlusYy { theta } | XxMinusYy { theta } | GateRnz { theta, .. }
            | RPauli { theta, .. } => check(theta),
            R { theta, phi } => check(theta) || check(phi),
            _ => false,
        }
    }

    /// Self-inverse elementary gates (order 2): `g.inverse() == g`.
    fn is_self_inverse(&self) -> bool {
        matches!(
            self,
            Gate::X
                | Gate::Y
                | Gate::Z
                | Gate::H
                | Gate::Id
                | Gate::Hxy
                | Gate::Hyz
                | Gate::Swap
                | Gate::Ecr
                | Gate::Cx
                | Gate::Cy
                | Gate::Cz
                | Gate::Ch
                | Gate::Ccx
                | Gate::Cswap
                | Gate::C3x
        )
    }

    /// The unitary matrix, as a dense `2^n x 2^n` complex array. Fails with
    /// [`QcoreError::Symbolic`] if any parameter is unbound.
    pub fn matrix(&self) -> Result<Array2<Complex64>> {
        use Gate::*;
        let name = self.name();
        Ok(match self {
            Id | GateRnz { theta: _, n: _ } if false => unreachable!(),
            U { theta, phi, lambda, gamma } => u_matrix(
                evalf(theta, name)?,
                evalf(phi, name)?,
                evalf(lambda, name)?,
                evalf(gamma, name)?,
            ),
            P { lambda } => {
                let l = evalf(lambda, name)?;
                diag2(c(1.0), cis(l))
            }
            X => array2([[c(0.0), c(1.0)], [c(1.0), c(0.0)]]),
            Y => array2([[c(0.0), -I], [I, c(0.0)]]),
            Z => diag2(c(1.0), c(-1.0)),
            H => {
                let s = 1.0 / std::f64::consts::SQRT_2;
                array2([[c(s), c(s)], [c(s), c(-s)]])
            }
            Id => identity(2),
            Rx { theta } => {
                let t = evalf(theta, name)?;
                let (ch, sh) = ((t / 2.0).cos(), (t / 2.0).sin());
                array2([[c(ch), -I * sh], [-I * sh, c(ch)]])
            }
            Ry { theta } => {
                let t = evalf(theta, name)?;
                let (ch, sh) = ((t / 2.0).cos(), (t / 2.0).sin());
                array2([[c(ch), c(-sh)], [c(sh), c(ch)]])
            }
            Rz { theta } => {
                let t = evalf(theta, name)?;
                diag2(cis(-t / 2.0), cis(t / 2.0))
            }
            R { theta, phi } => {
                let t = evalf(theta, name)?;
                let p = evalf(phi, name)?;
                let (ch, sh) = ((t / 2.0).cos(), (t / 2.0).sin());
                array2([
                    [c(ch), -I * cis(-p) * sh],
                    [-I * cis(p) * sh, c(ch)],
                ])
            }
            S => diag2(c(1.0), I),
            Sdg => diag2(c(1.0), -I),
            T => diag2(c(1.0), cis(PI / 4.0)),
            Tdg => diag2(c(1.0), cis(-PI / 4.0)),
            Sx => array2([
                [Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5)],
                [Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5)],
            ]),
            Sxdg => dagger(&Gate::Sx.matrix()?),
            Sy => array2([
                [Complex64::new(0.5, 0.5), Complex64::new(-0.5, -0.5)],
                [Complex64::new(0.5, 0.5), Complex64::new(0.5, 0.5)],
            ]),
            Sydg => dagger(&Gate::Sy.matrix()?),
            Hxy => {
                let s = 1.0 / std::f64::consts::SQRT_2;
                array2([
                    [c(0.0), Complex64::new(s, -s)],
                    [Complex64::new(s, s), c(0.0)],
                ])
            }
            Hyz => {
                let s = 1.0 / std::f64::consts::SQRT_2;
                array2([[c(s), -I * s], [I * s, c(-s)]])
            }
            Cx => controlled_block(&Gate::X.matrix()?, 1),
            Cy => controlled_block(&Gate::Y.matrix()?, 1),
            Cz => controlled_block(&Gate::Z.matrix()?, 1),
            Ch => controlled_block(&Gate::H.matrix()?, 1),
            Cp { lambda } => controlled_block(&Gate::P { lambda: lambda.clone() }.matrix()?, 1),
            Crx { theta } => controlled_block(&Gate::Rx { theta: theta.clone() }.matrix()?, 1),
            Cry { theta } => controlled_block(&Gate::Ry { theta: theta.clone() }.matrix()?, 1),
            Crz { theta } => controlled_block(&Gate::Rz { theta: theta.clone() }.matrix()?, 1),
            Cu { theta, phi, lambda, gamma } => controlled_block(
                &Gate::U {
                    theta: theta.clone(),
                    phi: phi.clone(),
                    lambda: lambda.clone(),
                    gamma: gamma.clone(),
                }
                .matrix()?,
                1,
            ),
            Cs => controlled_block(&Gate::S.matrix()?, 1),
            Csdg => controlled_block(&Gate::Sdg.matrix()?, 1),
            Csx => controlled_block(&Gate::Sx.matrix()?, 1),
            Csxdg => controlled_block(&Gate::Sxdg.matrix()?, 1),
            Swap => array2([
                [c(1.0), c(0.0), c(0.0), c(0.0)],
                [c(0.0), c(0.0), c(1.0), c(0.0)],
                [c(0.0), c(1.0), c(0.0), c(0.0)],
                [c(0.0), c(0.0), c(0.0), c(1.0)],
            ]),
            Iswap => array2([
                [c(1.0), c(0.0), c(0.0), c(0.0)],
                [c(0.0), c(0.0), I, c(0.0)],
                [c(0.0), I, c(0.0), c(0.0)],
                [c(0.0), c(0.0), c(0.0), c(1.0)],
            ]),
            Dcx => {
                // CX(control=0,target=1) followed by CX(control=1,target=0).
                let cx01 = controlled_block(&Gate::X.matrix()?, 1);
                let cx10 = swap_two_qubit_operands(&cx01);
                cx10.dot(&cx01)
            }
            Ecr => {
                let s = 1.0 / std::f64::consts::SQRT_2;
                array2([
                    [c(0.0), c(0.0), c(s), I * s],
                    [c(0.0), c(0.0), I * s, c(s)],
                    [c(s), -I * s, c(0.0), c(0.0)],
                    [-I * s, c(s), c(0.0), c(0.0)],
                ])
            }
            Rxx { theta } => {
                let t = evalf(theta, name)?;
                let (ch, sh) = ((t / 2.0).cos(), (t / 2.0).sin());
                array2([
                    [c(ch), c(0.0), c(0.0), -I * sh],
                    [c(0.0), c(ch), -I * sh, c(0.0)],
                    [c(0.0), -I * sh, c(ch), c(0.0)],
                    [-I * sh, c(0.0), c(0.0), c(ch)],
                ])
            }
            Ryy { theta } => {
                let t = evalf(theta, name)?;
                let (ch, sh) = ((t / 2.0).cos(), (t / 2.0).sin());
                array2([
                    [c(ch), c(0.0), c(0.0), I * sh],
                    [c(0.0), c(ch), -I * sh, c(0.0)],
                    [c(0.0), -I * sh, c(ch), c(0.0)],
                    [I * sh, c(0.0), c(0.0), c(ch)],
                ])
            }
            Rzz { theta } => {
                let t = evalf(theta, name)?;
                let (p, m) = (cis(-t / 2.0), cis(t / 2.0));
                Array2::from_shape_fn((4, 4), |(i, j)| {
                    if i != j {
                        c(0.0)
                    } else {
                        let parity = (i.count_ones()) % 2;
                        if parity == 0 {
                            p
                        } else {
                            m
                        }
                    }
                })
            }
            Rzx { theta } => {
                let t = evalf(theta, name)?;
                let (ch, sh) = ((t / 2.0).cos(), (t / 2.0).sin());
                array2([
                    [c(ch), -I * sh, c(0.0), c(0.0)],
                    [-I * sh, c(ch), c(0.0), c(0.0)],
                    [c(0.0), c(0.0), c(ch), I * sh],
                    [c(0.0), c(0.0), I * sh, c(ch)],
                ])
            }
            XxPlusYy { theta } => {
                let t = evalf(theta, name)?;
                let (ch, sh) = ((t / 2.0).cos(), (t / 2.0).sin());
                array2([
                    [c(1.0), c(0.0), c(0.0), c(0.0)],
                    [c(0.0), c(ch), -I * sh, c(0.0)],
                    [c(0.0), -I * sh, c(ch), c(0.0)],
                    [c(0.0), c(0.0), c(0.0), c(1.0)],
                ])
            }
            XxMinusYy { theta } => {
                let t = evalf(theta, name)?;
                let (ch, sh) = ((t / 2.0).cos(), (t / 2.0).sin());
                array2([
                    [c(ch), c(0.0), c(0.0), -I * sh],
                    [c(0.0), c(1.0), c(0.0), c(0.0)],
                    [c(0.0), c(0.0), c(1.0), c(0.0)],
                    [-I * sh, c(0.0), c(0.0), c(ch)],
                ])
            }
            Ccx => controlled_block(&Gate::X.matrix()?, 2),
            Cswap => {
                // Controlled SWAP, control = highest-index qubit.
                let mut m = identity(8);
                // |101> <-> |110>
                m[(5, 5)] = c(0.0);
                m[(6, 6)] = c(0.0);
                m[(5, 6)] = c(1.0);
                m[(6, 5)] = c(1.0);
                m
            }
            C3x => controlled_block(&Gate::X.matrix()?, 3),
            PhaseGradient { n } => {
                let dim = 1usize << n;
                let diag: Vec<Complex64> = (0..dim)
                    .map(|k| cis(PI * (k as f64) / (dim as f64 / 2.0)))
                    .collect();
                diag_matrix(&diag)
            }
            Qft { n } => qft_matrix(*n),
            GPhase { n, lambda } => {
                let l = evalf(lambda, name)?;
                let dim = 1usize << n;
                let mut m = identity(dim);
                m.mapv_inplace(|x| x * cis(l));
                m
            }
            GateRnz { n, theta } => {
                let t = evalf(theta, name)?;
                let dim = 1usize << n;
                let diag: Vec<Complex64> = (0..dim)
                    .map(|k| {
                        if k.count_ones() % 2 == 0 {
                            cis(-t / 2.0)
                        } else {
                            cis(t / 2.0)
                        }
                    })
                    .collect();
                diag_matrix(&diag)
            }
            RPauli { pauli_string, theta } => rpauli_matrix(pauli_string, evalf(theta, name)?)?,
            Custom { matrix } => matrix.clone(),
        })
    }

    /// Returns `Gate` equal to `g†`.
    pub fn inverse(&self) -> Result<Gate> {
        use Gate::*;
        if self.is_self_inverse() {
            return Ok(self.clone());
        }
        Ok(match self {
            U { theta, phi, lambda, gamma } => U {
                theta: -theta.clone(),
                phi: -lambda.clone(),
                lambda: -phi.clone(),
                gamma: -gamma.clone(),
            },
            P { lambda } => P { lambda: -lambda.clone() },
            Rx { theta } => Rx { theta: -theta.clone() },
            Ry { theta } => Ry { theta: -theta.clone() },
            Rz { theta } => Rz { theta: -theta.clone() },
            R { theta, phi } => R { theta: -theta.clone(), phi: phi.clone() },
            S => Sdg,
            Sdg => S,
            T => Tdg,
            Tdg => T,
            Sx => Sxdg,
            Sxdg => Sx,
            Sy => Sydg,
            Sydg => Sy,
            Cp { lambda } => Cp { lambda: -lambda.clone() },
            Crx { theta } => Crx { theta: -theta.clone() },
            Cry { theta } => Cry { theta: -theta.clone() },
            Crz { theta } => Crz { theta: -theta.clone() },
            Cu { theta, phi, lambda, gamma } => Cu {
                theta: -theta.clone(),
                phi: -lambda.clone(),
                lambda: -phi.clone(),
                gamma: -gamma.clone(),
            },
            Cs => Csdg,
            Csdg => Cs,
            Csx => Csxdg,
            Csxdg => Csx,
            Dcx => {
                return Err(QcoreError::Unsupported {
                    operation: "DCX".to_string(),
                    action: "inverse (use decompose then invert the ladder)".to_string(),
                })
            }
            Iswap => {
                return Err(QcoreError::Unsupported {
                    operation: "ISWAP".to_string(),
                    action: "inverse (wrap Inverse(ISWAP) instead, ISWAP^2 != I)".to_string(),
                })
            }
            Rxx { theta } => Rxx { theta: -theta.clone() },
            Ryy { theta } => Ryy { theta: -theta.clone() },
            Rzz { theta } => Rzz { theta: -theta.clone() },
            Rzx { theta } => Rzx { theta: -theta.clone() },
            XxPlusYy { theta } => XxPlusYy { theta: -theta.clone() },
            XxMinusYy { theta } => XxMinusYy { theta: -theta.clone() },
            PhaseGradient { n } => {
                return Err(QcoreError::Unsupported {
                    operation: "PhaseGradient".to_string(),
                    action: format!("inverse (wrap Inverse(PhaseGradient({n})) instead)"),
                })
            }
            Qft { .. } => {
                return Err(QcoreError::Unsupported {
                    operation: "QFT".to_string(),
                    action: "inverse (wrap Inverse(QFT(n)) instead)".to_string(),
                })
            }
            GPhase { n, lambda } => GPhase { n: *n, lambda: -lambda.clone() },
            GateRnz { n, theta } => GateRnz { n: *n, theta: -theta.clone() },
            RPauli { pauli_string, theta } => RPauli {
                pauli_string: pauli_string.clone(),
                theta: -theta.clone(),
            },
            Custom { matrix } => Custom { matrix: dagger(matrix) },
            other => other.clone(),
        })
    }
}

// --- small dense-matrix literal helpers -----------------------------------

fn array2<const N: usize>(rows: [[Complex64; N]; N]) -> Array2<Complex64> {
    Array2::from_shape_fn((N, N), |(i, j)| rows[i][j])
}

fn diag2(a: Complex64, b: Complex64) -> Array2<Complex64> {
    array2([[a, Complex64::new(0.0, 0.0)], [Complex64::new(0.0, 0.0), b]])
}

fn diag_matrix(diag: &[Complex64]) -> Array2<Complex64> {
    let n = diag.len();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            diag[i]
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

fn u_matrix(theta: f64, phi: f64, lambda: f64, gamma: f64) -> Array2<Complex64> {
    let (ch, sh) = ((theta / 2.0).cos(), (theta / 2.0).sin());
    let m = array2([
        [Complex64::new(ch, 0.0), -cis(lambda) * sh],
        [cis(phi) * sh, cis(phi + lambda) * ch],
    ]);
    m.mapv(|x| x * cis(gamma))
}

fn swap_two_qubit_operands(m: &Array2<Complex64>) -> Array2<Complex64> {
    // Relabels basis |ab> -> |ba> for a 2-qubit (4x4) matrix: swaps the
    // roles of control and target.
    let perm = [0usize, 2, 1, 3];
    Array2::from_shape_fn((4, 4), |(i, j)| m[(perm[i], perm[j])])
}

fn qft_matrix(n: usize) -> Array2<Complex64> {
    let dim = 1usize << n;
    let norm = 1.0 / (dim as f64).sqrt();
    Array2::from_shape_fn((dim, dim), |(j, k)| {
        cis(2.0 * PI * (j as f64) * (k as f64) / (dim as f64)) * norm
    })
}

fn rpauli_matrix(pauli_string: &[Pauli], theta: f64) -> Result<Array2<Complex64>> {
    let n = pauli_string.len();
    if n == 0 {
        return Ok(identity(1));
    }
    // Basis change: H for X, HYZ for Y, identity for Z/I.
    let basis_change: Vec<Array2<Complex64>> = pauli_string
        .iter()
        .map(|p| match p {
            Pauli::X => Gate::H.matrix(),
            Pauli::Y => Gate::Hyz.matrix(),
            Pauli::Z | Pauli::I => Gate::Id.matrix(),
        })
        .collect::<Result<Vec<_>>>()?;
    let change = kron_all(&basis_change);
    // Active qubits are those that are not Pauli::I; RNZ acts on all n
    // qubits here (identity-string entries get basis change Id, which
    // leaves them invariant so they don't affect the phase -- matches a
    // parity computed only over active qubits).
    let active: Vec<usize> = pauli_string
        .iter()
        .enumerate()
        .filter(|(_, p)| **p != Pauli::I)
        .map(|(i, _)| i)
        .collect();
    if active.is_empty() {
        // All-identity Pauli string: global phase only, per §4.4.
        let mut m = identity(1usize << n);
        m.mapv_inplace(|x| x * cis(-theta / 2.0));
        return Ok(m);
    }
    let dim = 1usize << n;
    let diag: Vec<Complex64> = (0..dim)
        .map(|k| {
            let parity: u32 = active
                .iter()
                .map(|&qi| (k >> (n - 1 - qi)) & 1)
                .sum();
            if parity % 2 == 0 {
                cis(-theta / 2.0)
            } else {
                cis(theta / 2.0)
            }
        })
        .collect();
    let rnz = diag_matrix(&diag);
    Ok(change.dot(&rnz).dot(&dagger(&change)))
}

/// A single-qubit/two-qubit/multi-qubit gate's `power()` closure, honoring
/// the rational-exponent root identities of §4.3. Returns `None` when the
/// exponent does not hit a specific closed form, in which case the caller
/// wraps the gate in a generic `Power` node.
pub fn gate_power(gate: &Gate, exponent: &CalculatorFloat) -> Option<Operation> {
    let p = f64::try_from(exponent.clone()).ok()?;
    let is_int = |x: f64| (x - x.round()).abs() < 1e-9;

    match gate {
        Gate::X | Gate::Y | Gate::Z | Gate::H | Gate::Swap | Gate::Ecr | Gate::Cx | Gate::Cy
        | Gate::Cz
            if is_int(p) =>
        {
            let k = p.round() as i64;
            let m = k.rem_euclid(2);
            if m == 0 {
                Some(identity_like(gate))
            } else {
                Some(Operation::Gate(gate.clone()))
            }
        }
        // Rational-exponent roots named explicitly in §8's testable
        // properties: sqrt(X) = SX, sqrt(Z) = S, sqrt(S) = T. An analogous
        // sqrt(Y) = SY shortcut is not exercised by those properties and is
        // left wrapped in a generic `Power` node rather than guessed at.
        Gate::X if (p - 0.5).abs() < 1e-9 => Some(Operation::Gate(Gate::Sx)),
        Gate::Z if (p - 0.5).abs() < 1e-9 => Some(Operation::Gate(Gate::S)),
        Gate::Sx if (p - 2.0).abs() < 1e-9 => Some(Operation::Gate(Gate::X)),
        Gate::Sx if (p - 3.0).abs() < 1e-9 => Some(Operation::Gate(Gate::Sxdg)),
        Gate::S if (p - 0.5).abs() < 1e-9 => Some(Operation::Gate(Gate::T)),
        Gate::S if (p - 2.0).abs() < 1e-9 => Some(Operation::Gate(Gate::Z)),
        Gate::S if (p - 3.0).abs() < 1e-9 => Some(Operation::Gate(Gate::Sdg)),
        Gate::T if (p - 2.0).abs() < 1e-9 => Some(Operation::Gate(Gate::S)),
        Gate::Rx { theta } => Some(Operation::Gate(Gate::Rx { theta: theta.clone() * p })),
        Gate::Ry { theta } => Some(Operation::Gate(Gate::Ry { theta: theta.clone() * p })),
        Gate::Rz { theta } => Some(Operation::Gate(Gate::Rz { theta: theta.clone() * p })),
        Gate::R { theta, phi } => Some(Operation::Gate(Gate::R {
            theta: theta.clone() * p,
            phi: phi.clone(),
        })),
        Gate::P { lambda } => Some(Operation::Gate(Gate::P { lambda: lambda.clone() * p })),
        _ => None,
    }
}

/// The identity operation on `gate`'s own arity: plain `Gate::Id` for a
/// 1-qubit gate, an `n`-fold parallel product of `Gate::Id` for an
/// `n`-qubit gate, so `g.power(2)` for an idempotent multi-qubit gate
/// (SWAP, CX, CY, CZ, ECR, ...) keeps the caller's arity instead of
/// collapsing to a bare 1-qubit identity.
fn identity_like(gate: &Gate) -> Operation {
    match gate.num_qubits() {
        1 => Operation::Gate(Gate::Id),
        n => Operation::Parallel(n, Box::new(Operation::Gate(Gate::Id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix_utils::is_unitary;

    #[test]
    fn standard_gates_are_unitary() {
        for g in [
            Gate::X,
            Gate::Y,
            Gate::Z,
            Gate::H,
            Gate::S,
            Gate::T,
            Gate::Sx,
            Gate::Sy,
            Gate::Hxy,
            Gate::Hyz,
            Gate::Cx,
            Gate::Cy,
            Gate::Cz,
            Gate::Swap,
            Gate::Iswap,
            Gate::Ecr,
            Gate::Ccx,
            Gate::Cswap,
            Gate::C3x,
        ] {
            let m = g.matrix().unwrap();
            assert!(is_unitary(&m, 1e-8), "{} not unitary", g.name());
        }
    }

    #[test]
    fn root_identities() {
        let sx2 = Gate::Sx.matrix().unwrap().dot(&Gate::Sx.matrix().unwrap());
        assert!(is_unitary(&sx2, 1e-8));
        let x = Gate::X.matrix().unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert!((sx2[(i, j)] - x[(i, j)]).norm() < 1e-8);
            }
        }
    }

    #[test]
    fn sqrt_y_stays_a_power_node() {
        let half = CalculatorFloat::from(0.5);
        assert!(gate_power(&Gate::Y, &half).is_none());
    }

    #[test]
    fn h_decomposes_to_u() {
        let h = Gate::H.matrix().unwrap();
        let u = Gate::U {
            theta: CalculatorFloat::from(PI / 2.0),
            phi: CalculatorFloat::from(0.0),
            lambda: CalculatorFloat::from(PI),
            gamma: CalculatorFloat::from(0.0),
        }
        .matrix()
        .unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert!((h[(i, j)] - u[(i, j)]).norm() < 1e-8);
            }
        }
    }

    #[test]
    fn symbolic_matrix_fails() {
        let rz = Gate::Rz {
            theta: CalculatorFloat::from("theta"),
        };
        assert!(matches!(rz.matrix(), Err(QcoreError::Symbolic { .. })));
    }

    #[test]
    fn custom_matrix_roundtrips() {
        let m = Gate::X.matrix().unwrap();
        let custom = Gate::Custom { matrix: m.clone() };
        assert_eq!(custom.matrix().unwrap(), m);
    }
}
