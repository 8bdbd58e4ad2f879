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

//! Non-unitary noise channels: a general Kraus representation and a
//! probabilistic mixture of unitaries. Both are validated to be CPTP at
//! construction time and neither supports `inverse`/`power` -- physical
//! noise is not invertible.

use crate::matrix_utils::dagger;
use crate::{QcoreError, Result};
use ndarray::Array2;
use num_complex::Complex64;
use qoqo_calculator::CalculatorFloat;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

const CPTP_TOLERANCE: f64 = 1e-8;
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-13;

/// A quantum channel given by its Kraus operators `{K_i}`, satisfying the
/// completeness relation `sum_i K_i^dagger K_i = I`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct KrausChannel {
    n: usize,
    operators: Vec<Array2<Complex64>>,
}

impl KrausChannel {
    /// Builds a Kraus channel acting on `n` qubits from its operators.
    /// Fails with [`QcoreError::Domain`] if any operator's shape does not
    /// match `2^n x 2^n` or the completeness relation is violated beyond
    /// `1e-8`.
    pub fn new(n: usize, operators: Vec<Array2<Complex64>>) -> Result<Self> {
        let dim = 1usize << n;
        if operators.is_empty() {
            return Err(QcoreError::Domain {
                operation: "KrausChannel".to_string(),
                message: "at least one Kraus operator is required".to_string(),
            });
        }
        for m in &operators {
            if m.dim() != (dim, dim) {
                return Err(QcoreError::Domain {
                    operation: "KrausChannel".to_string(),
                    message: format!("operator shape {:?} does not match {dim}x{dim}", m.dim()),
                });
            }
        }
        let mut completeness = Array2::<Complex64>::zeros((dim, dim));
        for m in &operators {
            completeness = completeness + dagger(m).dot(m);
        }
        for i in 0..dim {
            for j in 0..dim {
                let expected = if i == j { 1.0 } else { 0.0 };
                if (completeness[(i, j)] - Complex64::new(expected, 0.0)).norm() > CPTP_TOLERANCE {
                    return Err(QcoreError::Domain {
                        operation: "KrausChannel".to_string(),
                        message: "Kraus operators do not satisfy the completeness relation"
                            .to_string(),
                    });
                }
            }
        }
        Ok(KrausChannel { n, operators })
    }

    /// Number of qubits the channel acts on.
    pub fn num_qubits(&self) -> usize {
        self.n
    }

    /// The Kraus operators.
    pub fn krausmatrices(&self) -> &[Array2<Complex64>] {
        &self.operators
    }

    /// Kraus channels carry no symbolic parameters: they are always fully
    /// numeric once constructed.
    pub fn is_symbolic(&self) -> bool {
        false
    }
}

/// A probabilistic mixture of unitaries `sum_i p_i U_i rho U_i^dagger`,
/// with `sum_i p_i = 1`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct MixedUnitary {
    n: usize,
    unitaries: Vec<Array2<Complex64>>,
    probabilities: Vec<CalculatorFloat>,
}

impl MixedUnitary {
    /// Builds a mixed-unitary channel. Fails with [`QcoreError::Domain`] if
    /// the number of unitaries and probabilities differ, a unitary's shape
    /// does not match `2^n x 2^n`, a unitary is not unitary within `1e-8`,
    /// or the (numeric) probabilities do not sum to `1` within `1e-8`.
    pub fn new(
        n: usize,
        unitaries: Vec<Array2<Complex64>>,
        probabilities: Vec<CalculatorFloat>,
    ) -> Result<Self> {
        if n == 0 || n > 2 {
            return Err(QcoreError::Domain {
                operation: "MixedUnitary".to_string(),
                message: format!("mixed-unitary channels only support 1 or 2 qubits, got {n}"),
            });
        }
        if unitaries.len() != probabilities.len() {
            return Err(QcoreError::Arity {
                operation: "MixedUnitary".to_string(),
                message: format!(
                    "{} unitaries but {} probabilities",
                    unitaries.len(),
                    probabilities.len()
                ),
            });
        }
        let dim = 1usize << n;
        for u in &unitaries {
            if u.dim() != (dim, dim) {
                return Err(QcoreError::Domain {
                    operation: "MixedUnitary".to_string(),
                    message: format!("unitary shape {:?} does not match {dim}x{dim}", u.dim()),
                });
            }
            if !crate::matrix_utils::is_unitary(u, CPTP_TOLERANCE) {
                return Err(QcoreError::Domain {
                    operation: "MixedUnitary".to_string(),
                    message: "one of the mixture's components is not unitary".to_string(),
                });
            }
        }
        if let Ok(numeric) = probabilities
            .iter()
            .cloned()
            .map(f64::try_from)
            .collect::<std::result::Result<Vec<f64>, _>>()
        {
            for &p in &numeric {
                if !(0.0..=1.0).contains(&p) {
                    return Err(QcoreError::Domain {
                        operation: "MixedUnitary".to_string(),
                        message: format!("probability {p} is outside [0, 1]"),
                    });
                }
            }
            let total: f64 = numeric.iter().sum();
            if (total - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
                return Err(QcoreError::Domain {
                    operation: "MixedUnitary".to_string(),
                    message: format!("probabilities sum to {total}, not 1"),
                });
            }
        }
        Ok(MixedUnitary {
            n,
            unitaries,
            probabilities,
        })
    }

    /// Number of qubits the channel acts on.
    pub fn num_qubits(&self) -> usize {
        self.n
    }

    /// The mixture's unitary components.
    pub fn unitarymatrices(&self) -> &[Array2<Complex64>] {
        &self.unitaries
    }

    /// The mixture's probability weights, in the same order as
    /// [`Self::unitarymatrices`].
    pub fn probabilities(&self) -> &[CalculatorFloat] {
        &self.probabilities
    }

    /// Whether any mixture probability is still symbolic.
    pub fn is_symbolic(&self) -> bool {
        self.probabilities
            .iter()
            .any(|p| f64::try_from(p.clone()).is_err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix_utils::identity;

    #[test]
    fn identity_kraus_channel_is_valid() {
        let k = KrausChannel::new(1, vec![identity(2)]).unwrap();
        assert_eq!(k.krausmatrices().len(), 1);
    }

    #[test]
    fn incomplete_kraus_operators_rejected() {
        let half = identity(2).mapv(|x| x * Complex64::new(0.5, 0.0));
        assert!(matches!(
            KrausChannel::new(1, vec![half]),
            Err(QcoreError::Domain { .. })
        ));
    }

    #[test]
    fn mixed_unitary_probabilities_must_sum_to_one() {
        let result = MixedUnitary::new(
            1,
            vec![identity(2), identity(2)],
            vec![CalculatorFloat::from(0.4), CalculatorFloat::from(0.4)],
        );
        assert!(matches!(result, Err(QcoreError::Domain { .. })));
    }

    #[test]
    fn mixed_unitary_rejects_out_of_range_probability() {
        let result = MixedUnitary::new(
            1,
            vec![identity(2), identity(2)],
            vec![CalculatorFloat::from(1.4), CalculatorFloat::from(-0.4)],
        );
        assert!(matches!(result, Err(QcoreError::Domain { .. })));
    }

    #[test]
    fn mixed_unitary_rejects_more_than_two_qubits() {
        let result = MixedUnitary::new(3, vec![identity(8)], vec![CalculatorFloat::from(1.0)]);
        assert!(matches!(result, Err(QcoreError::Domain { .. })));
    }
}
