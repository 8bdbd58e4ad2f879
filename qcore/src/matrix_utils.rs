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

//! Small dense-matrix helpers shared by the gate algebra: Kronecker
//! products, identity blocks, and the unitarity check used by `Custom` and
//! `MixedUnitary`.

use ndarray::Array2;
use num_complex::Complex64;

/// `n`x`n` complex identity matrix.
pub fn identity(n: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            Complex64::new(1.0, 0.0)
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

/// Kronecker product `a ⊗ b`.
pub fn kron(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    Array2::from_shape_fn((ar * br, ac * bc), |(i, j)| {
        a[(i / br, j / bc)] * b[(i % br, j % bc)]
    })
}

/// Kronecker product of a list of matrices, left to right.
pub fn kron_all(mats: &[Array2<Complex64>]) -> Array2<Complex64> {
    mats.iter()
        .skip(1)
        .fold(mats[0].clone(), |acc, m| kron(&acc, m))
}

/// Conjugate transpose.
pub fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().map(|c| c.conj())
}

/// Checks `M · M† == I` within `tolerance` (max absolute entrywise
/// deviation).
pub fn is_unitary(m: &Array2<Complex64>, tolerance: f64) -> bool {
    let (rows, cols) = m.dim();
    if rows != cols {
        return false;
    }
    let product = m.dot(&dagger(m));
    let id = identity(rows);
    product
        .iter()
        .zip(id.iter())
        .all(|(a, b)| (a - b).norm() <= tolerance)
}

/// Block-diagonal embedding `diag(I_{dim - inner.dim}, inner)`, i.e. the
/// matrix of a controlled operation whose inner matrix acts on the highest
/// basis states (all controls set to 1).
pub fn controlled_block(inner: &Array2<Complex64>, num_controls: u32) -> Array2<Complex64> {
    let inner_dim = inner.dim().0;
    let full_dim = inner_dim * (1usize << num_controls);
    let offset = full_dim - inner_dim;
    Array2::from_shape_fn((full_dim, full_dim), |(i, j)| {
        if i < offset || j < offset {
            if i == j {
                Complex64::new(1.0, 0.0)
            } else {
                Complex64::new(0.0, 0.0)
            }
        } else {
            inner[(i - offset, j - offset)]
        }
    })
}

/// Matrix power of a diagonal matrix via entrywise complex exponentiation
/// of its eigenvalues (exact for diagonal unitaries such as `Z`, `S`, `T`,
/// `P`, `CP`, ...).
pub fn diag_power(diag: &[Complex64], exponent: f64) -> Array2<Complex64> {
    let n = diag.len();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            diag[i].powf(exponent)
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}
