//! Tests for the sparse inverse and pseudo-inverse.
//!
//! Square systems are checked by round-tripping through the matrix, tall systems against an
//! independent dense QR least-squares solve, wide systems against a hand-computed minimum-norm
//! solution. Both factorization backends are expected to agree, including on badly scaled
//! matrices.

use approx::assert_abs_diff_eq;
use faer::linalg::solvers::{Qr, SolveLstsqCore};
use faer::{Conj, Mat};
use discrete_ops::{
    BackendKind, DType, DenseArray, DenseLuBackend, DiscreteOperator, OpError, SolverOptions, SparseArray,
    SparseLuBackend, SparseSolver, Strategy,
};
use num_complex::Complex64;
use rand::Rng;

fn max_diff(a: &DenseArray, b: &DenseArray) -> f64 {
    a.sub(b).unwrap().max_abs()
}

/// Random diagonally dominant sparse matrix, hence nonsingular.
fn random_dominant(n: usize) -> SparseArray {
    let mut rng = rand::thread_rng();
    let mut triplets = Vec::new();
    for j in 0..n {
        triplets.push((j, j, 4.0 + rng.gen_range(0.0..1.0f64)));
        for i in 0..n {
            if i != j && rng.gen_bool(0.15) {
                triplets.push((i, j, rng.gen_range(-3.0 / n as f64..3.0 / n as f64)));
            }
        }
    }
    SparseArray::from_triplets(n, n, &triplets).unwrap()
}

fn random_full_rank_tall(rows: usize, cols: usize) -> SparseArray {
    // identity on top keeps the columns independent
    let mut rng = rand::thread_rng();
    let mut triplets: Vec<(usize, usize, f64)> = (0..cols).map(|j| (j, j, 1.0)).collect();
    for i in cols..rows {
        for j in 0..cols {
            if rng.gen_bool(0.5) {
                triplets.push((i, j, rng.gen_range(-1.0..1.0)));
            }
        }
    }
    SparseArray::from_triplets(rows, cols, &triplets).unwrap()
}

fn random_vector(n: usize) -> DenseArray {
    let mut rng = rand::thread_rng();
    DenseArray::from_fn(n, 1, |_, _| rng.gen_range(-1.0..1.0f64))
}

#[test]
fn square_diagonal_inverse() {
    let m = SparseArray::from_triplets(2, 2, &[(0, 0, 2.0), (1, 1, 4.0)]).unwrap();
    let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default()).unwrap();
    assert_eq!(inv.shape(), (2, 2));
    assert_eq!(inv.dtype(), DType::Float64);

    let x = inv.apply(&DenseArray::from_column(&[2.0, 4.0])).unwrap().to_vec::<f64>();
    assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-10);

    let expected = DenseArray::from_row_major(2, 2, &[0.5, 0.0, 0.0, 0.25]).unwrap();
    assert_abs_diff_eq!(max_diff(&inv.to_dense().unwrap().into_dense(), &expected), 0.0, epsilon = 1e-10);
}

#[test]
fn square_inverse_round_trips_with_both_backends() {
    let n = 25;
    let m = random_dominant(n);
    let op = DiscreteOperator::sparse(m.clone());
    let b = random_vector(n);
    let mut solutions = Vec::new();
    for kind in [BackendKind::SparseLu, BackendKind::DenseLu] {
        let inv = DiscreteOperator::inverse_sparse(&op, &SolverOptions::default().with_backend(kind)).unwrap();
        let x = inv.apply(&b).unwrap();
        assert_abs_diff_eq!(max_diff(&m.mul_dense(&x).unwrap(), &b), 0.0, epsilon = 1e-10);
        // M⁻¹ M = I
        let eye = inv.compose(&op).unwrap().to_dense().unwrap().into_dense();
        assert_abs_diff_eq!(max_diff(&eye, &DenseArray::identity(n, DType::Float64)), 0.0, epsilon = 1e-10);
        solutions.push(x);
    }
    assert_abs_diff_eq!(max_diff(&solutions[0], &solutions[1]), 0.0, epsilon = 1e-10);
}

/// Least-squares solution of `m x = b` from a dense Householder QR.
fn qr_least_squares(m: &SparseArray, b: &DenseArray) -> Vec<f64> {
    let a: Mat<f64> = m.to_dense().to_mat::<f64>().into_owned();
    let mut x: Mat<f64> = b.to_mat::<f64>().into_owned();
    Qr::new(a.as_ref()).solve_lstsq_in_place_with_conj(Conj::No, x.as_mut());
    (0..m.ncols()).map(|i| x[(i, 0)]).collect()
}

#[test]
fn tall_system_matches_qr_least_squares() {
    let m = random_full_rank_tall(8, 3);
    let solver = SparseSolver::new(&m, &SparseLuBackend::default()).unwrap();
    assert_eq!(solver.strategy(), Strategy::LeastSquares);

    let b = random_vector(8);
    let expected = qr_least_squares(&m, &b);
    for kind in [BackendKind::SparseLu, BackendKind::DenseLu] {
        let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default().with_backend(kind)).unwrap();
        assert_eq!(inv.shape(), (3, 8));
        let x = inv.apply(&b).unwrap().to_vec::<f64>();
        for (xi, ei) in x.iter().zip(&expected) {
            assert_abs_diff_eq!(*xi, *ei, epsilon = 1e-10);
        }
    }
}

#[test]
fn badly_scaled_matrices_factorize_on_both_backends() {
    // diag(1e-15, 1): tiny but nonzero pivot
    let square = SparseArray::from_triplets(2, 2, &[(0, 0, 1e-15), (1, 1, 1.0)]).unwrap();
    // [[1e-8, 0], [0, 1], [0, 0]]: Gram matrix is diag(1e-16, 1)
    let tall = SparseArray::from_triplets(3, 2, &[(0, 0, 1e-8), (1, 1, 1.0)]).unwrap();
    let cases = [
        (square, DenseArray::from_column(&[1e-15, 3.0]), [1.0, 3.0]),
        (tall, DenseArray::from_column(&[1e-8, 2.0, 5.0]), [1.0, 2.0]),
    ];
    for (m, b, expected) in cases {
        let mut solutions = Vec::new();
        for kind in [BackendKind::SparseLu, BackendKind::DenseLu] {
            let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default().with_backend(kind))
                .unwrap_or_else(|err| panic!("{kind} rejected a nonsingular matrix: {err}"));
            let x = inv.apply(&b).unwrap().to_vec::<f64>();
            for (xi, ei) in x.iter().zip(expected) {
                assert_abs_diff_eq!(*xi, ei, epsilon = 1e-8);
            }
            solutions.push(x);
        }
        for (a, b) in solutions[0].iter().zip(&solutions[1]) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
        }
    }
    let tall = SparseArray::from_triplets(3, 2, &[(0, 0, 1e-8), (1, 1, 1.0)]).unwrap();
    let b = DenseArray::from_column(&[1e-8, 2.0, 5.0]);
    let qr = qr_least_squares(&tall, &b);
    assert_abs_diff_eq!(qr[0], 1.0, epsilon = 1e-8);
}

#[test]
fn tall_system_with_exact_data_is_recovered() {
    // [[1,0],[0,1],[1,1]] x = [1,2,3] has the exact solution [1,2]
    let m = SparseArray::from_triplets(3, 2, &[(0, 0, 1.0), (2, 0, 1.0), (1, 1, 1.0), (2, 1, 1.0)]).unwrap();
    let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default()).unwrap();
    let x = inv.apply(&DenseArray::from_column(&[1.0, 2.0, 3.0])).unwrap().to_vec::<f64>();
    assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-10);
}

#[test]
fn wide_system_gets_the_minimum_norm_solution() {
    // [[1,1,0],[0,0,1]] x = [2,3]; null space is spanned by (1,-1,0)
    let m = SparseArray::from_triplets(2, 3, &[(0, 0, 1.0), (0, 1, 1.0), (1, 2, 1.0)]).unwrap();
    let solver = SparseSolver::new(&m, &SparseLuBackend::default()).unwrap();
    assert_eq!(solver.strategy(), Strategy::MinimumNorm);

    let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default()).unwrap();
    assert_eq!(inv.shape(), (3, 2));
    let x = inv.apply(&DenseArray::from_column(&[2.0, 3.0])).unwrap().to_vec::<f64>();
    for (xi, ei) in x.iter().zip([1.0, 1.0, 3.0]) {
        assert_abs_diff_eq!(*xi, ei, epsilon = 1e-10);
    }
}

#[test]
fn complex_rhs_on_real_factorization_is_split() {
    let m = random_dominant(6);
    let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default()).unwrap();
    let re = random_vector(6);
    let im = random_vector(6);
    let b = DenseArray::from_parts(&re, &im).unwrap();

    let x = inv.apply(&b).unwrap();
    assert_eq!(x.dtype(), DType::Complex128);
    let expected = DenseArray::from_parts(&inv.apply(&re).unwrap(), &inv.apply(&im).unwrap()).unwrap();
    assert_abs_diff_eq!(max_diff(&x, &expected), 0.0, epsilon = 1e-14);
    assert_abs_diff_eq!(max_diff(&m.mul_dense(&x).unwrap(), &b), 0.0, epsilon = 1e-10);
}

#[test]
fn complex_matrix_transpose_and_adjoint_inverse() {
    let m = SparseArray::from_triplets(
        3,
        3,
        &[
            (0, 0, Complex64::new(2.0, 1.0)),
            (1, 0, Complex64::new(0.0, -1.0)),
            (1, 1, Complex64::new(3.0, 0.0)),
            (0, 2, Complex64::new(1.0, 1.0)),
            (2, 2, Complex64::new(1.0, -2.0)),
        ],
    )
    .unwrap();
    let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default()).unwrap();
    assert_eq!(inv.dtype(), DType::Complex128);
    let dense_inv = inv.to_dense().unwrap().into_dense();
    let eye = m.to_dense().matmul(&dense_inv).unwrap();
    assert_abs_diff_eq!(max_diff(&eye, &DenseArray::identity(3, DType::Complex128)), 0.0, epsilon = 1e-12);

    let t = inv.transpose().to_dense().unwrap().into_dense();
    assert_abs_diff_eq!(max_diff(&t, &dense_inv.transpose()), 0.0, epsilon = 1e-12);
    let h = inv.adjoint().to_dense().unwrap().into_dense();
    assert_abs_diff_eq!(max_diff(&h, &dense_inv.adjoint()), 0.0, epsilon = 1e-12);
}

#[test]
fn transposed_pseudo_inverses() {
    for (rows, cols) in [(7, 3), (3, 7)] {
        let m = if rows > cols {
            random_full_rank_tall(rows, cols)
        } else {
            random_full_rank_tall(cols, rows).transpose()
        };
        let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default()).unwrap();
        let p = inv.to_dense().unwrap().into_dense();
        let pt = inv.transpose();
        assert_eq!(pt.shape(), (rows, cols));
        let pt = pt.to_dense().unwrap().into_dense();
        assert_abs_diff_eq!(max_diff(&pt, &p.transpose()), 0.0, epsilon = 1e-10);
    }
}

#[test]
fn narrow_matrix_inverse_stays_narrow() {
    let m = SparseArray::from_triplets(2, 2, &[(0, 0, 2.0f32), (0, 1, 1.0f32), (1, 1, 4.0f32)]).unwrap();
    let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default()).unwrap();
    assert_eq!(inv.dtype(), DType::Float32);
    let x = inv.apply(&DenseArray::from_column(&[3.0f32, 4.0])).unwrap();
    assert_eq!(x.dtype(), DType::Float32);
    let x = x.to_vec::<f32>();
    assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-6);
}

#[test]
fn singular_matrix_fails_to_factorize() {
    let m = SparseArray::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, 2.0), (0, 1, 2.0), (1, 1, 4.0)]).unwrap();
    for backend in [BackendKind::SparseLu, BackendKind::DenseLu] {
        let err = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default().with_backend(backend)).unwrap_err();
        assert!(matches!(err, OpError::Factorization(_)), "{backend}: {err}");
    }
    // rank-deficient tall matrix: the Gram matrix is singular
    let tall = SparseArray::from_triplets(3, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 0, 2.0), (1, 1, 2.0)]).unwrap();
    assert!(matches!(
        SparseSolver::new(&tall, &DenseLuBackend),
        Err(OpError::Factorization(_))
    ));
}

#[test]
fn non_sparse_operands_are_rejected() {
    let dense = DiscreteOperator::dense(DenseArray::identity(2, DType::Float64));
    let err = DiscreteOperator::inverse_sparse(&dense, &SolverOptions::default()).unwrap_err();
    assert!(matches!(err, OpError::UnsupportedType(_)));

    let s = DiscreteOperator::sparse(SparseArray::identity(2, DType::Float64));
    let sum = s.add(&s).unwrap();
    assert!(matches!(
        DiscreteOperator::inverse_sparse(&sum, &SolverOptions::default()),
        Err(OpError::UnsupportedType(_))
    ));
}

#[test]
fn factorization_is_shared_across_threads() {
    let m = random_dominant(10);
    let inv = DiscreteOperator::inverse_sparse(&m, &SolverOptions::default()).unwrap();
    let b = random_vector(10);
    let expected = inv.apply(&b).unwrap().to_vec::<f64>();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(inv.apply(&b).unwrap().to_vec::<f64>(), expected);
            });
        }
    });
}
