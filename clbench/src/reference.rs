//! Host models of the device decompositions.
//!
//! These follow the kernels' index arithmetic and `f32` accumulation, one
//! simulated work item at a time, so tiling and reduction schemes can be
//! checked against the plain references without a device.

use crate::error::{BenchError, Result};
use crate::matmul::{check_block_divisible, MatmulShape};
use crate::pi::PiProblem;

fn check_operands(left: &[f32], right: &[f32], shape: &MatmulShape) -> Result<()> {
    if left.len() != shape.left_len() || right.len() != shape.right_len() {
        return Err(BenchError::ConfigInvalid(format!(
            "operands of {} and {} elements do not match {shape}",
            left.len(),
            right.len()
        )));
    }
    Ok(())
}

/// One output element per work item, inner product in index order.
pub fn matmul_naive(left: &[f32], right: &[f32], shape: &MatmulShape) -> Result<Vec<f32>> {
    check_operands(left, right, shape)?;
    let MatmulShape { m, n, o } = *shape;
    let mut out = vec![0.0f32; m * o];
    for i in 0..m {
        for j in 0..o {
            let mut sum = 0.0f32;
            for k in 0..n {
                sum += left[i * n + k] * right[k * o + j];
            }
            out[i * o + j] = sum;
        }
    }
    Ok(out)
}

/// Square `block` tiles of both operands staged per work group, as in
/// `matmul_blocked.cl`.
pub fn matmul_blocked(
    left: &[f32],
    right: &[f32],
    shape: &MatmulShape,
    block: usize,
) -> Result<Vec<f32>> {
    check_operands(left, right, shape)?;
    check_block_divisible(shape, block)?;
    let MatmulShape { m, n, o } = *shape;

    let mut out = vec![0.0f32; m * o];
    let mut a_tile = vec![0.0f32; block * block];
    let mut b_tile = vec![0.0f32; block * block];
    let mut acc = vec![0.0f32; block * block];

    for group_i in 0..m / block {
        for group_j in 0..o / block {
            acc.fill(0.0);
            for b in 0..n / block {
                // Every work item loads one element of each tile.
                for li in 0..block {
                    for lj in 0..block {
                        let i = group_i * block + li;
                        let j = group_j * block + lj;
                        a_tile[li * block + lj] = left[i * n + b * block + lj];
                        b_tile[li * block + lj] = right[(b * block + li) * o + j];
                    }
                }
                for li in 0..block {
                    for lj in 0..block {
                        let mut sum = acc[li * block + lj];
                        for k in 0..block {
                            sum += a_tile[li * block + k] * b_tile[k * block + lj];
                        }
                        acc[li * block + lj] = sum;
                    }
                }
            }
            for li in 0..block {
                let row = (group_i * block + li) * o + group_j * block;
                out[row..row + block].copy_from_slice(&acc[li * block..(li + 1) * block]);
            }
        }
    }
    Ok(out)
}

/// Per-group partial sums as `simple_pi.cl` writes them.
pub fn pi_partial_sums(problem: &PiProblem) -> Vec<f32> {
    let n = problem.rectangles;
    let step = 1.0f32 / n as f32;

    let item_sums: Vec<f32> = (0..problem.padded_items())
        .map(|gid| {
            let start = gid * problem.per_item;
            let end = (start + problem.per_item).min(n);
            let base = start as f32 * step;
            let mut acc = 0.0f32;
            let mut carry = 0.0f32;
            for k in start..end {
                let x = base + ((k - start) as f32 + 0.5) * step;
                let y = 4.0 / (1.0 + x * x) - carry;
                let t = acc + y;
                carry = (t - acc) - y;
                acc = t;
            }
            acc * step
        })
        .collect();

    item_sums
        .chunks(problem.group)
        .map(|group| group.iter().sum())
        .collect()
}

/// Final host-side reduction of the group partial sums.
pub fn sum_partials(partials: &[f32]) -> f64 {
    partials.iter().map(|&p| f64::from(p)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, scale: f32) -> Vec<f32> {
        (0..len).map(|i| (i % 13) as f32 * scale).collect()
    }

    #[test]
    fn blocked_matches_naive_on_rectangular_shape() {
        let shape = MatmulShape::new(32, 48, 16).unwrap();
        let left = ramp(shape.left_len(), 0.25);
        let right = ramp(shape.right_len(), 0.5);
        let naive = matmul_naive(&left, &right, &shape).unwrap();
        let blocked = matmul_blocked(&left, &right, &shape, 16).unwrap();
        // Small integers times powers of two: both orders are exact.
        assert_eq!(naive, blocked);
    }

    #[test]
    fn blocked_rejects_indivisible_order() {
        let shape = MatmulShape::square(20).unwrap();
        let data = vec![1.0; 400];
        assert!(matches!(
            matmul_blocked(&data, &data, &shape, 16),
            Err(BenchError::ConfigInvalid(_))
        ));
        assert!(matmul_blocked(&data, &data, &shape, 4).is_ok());
    }

    #[test]
    fn operand_lengths_are_checked() {
        let shape = MatmulShape::square(4).unwrap();
        assert!(matmul_naive(&[1.0; 15], &[1.0; 16], &shape).is_err());
    }

    #[test]
    fn one_partial_sum_per_group() {
        let problem = PiProblem::new(1000, 30, 8).unwrap();
        assert_eq!(pi_partial_sums(&problem).len(), problem.work_groups());
    }
}
