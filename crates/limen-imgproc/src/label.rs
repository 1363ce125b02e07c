use limen_tensor::Tensor;

use crate::error::ThresholdError;

/// Disjoint sets over provisional labels, slot 0 being the background.
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        Self { parent: vec![0] }
    }

    fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    /// Merge two sets, keeping the smaller label as root.
    fn union(&mut self, a: u32, b: u32) -> u32 {
        let (ra, rb) = (self.find(a), self.find(b));
        let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[child as usize] = root;
        root
    }
}

/// Offsets of the neighbours already visited in raster order.
fn backward_neighbours<const N: usize>(connectivity: usize) -> Vec<[isize; N]> {
    let total = 3usize.pow(N as u32);
    (0..total)
        .filter_map(|mut code| {
            let mut off = [0isize; N];
            for axis in (0..N).rev() {
                off[axis] = (code % 3) as isize - 1;
                code /= 3;
            }
            let nonzero = off.iter().filter(|&&d| d != 0).count();
            let first = off.iter().find(|&&d| d != 0).copied();
            (nonzero >= 1 && nonzero <= connectivity && first == Some(-1)).then_some(off)
        })
        .collect()
}

/// Label the connected regions of a boolean mask.
///
/// Two foreground elements are neighbours when they differ by at most one along
/// every axis and along at most `connectivity` axes: `1` connects faces only,
/// `N` the full `3^N - 1` neighbourhood.
///
/// # Arguments
///
/// * `mask` - The foreground mask.
/// * `connectivity` - The neighbourhood order, in `1..=N`.
///
/// # Returns
///
/// The label tensor, with background `0` and regions numbered `1..=count` in
/// raster order of their first element, together with `count`.
///
/// # Errors
///
/// Returns [`ThresholdError::InvalidConnectivity`] if `connectivity` is out of range.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::label::label;
///
/// let mask = Tensor::<bool, 1>::from_shape_vec([6], vec![true, true, false, true, false, true]).unwrap();
/// let (labels, count) = label(&mask, 1).unwrap();
/// assert_eq!(count, 3);
/// assert_eq!(labels.as_slice(), &[1, 1, 0, 2, 0, 3]);
/// ```
pub fn label<const N: usize>(
    mask: &Tensor<bool, N>,
    connectivity: usize,
) -> Result<(Tensor<u32, N>, usize), ThresholdError> {
    if connectivity == 0 || connectivity > N {
        return Err(ThresholdError::InvalidConnectivity {
            connectivity,
            ndim: N,
        });
    }

    let neighbours = backward_neighbours::<N>(connectivity);
    let mut labels = Tensor::<u32, N>::zeros(mask.shape);
    let mut sets = UnionFind::new();

    // first pass: provisional labels and equivalences
    for (offset, &fg) in mask.iter().enumerate() {
        if !fg {
            continue;
        }
        let idx = mask.get_index_unchecked(offset);
        let mut current = 0u32;
        for off in neighbours.iter() {
            let mut q = 0;
            let mut inside = true;
            for axis in 0..N {
                let pos = idx[axis] as isize + off[axis];
                if pos < 0 || pos >= mask.shape[axis] as isize {
                    inside = false;
                    break;
                }
                q += pos as usize * mask.strides[axis];
            }
            if !inside {
                continue;
            }
            let other = labels.as_slice()[q];
            if other == 0 {
                continue;
            }
            current = if current == 0 {
                sets.find(other)
            } else {
                sets.union(current, other)
            };
        }
        if current == 0 {
            current = sets.make_set();
        }
        labels.as_slice_mut()[offset] = current;
    }

    // second pass: consecutive labels in order of first appearance
    let mut remap = vec![0u32; sets.parent.len()];
    let mut count = 0u32;
    for offset in 0..labels.numel() {
        let provisional = labels.as_slice()[offset];
        if provisional == 0 {
            continue;
        }
        let root = sets.find(provisional) as usize;
        if remap[root] == 0 {
            count += 1;
            remap[root] = count;
        }
        labels.as_slice_mut()[offset] = remap[root];
    }

    Ok((labels, count as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use limen_tensor::{Tensor2, Tensor3};

    fn mask_2d(rows: &[&str]) -> Result<Tensor2<bool>, ThresholdError> {
        let cols = rows[0].len();
        let data = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        Ok(Tensor2::from_shape_vec([rows.len(), cols], data)?)
    }

    #[test]
    fn test_backward_neighbours() {
        assert_eq!(backward_neighbours::<2>(1), vec![[-1, 0], [0, -1]]);
        assert_eq!(
            backward_neighbours::<2>(2),
            vec![[-1, -1], [-1, 0], [-1, 1], [0, -1]]
        );
        assert_eq!(backward_neighbours::<3>(3).len(), 13);
    }

    #[test]
    fn test_label_connectivity() -> Result<(), ThresholdError> {
        let mask = mask_2d(&["#..", ".#.", "..#"])?;

        let (labels, count) = label(&mask, 1)?;
        assert_eq!(count, 3);
        assert_eq!(labels.as_slice(), &[1, 0, 0, 0, 2, 0, 0, 0, 3]);

        let (labels, count) = label(&mask, 2)?;
        assert_eq!(count, 1);
        assert_eq!(labels.as_slice(), &[1, 0, 0, 0, 1, 0, 0, 0, 1]);
        Ok(())
    }

    #[test]
    fn test_label_merges_u_shape() -> Result<(), ThresholdError> {
        // both arms start as separate regions and meet on the last row
        let mask = mask_2d(&["#.#", "#.#", "###", "...", ".#."])?;
        let (labels, count) = label(&mask, 1)?;
        assert_eq!(count, 2);
        assert_eq!(
            labels.as_slice(),
            &[1, 0, 1, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 2, 0]
        );
        Ok(())
    }

    #[test]
    fn test_label_3d() -> Result<(), ThresholdError> {
        let mut mask = Tensor3::<bool>::from_shape_val([3, 3, 3], false);
        for idx in [[0, 0, 0], [1, 0, 0], [2, 2, 2], [1, 1, 1]] {
            if let Some(v) = mask.get_mut(idx) {
                *v = true;
            }
        }
        let (_, count) = label(&mask, 1)?;
        assert_eq!(count, 3);
        let (labels, count) = label(&mask, 3)?;
        assert_eq!(count, 1);
        assert_eq!(labels.get([2, 2, 2]), Some(&1));
        Ok(())
    }

    #[test]
    fn test_label_invalid_connectivity() {
        let mask = Tensor2::<bool>::from_shape_val([2, 2], true);
        assert_eq!(
            label(&mask, 3),
            Err(ThresholdError::InvalidConnectivity {
                connectivity: 3,
                ndim: 2
            })
        );
    }
}
