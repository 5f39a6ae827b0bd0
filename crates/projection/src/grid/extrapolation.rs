use rayon::prelude::*;

use crate::array::Array3;

/// Propagates known values into unknown entries, one layer per iteration.
///
/// Each unknown entry with at least one known axis neighbor takes their
/// average and becomes known for the next layer. Entries still unknown after
/// `number_of_iterations` layers keep their value.
pub fn extrapolate_to_region(values: &mut Array3<f64>, valid: &Array3<bool>, number_of_iterations: u32) {
    let size = values.size();
    debug_assert_eq!(size, valid.size());

    // Two-buffer pattern: a layer only reads values known before it started.
    let mut known = valid.clone();
    let mut next_known = valid.clone();
    let mut next_values = values.clone();

    for _ in 0..number_of_iterations {
        let current = &*values;
        let known_now = &known;
        next_values
            .data_mut()
            .par_iter_mut()
            .zip(next_known.data_mut().par_iter_mut())
            .enumerate()
            .for_each(|(idx, (value, is_known))| {
                if known_now[idx] {
                    *value = current[idx];
                    *is_known = true;
                    return;
                }
                let (i, j, k) = size.coords(idx);
                let mut sum = 0.0;
                let mut count = 0u32;
                let mut visit = |n: usize| {
                    if known_now[n] {
                        sum += current[n];
                        count += 1;
                    }
                };
                if i + 1 < size.x {
                    visit(idx + 1);
                }
                if i > 0 {
                    visit(idx - 1);
                }
                if j + 1 < size.y {
                    visit(idx + size.x);
                }
                if j > 0 {
                    visit(idx - size.x);
                }
                if k + 1 < size.z {
                    visit(idx + size.x * size.y);
                }
                if k > 0 {
                    visit(idx - size.x * size.y);
                }
                if count > 0 {
                    *value = sum / count as f64;
                    *is_known = true;
                } else {
                    *value = current[idx];
                    *is_known = false;
                }
            });

        std::mem::swap(values, &mut next_values);
        std::mem::swap(&mut known, &mut next_known);
    }
}
