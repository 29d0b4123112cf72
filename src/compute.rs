//! Dispatch sizing for the per-pixel kernels.

/// Workgroup `y` size declared by `escape.wgsl` and `colormap.wgsl`.
pub const WORKGROUP_SIZE_Y: u32 = 64;

/// Dispatch `y` size used by [`dispatch_size`].
pub const DISPATCH_SIZE_Y: u32 = 1024;

/// Two-dimensional decomposition of one-invocation-per-pixel work.
///
/// A single dispatch dimension is capped at 65535 workgroups, so the pixel
/// range is split into chunks of `DISPATCH_SIZE_Y * WORKGROUP_SIZE_Y = 65536`
/// invocations along `y`, with `x` counting chunks. The kernels recover
/// their pixel index as `global_id.x * 65536 + global_id.y` and bounds-check
/// against the real pixel count, since up to one chunk of invocations is
/// redundant.
pub fn dispatch_size(total_work: usize) -> (u32, u32, u32) {
    let chunk = (DISPATCH_SIZE_Y * WORKGROUP_SIZE_Y) as usize;
    ((total_work / chunk + 1) as u32, DISPATCH_SIZE_Y, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_covers_all_work() {
        for total in [0usize, 1, 65_535, 65_536, 65_537, 1024 * 1024, 3840 * 2160] {
            let (x, y, z) = dispatch_size(total);
            let invocations = x as usize * y as usize * WORKGROUP_SIZE_Y as usize * z as usize;
            assert!(
                invocations >= total,
                "{invocations} invocations cannot cover {total} pixels"
            );
            // Over-dispatch stays below one extra chunk.
            assert!(invocations - total <= 65_536);
        }
    }
}
