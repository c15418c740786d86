use candle_core::{DType, Result, Tensor};

use super::sampler::{grid_sample, Interpolation};
use super::similarity::cosine_distance;

/// Exhaustive local patch search: for every pixel of `x`, find the offset
/// within `radius` whose neighborhood of `y` matches best under the pooled
/// cosine similarity, then rebuild `x`'s extent from `y` at those offsets.
///
/// The scan is row-major with a strict-greater accumulator, so ties keep the
/// smallest (row, column) offset. This op is not differentiable; inputs are
/// detached before the scan and no gradient graph reaches the output.
pub fn patch_match(
    x: &Tensor,
    y: &Tensor,
    patch_size: usize,
    radius: usize,
    stride: usize,
) -> Result<Tensor> {
    let (batch, _channels, height, width) = x.dims4()?;
    if x.shape() != y.shape() {
        candle_core::bail!(
            "feature maps must share a shape, got {:?} and {:?}",
            x.shape(),
            y.shape()
        )
    }
    if !x.device().same_device(y.device()) {
        candle_core::bail!("feature maps live on different devices")
    }
    if patch_size == 0 || patch_size % 2 == 0 {
        candle_core::bail!("patch_size must be a positive odd integer, got {patch_size}")
    }
    if stride == 0 {
        candle_core::bail!("stride must be at least 1")
    }

    let device = x.device();
    let dtype = x.dtype();
    let x = x.detach();
    let y = y.detach();
    let y_pad = y
        .pad_with_zeros(2, radius, radius)?
        .pad_with_zeros(3, radius, radius)?;

    let mut best = Tensor::zeros((batch, height, width), dtype, device)?;
    let mut grid_row = best.zeros_like()?;
    let mut grid_col = best.zeros_like()?;
    let mut similarity = best.clone();
    // Row-major scan over the (2 * radius + 1)^2 candidate offsets. The
    // accumulator carries (best value, offset that achieved it) and only a
    // strictly greater candidate replaces it, so NaN candidates from
    // zero-energy patches never win.
    for i in (0..=2 * radius).step_by(stride) {
        for j in (0..=2 * radius).step_by(stride) {
            let window = y_pad.narrow(2, i, height)?.narrow(3, j, width)?;
            similarity = cosine_distance(&window, &x, patch_size)?;

            let is_max = similarity.gt(&best)?;
            best = is_max.where_cond(&similarity, &best)?;
            let row = Tensor::full(i as f64, (batch, height, width), device)?.to_dtype(dtype)?;
            let col = Tensor::full(j as f64, (batch, height, width), device)?.to_dtype(dtype)?;
            grid_row = is_max.where_cond(&row, &grid_row)?;
            grid_col = is_max.where_cond(&col, &grid_col)?;
        }
    }

    if log::log_enabled!(log::Level::Debug) {
        log::debug!(
            "similarity minmax: {:?} {:?}, y minmax: {:?} {:?}",
            similarity.min_all()?.to_dtype(DType::F64)?.to_scalar::<f64>()?,
            similarity.max_all()?.to_dtype(DType::F64)?.to_scalar::<f64>()?,
            y.min_all()?.to_dtype(DType::F64)?.to_scalar::<f64>()?,
            y.max_all()?.to_dtype(DType::F64)?.to_scalar::<f64>()?,
        );
    }

    // window offsets -> absolute source coordinates
    let rows = Tensor::arange(0f32, height as f32, device)?
        .to_dtype(dtype)?
        .reshape((1, height, 1))?;
    let cols = Tensor::arange(0f32, width as f32, device)?
        .to_dtype(dtype)?
        .reshape((1, 1, width))?;
    let grid_row = grid_row.affine(1., -(radius as f64))?.broadcast_add(&rows)?;
    let grid_col = grid_col.affine(1., -(radius as f64))?.broadcast_add(&cols)?;
    let grid_row = grid_row.clamp(0f32, height as f32)?;
    let grid_col = grid_col.clamp(0f32, width as f32)?;

    // normalize to [-1, 1]
    let grid_row = (grid_row / (height - 1) as f64)?
        .clamp(0f32, 1f32)?
        .affine(2., -1.)?;
    let grid_col = (grid_col / (width - 1) as f64)?
        .clamp(0f32, 1f32)?
        .affine(2., -1.)?;

    let grid = Tensor::stack(&[&grid_row, &grid_col], 3)?;
    // Matched offsets are integral, so nearest and bilinear sampling agree;
    // nearest is the cheaper of the two.
    grid_sample(&y, &grid, Interpolation::Nearest)
}
