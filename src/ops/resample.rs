use candle_core::{Result, Tensor};

use super::sampler::{grid_sample, Interpolation};

/// Resize `x` to `size` (height, width) or by `scale_factor` (truncated to
/// whole pixels), exactly one of the two. Builds a uniform identity grid at
/// the target resolution and resamples through [`grid_sample`] with the
/// requested interpolation. Runs detached from gradient tracking.
pub fn downsampling(
    x: &Tensor,
    size: Option<(usize, usize)>,
    scale_factor: Option<f64>,
    mode: Interpolation,
) -> Result<Tensor> {
    let (batch, _channels, height, width) = x.dims4()?;
    let (target_h, target_w) = match (size, scale_factor) {
        (Some(size), None) => size,
        (None, Some(factor)) => (
            (factor * height as f64) as usize,
            (factor * width as f64) as usize,
        ),
        (None, None) => candle_core::bail!("downsampling needs either size or scale_factor"),
        (Some(_), Some(_)) => {
            candle_core::bail!("downsampling takes size or scale_factor, not both")
        }
    };
    if target_h < 2 || target_w < 2 {
        candle_core::bail!("target size ({target_h}, {target_w}) must be at least 2 per dimension")
    }

    let x = x.detach();
    let device = x.device();
    let rows = Tensor::arange(0f32, target_h as f32, device)?
        .affine(2. / (target_h - 1) as f64, -1.)?
        .reshape((target_h, 1))?
        .broadcast_as((target_h, target_w))?
        .contiguous()?;
    let cols = Tensor::arange(0f32, target_w as f32, device)?
        .affine(2. / (target_w - 1) as f64, -1.)?
        .reshape((1, target_w))?
        .broadcast_as((target_h, target_w))?
        .contiguous()?;
    let grid = Tensor::stack(&[&rows, &cols], 2)?
        .unsqueeze(0)?
        .repeat((batch, 1, 1, 1))?;
    grid_sample(&x, &grid, mode)
}
