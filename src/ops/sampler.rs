use candle_core::{DType, Result, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Interpolation {
    Nearest,
    Bilinear,
}

// Gather one pixel per grid location. `iy`/`ix` hold pixel-space coordinates
// already clamped to [0, dim-1]; indices are flattened to row * width + col
// and broadcast over the channel axis.
fn gather_pixels(src: &Tensor, iy: &Tensor, ix: &Tensor, width: usize) -> Result<Tensor> {
    let (batch, channels, _len) = src.dims3()?;
    let (_b, out_h, out_w) = iy.dims3()?;
    let index = iy
        .affine(width as f64, 0.)?
        .add(ix)?
        .to_dtype(DType::U32)?
        .reshape((batch, 1, out_h * out_w))?
        .repeat((1, channels, 1))?
        .contiguous()?;
    src.gather(&index, 2)?.reshape((batch, channels, out_h, out_w))
}

/// Resample `x` (batch, channel, height, width) through a per-pixel sampling
/// grid (batch, out_height, out_width, 2). The last grid axis holds (row, col)
/// coordinates normalized to [-1, 1]; out-of-range coordinates sample the
/// border pixel.
pub fn grid_sample(x: &Tensor, grid: &Tensor, mode: Interpolation) -> Result<Tensor> {
    let (batch, _channels, height, width) = x.dims4()?;
    let (grid_batch, _out_h, _out_w, last) = grid.dims4()?;
    if grid_batch != batch {
        candle_core::bail!("grid batch {grid_batch} does not match input batch {batch}")
    }
    if last != 2 {
        candle_core::bail!("sampling grid must end with a (row, col) axis of extent 2, got {last}")
    }
    if !x.device().same_device(grid.device()) {
        candle_core::bail!("input and grid live on different devices")
    }

    let rows = grid.narrow(3, 0, 1)?.squeeze(3)?;
    let cols = grid.narrow(3, 1, 1)?.squeeze(3)?;
    // [-1, 1] -> pixel space
    let iy = rows.affine(0.5 * (height - 1) as f64, 0.5 * (height - 1) as f64)?;
    let ix = cols.affine(0.5 * (width - 1) as f64, 0.5 * (width - 1) as f64)?;

    let src = x.contiguous()?.reshape((batch, (), height * width))?;
    match mode {
        Interpolation::Nearest => {
            let iy = iy.round()?.clamp(0f32, (height - 1) as f32)?;
            let ix = ix.round()?.clamp(0f32, (width - 1) as f32)?;
            gather_pixels(&src, &iy, &ix, width)
        }
        Interpolation::Bilinear => {
            let y0 = iy.floor()?;
            let x0 = ix.floor()?;
            let wy = iy.sub(&y0)?;
            let wx = ix.sub(&x0)?;
            let y0c = y0.clamp(0f32, (height - 1) as f32)?;
            let y1c = y0.affine(1., 1.)?.clamp(0f32, (height - 1) as f32)?;
            let x0c = x0.clamp(0f32, (width - 1) as f32)?;
            let x1c = x0.affine(1., 1.)?.clamp(0f32, (width - 1) as f32)?;

            let v00 = gather_pixels(&src, &y0c, &x0c, width)?;
            let v01 = gather_pixels(&src, &y0c, &x1c, width)?;
            let v10 = gather_pixels(&src, &y1c, &x0c, width)?;
            let v11 = gather_pixels(&src, &y1c, &x1c, width)?;

            let wx = wx.unsqueeze(1)?;
            let wy = wy.unsqueeze(1)?;
            let one_wx = wx.affine(-1., 1.)?;
            let one_wy = wy.affine(-1., 1.)?;
            let top = v00.broadcast_mul(&one_wx)?.add(&v01.broadcast_mul(&wx)?)?;
            let bottom = v10.broadcast_mul(&one_wx)?.add(&v11.broadcast_mul(&wx)?)?;
            top.broadcast_mul(&one_wy)?.add(&bottom.broadcast_mul(&wy)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn identity_grid_copies_input() -> Result<()> {
        let dev = Device::Cpu;
        let x = Tensor::from_vec(vec![1f32, 2., 3., 4.], (1, 1, 2, 2), &dev)?;
        // (row, col) per output pixel, normalized
        let grid = Tensor::from_vec(
            vec![-1f32, -1., -1., 1., 1., -1., 1., 1.],
            (1, 2, 2, 2),
            &dev,
        )?;
        let out = grid_sample(&x, &grid, Interpolation::Nearest)?;
        assert_eq!(out.dims4()?, x.dims4()?);
        assert_eq!(
            out.flatten_all()?.to_vec1::<f32>()?,
            x.flatten_all()?.to_vec1::<f32>()?
        );
        let out = grid_sample(&x, &grid, Interpolation::Bilinear)?;
        let flat = out.flatten_all()?.to_vec1::<f32>()?;
        for (got, want) in flat.iter().zip([1f32, 2., 3., 4.]) {
            assert!((got - want).abs() < 1e-5, "got {got}, want {want}");
        }
        Ok(())
    }

    #[test]
    fn bilinear_blends_midpoint() -> Result<()> {
        let dev = Device::Cpu;
        let x = Tensor::from_vec(vec![0f32, 2.], (1, 1, 1, 2), &dev)?;
        // single sample halfway between the two pixels
        let grid = Tensor::from_vec(vec![0f32, 0.], (1, 1, 1, 2), &dev)?;
        let out = grid_sample(&x, &grid, Interpolation::Bilinear)?;
        let v = out.flatten_all()?.to_vec1::<f32>()?[0];
        assert!((v - 1.0).abs() < 1e-6, "got {v}");
        Ok(())
    }

    #[test]
    fn rejects_malformed_grid() -> Result<()> {
        let dev = Device::Cpu;
        let x = Tensor::zeros((1, 1, 2, 2), DType::F32, &dev)?;
        let grid = Tensor::zeros((1, 2, 2, 3), DType::F32, &dev)?;
        assert!(grid_sample(&x, &grid, Interpolation::Nearest).is_err());
        let grid = Tensor::zeros((2, 2, 2, 2), DType::F32, &dev)?;
        assert!(grid_sample(&x, &grid, Interpolation::Nearest).is_err());
        Ok(())
    }
}
