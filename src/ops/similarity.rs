use candle_core::{Result, Tensor};

fn check_pair(x: &Tensor, y: &Tensor, patch_size: usize) -> Result<()> {
    x.dims4()?;
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
    Ok(())
}

/// Patch-wise dot product: per-pixel channel dot product, averaged over a
/// `patch_size` window (stride 1, zero padded to keep the spatial extent) and
/// divided by `patch_size`². Output is (batch, height, width).
pub fn patchdot(x: &Tensor, y: &Tensor, patch_size: usize) -> Result<Tensor> {
    check_pair(x, y, patch_size)?;
    let pad = patch_size / 2;
    let dot = x.mul(y)?.sum_keepdim(1)?;
    let dot = dot
        .pad_with_zeros(2, pad, pad)?
        .pad_with_zeros(3, pad, pad)?;
    let pooled = dot.avg_pool2d_with_stride(patch_size, 1)?;
    (pooled / (patch_size * patch_size) as f64)?.squeeze(1)
}

/// Pooled cosine similarity between two feature maps: `patchdot(x, y)`
/// normalized by the geometric mean of the self dot products. A patch with
/// near-zero local energy divides by near-zero and yields large or NaN
/// values; this is left unguarded on purpose, callers that scan candidates
/// rely on NaN losing every strict comparison.
pub fn cosine_distance(x: &Tensor, y: &Tensor, patch_size: usize) -> Result<Tensor> {
    let out = patchdot(x, y, patch_size)?;
    let norm = patchdot(y, y, patch_size)?
        .mul(&patchdot(x, x, patch_size)?)?
        .sqrt()?;
    out.div(&norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn feature_map(dev: &Device) -> Result<Tensor> {
        let data: Vec<f32> = (1..=32).map(|v| v as f32).collect();
        Tensor::from_vec(data, (1, 2, 4, 4), dev)
    }

    #[test]
    fn cosine_with_itself_is_one() -> Result<()> {
        let dev = Device::Cpu;
        let x = feature_map(&dev)?;
        for patch_size in [1, 3, 5] {
            let sim = cosine_distance(&x, &x, patch_size)?;
            for v in sim.flatten_all()?.to_vec1::<f32>()? {
                assert!((v - 1.0).abs() < 1e-5, "patch_size {patch_size}: got {v}");
            }
        }
        Ok(())
    }

    #[test]
    fn patchdot_commutes() -> Result<()> {
        let dev = Device::Cpu;
        let x = feature_map(&dev)?;
        let y = x.affine(0.5, -3.0)?;
        let xy = patchdot(&x, &y, 3)?.to_vec3::<f32>()?;
        let yx = patchdot(&y, &x, 3)?.to_vec3::<f32>()?;
        assert_eq!(xy, yx);
        Ok(())
    }

    #[test]
    fn patchdot_pools_over_the_window() -> Result<()> {
        let dev = Device::Cpu;
        let x = Tensor::ones((1, 1, 3, 3), candle_core::DType::F32, &dev)?;
        let out = patchdot(&x, &x, 3)?.flatten_all()?.to_vec1::<f32>()?;
        // per-pixel dot is 1, so each entry is (pixels covered) / 81
        let want = [4., 6., 4., 6., 9., 6., 4., 6., 4.];
        for (got, want) in out.iter().zip(want) {
            assert!((got - want / 81.).abs() < 1e-6, "got {got}, want {}", want / 81.);
        }
        Ok(())
    }

    #[test]
    fn rejects_bad_inputs() -> Result<()> {
        let dev = Device::Cpu;
        let x = feature_map(&dev)?;
        let y = Tensor::zeros((1, 2, 4, 5), candle_core::DType::F32, &dev)?;
        assert!(cosine_distance(&x, &y, 3).is_err());
        assert!(cosine_distance(&x, &x, 2).is_err());
        assert!(cosine_distance(&x, &x, 0).is_err());
        Ok(())
    }
}
