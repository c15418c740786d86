use candle_core::{Result, Tensor};

/// Channel-channel correlation per batch entry: entry [b, c1, c2] is the dot
/// product of channels c1 and c2 over the flattened spatial positions. No
/// normalization, that is the caller's business.
pub fn gram_matrix(y: &Tensor) -> Result<Tensor> {
    let (batch, channels, height, width) = y.dims4()?;
    let features = y.contiguous()?.reshape((batch, channels, height * width))?;
    features.matmul(&features.transpose(1, 2)?.contiguous()?)
}
