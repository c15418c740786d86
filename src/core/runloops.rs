use crate::core::Matcher;
use crate::models::{StyleLayer, Vgg};
use crate::ops;
use candle_core::{DType, Device, Result, Tensor};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

/// Synthetic smoke run: extract features from a seeded random image pair,
/// patch-match the relu3_1 maps, then exercise the downsampler and the gram
/// matrix on the same inputs.
pub fn run(matcher: &Matcher) -> anyhow::Result<()> {
    log::info!("{matcher:?}");
    if matcher.height % 16 != 0 || matcher.width % 16 != 0 {
        anyhow::bail!(
            "image size ({}, {}) must be a multiple of 16",
            matcher.height,
            matcher.width
        )
    }
    let device = Device::cuda_if_available(0)?;

    let mut rng = ChaCha8Rng::seed_from_u64(matcher.seed);
    let batch = matcher.batch_size as usize;
    let content = rand_image(&mut rng, batch, matcher.height, matcher.width, &device)?;
    let style = rand_image(&mut rng, batch, matcher.height, matcher.width, &device)?;

    let mut varmap = candle_nn::VarMap::new();
    let vb = candle_nn::VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let vgg = Vgg::new(vb, matcher.backbone)?;
    if let Some(path) = &matcher.weights {
        log::info!("loading weights from {:?}", path.display());
        varmap.load(path)?;
    }

    let extract_time = Instant::now();
    let content_features = vgg.extract(&content)?;
    let style_features = vgg.extract(&style)?;
    log::info!("feature extraction: {:5.2?}", extract_time.elapsed());

    let x = &content_features[&StyleLayer::Relu3_1];
    let y = &style_features[&StyleLayer::Relu3_1];
    let match_time = Instant::now();
    let matched = ops::patch_match(x, y, matcher.patch_size, matcher.radius, matcher.stride)?;
    log::info!(
        "patch_match on {:?} {:?}: {:5.2?}",
        StyleLayer::Relu3_1,
        x.shape(),
        match_time.elapsed()
    );

    let similarity = ops::cosine_distance(&matched, x, matcher.patch_size)?;
    let (lo, hi) = (
        similarity.min_all()?.to_scalar::<f32>()?,
        similarity.max_all()?.to_scalar::<f32>()?,
    );
    if !lo.is_finite() || !hi.is_finite() {
        log::warn!("similarity map contains non-finite values (near-zero patch energy)");
    } else {
        log::info!("matched similarity range: [{lo:.4}, {hi:.4}]");
    }

    let down = ops::downsampling(&content, None, Some(matcher.scale_factor), matcher.mode)?;
    log::info!("downsampled image: {:?}", down.shape());

    let gram = ops::gram_matrix(y)?;
    log::info!("gram matrix on {:?}: {:?}", StyleLayer::Relu3_1, gram.shape());

    Ok(())
}

fn rand_image(
    rng: &mut ChaCha8Rng,
    batch: usize,
    height: usize,
    width: usize,
    device: &Device,
) -> Result<Tensor> {
    let data: Vec<f32> = (0..batch * 3 * height * width)
        .map(|_| rng.gen::<f32>())
        .collect();
    Tensor::from_vec(data, (batch, 3, height, width), device)
}
