use candle_core::{Result, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, Module, VarBuilder};
use std::collections::HashMap;

/// The five capture points used for style matching, identical for both
/// backbone depths.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleLayer {
    Relu1_2,
    Relu2_2,
    Relu3_1,
    Relu4_1,
    Relu5_1,
}

impl StyleLayer {
    pub const ALL: [StyleLayer; 5] = [
        StyleLayer::Relu1_2,
        StyleLayer::Relu2_2,
        StyleLayer::Relu3_1,
        StyleLayer::Relu4_1,
        StyleLayer::Relu5_1,
    ];
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Backbone {
    Vgg16,
    Vgg19,
}

impl Backbone {
    // 3x3 convolutions per pooling block; the only difference between the
    // two depths.
    fn convs_per_block(self) -> [usize; 5] {
        match self {
            Backbone::Vgg16 => [2, 2, 3, 3, 3],
            Backbone::Vgg19 => [2, 2, 4, 4, 4],
        }
    }
}

#[derive(Debug)]
enum Op {
    Conv(Conv2d),
    Pool,
}

/// A VGG backbone sliced into the five style stages. Weights are pulled from
/// the `VarBuilder` under torchvision's `features.{index}` names, so a
/// torchvision export in safetensors form loads directly. Layers past
/// conv5_1 are never built.
#[derive(Debug)]
pub struct Vgg {
    stages: Vec<Vec<Op>>,
}

impl Vgg {
    pub fn new(vb: VarBuilder, backbone: Backbone) -> Result<Self> {
        const WIDTHS: [usize; 5] = [64, 128, 256, 512, 512];
        let vb = vb.pp("features");
        let blocks = backbone.convs_per_block();
        let mut stages: Vec<Vec<Op>> = Vec::new();
        let mut stage: Vec<Op> = Vec::new();
        let mut index = 0usize; // torchvision features index
        let mut in_channels = 3;
        for (block, (&n_convs, &out_channels)) in blocks.iter().zip(WIDTHS.iter()).enumerate() {
            if block > 0 {
                stage.push(Op::Pool);
                index += 1;
            }
            for conv in 0..n_convs {
                let layer = candle_nn::conv2d(
                    in_channels,
                    out_channels,
                    3,
                    Conv2dConfig {
                        padding: 1,
                        ..Default::default()
                    },
                    vb.pp(index.to_string()),
                )?;
                stage.push(Op::Conv(layer));
                in_channels = out_channels;
                index += 2; // conv + relu
                // the first two blocks are captured after their last conv,
                // the deeper ones right after their first
                let capture = if block < 2 { conv == n_convs - 1 } else { conv == 0 };
                if capture {
                    stages.push(std::mem::take(&mut stage));
                    if stages.len() == StyleLayer::ALL.len() {
                        return Ok(Self { stages });
                    }
                }
            }
        }
        candle_core::bail!("backbone layout did not produce {} stages", StyleLayer::ALL.len())
    }

    /// Run the image through the sliced backbone and hand back the activation
    /// after each named stage.
    pub fn extract(&self, image: &Tensor) -> Result<HashMap<StyleLayer, Tensor>> {
        let mut out = HashMap::with_capacity(StyleLayer::ALL.len());
        let mut h = image.clone();
        for (stage, layer) in self.stages.iter().zip(StyleLayer::ALL) {
            for op in stage {
                h = match op {
                    Op::Conv(conv) => conv.forward(&h)?.relu()?,
                    Op::Pool => h.max_pool2d(2)?,
                };
            }
            out.insert(layer, h.clone());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn check_backbone(backbone: Backbone) -> Result<()> {
        let dev = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &dev);
        let vgg = Vgg::new(vb, backbone)?;
        let image = Tensor::zeros((1, 3, 64, 64), DType::F32, &dev)?;
        let features = vgg.extract(&image)?;
        assert_eq!(features.len(), 5);
        let want = [
            (StyleLayer::Relu1_2, (64, 64)),
            (StyleLayer::Relu2_2, (128, 32)),
            (StyleLayer::Relu3_1, (256, 16)),
            (StyleLayer::Relu4_1, (512, 8)),
            (StyleLayer::Relu5_1, (512, 4)),
        ];
        for (layer, (channels, side)) in want {
            let (b, c, h, w) = features[&layer].dims4()?;
            assert_eq!((b, c, h, w), (1, channels, side, side), "{layer:?}");
        }
        Ok(())
    }

    #[test]
    fn vgg16_stage_shapes() -> Result<()> {
        check_backbone(Backbone::Vgg16)
    }

    #[test]
    fn vgg19_stage_shapes() -> Result<()> {
        check_backbone(Backbone::Vgg19)
    }
}
