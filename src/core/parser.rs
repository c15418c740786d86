use crate::models::Backbone;
use crate::ops::Interpolation;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "Style matching with candle")]
#[command(version = "0.1")]
#[command(about = "Patch matching over VGG feature maps", long_about = None)]
pub struct Matcher {
    /// Name of this run
    #[arg(short, long, default_value_t = String::from("smoke"))]
    pub name: String,

    /// specify which backbone slicing to use
    #[arg(long, value_enum, default_value_t = Backbone::Vgg16)]
    pub backbone: Backbone,

    /// optional safetensors file with torchvision VGG weights
    #[arg(long)]
    pub weights: Option<std::path::PathBuf>,

    /// batch size of the synthetic image pair
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..), default_value_t = 1)]
    pub batch_size: u32,

    /// image height, a multiple of 16
    #[arg(long, default_value_t = 64)]
    pub height: usize,

    /// image width, a multiple of 16
    #[arg(long, default_value_t = 64)]
    pub width: usize,

    /// patch window for the similarity metric, odd
    #[arg(short, long, default_value_t = 3)]
    pub patch_size: usize,

    /// search half-width of the offset scan
    #[arg(short, long, default_value_t = 3)]
    pub radius: usize,

    /// step of the offset scan
    #[arg(long, default_value_t = 1)]
    pub stride: usize,

    /// scale factor for the downsampling pass
    #[arg(long, default_value_t = 0.5)]
    pub scale_factor: f64,

    /// interpolation mode for the downsampling pass
    #[arg(short, long, value_enum, default_value_t = Interpolation::Bilinear)]
    pub mode: Interpolation,

    /// seed
    #[arg(short, long, default_value_t = 42)]
    pub seed: u64,

    /// recoder home path
    #[arg(long, default_value_t = String::from("tmp"))]
    pub recoder_home: String,
}
