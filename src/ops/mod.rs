mod gram;
mod patch_match;
mod resample;
mod sampler;
mod similarity;

pub use gram::gram_matrix;
pub use patch_match::patch_match;
pub use resample::downsampling;
pub use sampler::{grid_sample, Interpolation};
pub use similarity::{cosine_distance, patchdot};
