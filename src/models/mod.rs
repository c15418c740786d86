mod vgg;
pub use vgg::{Backbone, StyleLayer, Vgg};
