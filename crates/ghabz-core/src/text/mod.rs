//! Text path: line reconstruction and normalization.

mod lines;
mod normalize;

pub use lines::{Line, LineReconstructor};
pub use normalize::{
    BidiNormalizer, collapse_spaces, normalize_whitespace_chars, reorder_visual,
    standardize_letters, to_ascii_digits,
};
