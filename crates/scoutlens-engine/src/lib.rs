// Similarity and ranking engine: normalization, weighted composites,
// cosine similarity, rankings and comparison profiles over a player table.
// Every function is pure; callers pass the pool and the reference
// population explicitly.

pub mod compare;
pub mod error;
pub mod normalize;
pub mod overview;
pub mod population;
pub mod ranking;
pub mod scorer;
pub mod selection;
pub mod similarity;
pub mod strengths;
pub mod teams;
