pub mod boosting;
pub mod clustering;
pub mod regression;

// Re-export implemented algorithms
pub use clustering::kmeans::KMeans;