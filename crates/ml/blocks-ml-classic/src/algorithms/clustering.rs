pub mod kmeans;
pub mod knn;
